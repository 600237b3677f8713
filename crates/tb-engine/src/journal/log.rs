//! Journal storage and export.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::entry::JournalEntry;
use crate::error::EngineError;
use crate::events::OutcomeEvent;

/// A chronological log of outcomes and refusals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the journal.
    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Record a resolved action, followed by any level-ups, tier
    /// crossings and unlocks it caused.
    pub fn record_outcome(&mut self, actor: &str, event: &OutcomeEvent) {
        let timestamp = event.occurred_at;
        self.entries.push(JournalEntry::Outcome {
            actor: actor.to_string(),
            action: event.action.clone(),
            summary: event.describe(),
            timestamp,
        });
        if let Some(report) = &event.level {
            for gain in &report.levels {
                self.entries.push(JournalEntry::LevelUp {
                    actor: actor.to_string(),
                    level: gain.level,
                    abilities: gain.abilities.clone(),
                    timestamp,
                });
            }
        }
        for change in &event.reputation {
            if let Some(crossed) = &change.tier_change {
                self.entries.push(JournalEntry::TierCrossed {
                    actor: actor.to_string(),
                    faction: crossed.faction.to_string(),
                    from: crossed.from.clone(),
                    to: crossed.to.clone(),
                    timestamp,
                });
            }
        }
        for quest in &event.unlocked {
            self.entries.push(JournalEntry::QuestUnlocked {
                actor: actor.to_string(),
                quest: quest.to_string(),
                timestamp,
            });
        }
    }

    /// Record an action the engine refused.
    pub fn record_rejection(&mut self, actor: &str, action: &str, error: &EngineError) {
        self.entries.push(JournalEntry::Rejected {
            actor: actor.to_string(),
            action: action.to_string(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Append a free-form note.
    pub fn note(&mut self, text: impl Into<String>) {
        self.entries.push(JournalEntry::Note {
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Get all entries.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of refused actions.
    pub fn rejections(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, JournalEntry::Rejected { .. }))
            .count()
    }

    /// Export the journal as markdown.
    pub fn export_markdown(&self) -> String {
        let mut out = String::from("# Session Journal\n\n");
        for entry in &self.entries {
            match entry {
                JournalEntry::Outcome { actor, summary, .. } => {
                    out.push_str(&format!("- **{actor}** {summary}\n"));
                }
                JournalEntry::Rejected {
                    actor,
                    action,
                    kind,
                    reason,
                    ..
                } => {
                    out.push_str(&format!(
                        "- ~~**{actor}** {action}~~ refused (`{kind}`): {reason}\n"
                    ));
                }
                JournalEntry::LevelUp {
                    actor,
                    level,
                    abilities,
                    ..
                } => {
                    out.push_str(&format!("  - *{actor} reached level {level}*"));
                    if !abilities.is_empty() {
                        out.push_str(&format!(", learned {}", abilities.join(", ")));
                    }
                    out.push('\n');
                }
                JournalEntry::TierCrossed {
                    actor,
                    faction,
                    from,
                    to,
                    ..
                } => {
                    out.push_str(&format!(
                        "  - *{actor} is now {to} with {faction}* (was {from})\n"
                    ));
                }
                JournalEntry::QuestUnlocked { actor, quest, .. } => {
                    out.push_str(&format!("  - *{actor} unlocked quest `{quest}`*\n"));
                }
                JournalEntry::Note { text, .. } => {
                    out.push_str(&format!("\n> {text}\n\n"));
                }
            }
        }
        out
    }

    /// Export the journal as plain text.
    pub fn export_text(&self) -> String {
        let mut out = String::from("Session Journal\n===============\n\n");
        for entry in &self.entries {
            match entry {
                JournalEntry::Outcome { actor, summary, .. } => {
                    out.push_str(&format!("{actor}: {summary}\n"));
                }
                JournalEntry::Rejected {
                    actor,
                    action,
                    reason,
                    ..
                } => {
                    out.push_str(&format!("{actor}: {action} refused: {reason}\n"));
                }
                JournalEntry::LevelUp {
                    actor,
                    level,
                    abilities,
                    ..
                } => {
                    out.push_str(&format!("  {actor} reached level {level}"));
                    if !abilities.is_empty() {
                        out.push_str(&format!(" (learned {})", abilities.join(", ")));
                    }
                    out.push('\n');
                }
                JournalEntry::TierCrossed {
                    actor,
                    faction,
                    from,
                    to,
                    ..
                } => {
                    out.push_str(&format!("  {actor} with {faction}: {from} -> {to}\n"));
                }
                JournalEntry::QuestUnlocked { actor, quest, .. } => {
                    out.push_str(&format!("  {actor} unlocked {quest}\n"));
                }
                JournalEntry::Note { text, .. } => {
                    out.push_str(&format!("Note: {text}\n"));
                }
            }
        }
        out
    }

    /// Export the journal as pretty-printed JSON.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
