//! Journal entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in the outcome journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEntry {
    /// An action that resolved.
    Outcome {
        /// Name of the acting character.
        actor: String,
        /// Intent kind.
        action: String,
        /// One-line summary of what changed.
        summary: String,
        /// When it resolved.
        timestamp: DateTime<Utc>,
    },
    /// An action that was refused. State was left untouched.
    Rejected {
        /// Name of the acting character.
        actor: String,
        /// Intent kind.
        action: String,
        /// Machine-readable error kind.
        kind: String,
        /// Human-readable reason.
        reason: String,
        /// When it was refused.
        timestamp: DateTime<Utc>,
    },
    /// A character reached a new level.
    LevelUp {
        /// Character name.
        actor: String,
        /// New level.
        level: u32,
        /// Abilities unlocked at this level.
        abilities: Vec<String>,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// Standing with a faction crossed into a new tier.
    TierCrossed {
        /// Character name.
        actor: String,
        /// Faction key.
        faction: String,
        /// Tier before.
        from: String,
        /// Tier after.
        to: String,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A quest became available.
    QuestUnlocked {
        /// Character name.
        actor: String,
        /// Quest key.
        quest: String,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A free-form note.
    Note {
        /// The note text.
        text: String,
        /// When recorded.
        timestamp: DateTime<Utc>,
    },
}
