//! Outcome events and the sinks that receive them.
//!
//! Every successful dispatch produces one [`OutcomeEvent`] describing what
//! changed. Sinks are one-way: they cannot fail the action that produced
//! the event.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{CharacterId, EntryId, GroupId, ItemRef, ObjectiveId, QuestId, StatMap};
use tb_mechanics::{
    DiceRoll, HealthChange, LevelReport, Outcome, QuestStatus, ReputationChange,
};

/// Quest movement caused by an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEvent {
    /// The quest.
    pub quest: QuestId,
    /// Attempt number (1-based).
    pub attempt: u32,
    /// Status after the action.
    pub status: QuestStatus,
    /// The objective that was recorded, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectiveId>,
    /// The group this action satisfied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_group: Option<GroupId>,
}

/// Units of an item gained (positive) or lost (negative) by the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEvent {
    /// The item version.
    pub item: ItemRef,
    /// Signed unit count.
    pub quantity: i64,
    /// The entry involved, when there was exactly one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryId>,
}

/// What one resolved action did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    /// Intent kind, e.g. `complete_quest`.
    pub action: String,
    /// The acting character.
    pub actor: CharacterId,
    /// The other party, if any.
    #[serde(default)]
    pub target: Option<CharacterId>,
    /// The roll made, if randomness was involved.
    #[serde(default)]
    pub roll: Option<DiceRoll>,
    /// The check result, if the roll was made against a DC.
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// Quest movement.
    #[serde(default)]
    pub quest: Option<QuestEvent>,
    /// Reputation adjustments, in the order applied.
    #[serde(default)]
    pub reputation: Vec<ReputationChange>,
    /// Items gained or lost.
    #[serde(default)]
    pub items: Vec<ItemEvent>,
    /// Experience gained and any level-ups.
    #[serde(default)]
    pub level: Option<LevelReport>,
    /// Health movement.
    #[serde(default)]
    pub health: Option<HealthChange>,
    /// Derived stats after the action, when they may have changed.
    #[serde(default)]
    pub stats: Option<StatMap>,
    /// Quests made available by a tier crossing.
    #[serde(default)]
    pub unlocked: Vec<QuestId>,
    /// Actor's stored version after the action.
    pub version: u64,
    /// When the action was resolved.
    pub occurred_at: DateTime<Utc>,
}

impl OutcomeEvent {
    /// An event with nothing recorded yet.
    pub fn new(action: impl Into<String>, actor: CharacterId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            action: action.into(),
            actor,
            target: None,
            roll: None,
            outcome: None,
            quest: None,
            reputation: Vec::new(),
            items: Vec::new(),
            level: None,
            health: None,
            stats: None,
            unlocked: Vec::new(),
            version: 0,
            occurred_at,
        }
    }

    /// One-line summary for narration and logs.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(roll) = &self.roll {
            parts.push(format!("rolled {roll}"));
        }
        if let Some(outcome) = &self.outcome {
            parts.push(outcome.to_string());
        }
        if let Some(health) = &self.health {
            parts.push(format!(
                "health {} -> {}/{}",
                health.previous, health.current, health.max
            ));
        }
        if let Some(level) = &self.level {
            if level.leveled_up() {
                parts.push(format!(
                    "+{} xp, level {} -> {}",
                    level.gained, level.previous_level, level.level
                ));
            } else if level.gained > 0 {
                parts.push(format!("+{} xp", level.gained));
            }
        }
        for item in &self.items {
            parts.push(format!("{:+} {}", item.quantity, item.item));
        }
        for change in &self.reputation {
            let mut text = format!("{} {:+} = {}", change.faction, change.delta, change.score);
            if let Some(crossed) = &change.tier_change {
                text.push_str(&format!(" ({} -> {})", crossed.from, crossed.to));
            }
            parts.push(text);
        }
        if let Some(quest) = &self.quest {
            let mut text = format!("quest {} {}", quest.quest, quest.status);
            if let Some(group) = &quest.satisfied_group {
                text.push_str(&format!(" via {group}"));
            }
            parts.push(text);
        }
        if !self.unlocked.is_empty() {
            let keys: Vec<&str> = self.unlocked.iter().map(QuestId::as_str).collect();
            parts.push(format!("unlocked {}", keys.join(", ")));
        }
        if parts.is_empty() {
            self.action.clone()
        } else {
            format!("{}: {}", self.action, parts.join("; "))
        }
    }
}

/// Receives outcome events after every successful action.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn publish(&self, event: &OutcomeEvent);
}

/// Logs each event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &OutcomeEvent) {
        tracing::info!(
            actor = %event.actor,
            action = %event.action,
            version = event.version,
            summary = %event.describe(),
            "outcome"
        );
    }
}

/// Keeps every event in memory, in publication order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OutcomeEvent>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event received so far.
    pub fn events(&self) -> Vec<OutcomeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return every event received so far.
    pub fn drain(&self) -> Vec<OutcomeEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &OutcomeEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::FactionId;
    use tb_mechanics::{Condition, Direction, LevelGain, TierChange};

    fn event() -> OutcomeEvent {
        OutcomeEvent::new("complete_quest", CharacterId::new(), Utc::now())
    }

    #[test]
    fn bare_events_describe_their_action() {
        assert_eq!(event().describe(), "complete_quest");
    }

    #[test]
    fn describe_lists_every_change() {
        let mut e = event();
        e.level = Some(LevelReport {
            gained: 1500,
            previous_level: 1,
            level: 2,
            experience: 500,
            next_threshold: Some(2000),
            levels: vec![LevelGain {
                level: 2,
                points: 2,
                stats: StatMap::new(),
                abilities: vec!["Battle Cry".to_string()],
            }],
        });
        e.items.push(ItemEvent {
            item: ItemRef {
                id: "pelt".into(),
                version: 1,
            },
            quantity: 25,
            entry: None,
        });
        e.reputation.push(ReputationChange {
            faction: FactionId::new("ironguard"),
            delta: 150,
            previous: 0,
            score: 150,
            previous_tier: Some("Neutral".to_string()),
            tier: Some("Friendly".to_string()),
            tier_change: Some(TierChange {
                faction: FactionId::new("ironguard"),
                from: "Neutral".to_string(),
                to: "Friendly".to_string(),
                direction: Direction::Up,
            }),
        });
        e.quest = Some(QuestEvent {
            quest: QuestId::new("wolf_hunt"),
            attempt: 1,
            status: QuestStatus::Completed,
            objective: None,
            satisfied_group: None,
        });
        e.unlocked.push(QuestId::new("iron_oath"));
        insta::assert_snapshot!(e.describe(), @"complete_quest: +1500 xp, level 1 -> 2; +25 pelt@v1; ironguard +150 = 150 (Neutral -> Friendly); quest wolf_hunt completed; unlocked iron_oath");
    }

    #[test]
    fn health_is_described() {
        let mut e = OutcomeEvent::new("damage", CharacterId::new(), Utc::now());
        e.health = Some(HealthChange {
            previous: 100,
            current: 60,
            max: 100,
            condition: Condition::Healthy,
        });
        assert_eq!(e.describe(), "damage: health 100 -> 60/100");
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let first = event();
        let second = OutcomeEvent::new("heal", first.actor, Utc::now());
        sink.publish(&first);
        sink.publish(&second);
        let actions: Vec<String> = sink.events().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, ["complete_quest", "heal"]);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn events_serialize_as_json() {
        let e = event();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["action"], "complete_quest");
        let back: OutcomeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
