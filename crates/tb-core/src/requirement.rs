//! Prerequisites for equipping items and starting quests.
//!
//! Requirements are plain data here. Evaluating them needs a character's
//! level, derived stats, reputation and quest history, so the check itself
//! lives in the mechanics crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{FactionId, QuestId};
use crate::stat::{Stat, StatMap};

/// A minimum reputation tier with a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationGate {
    /// The faction whose standing is checked.
    pub faction: FactionId,
    /// Lowest acceptable tier label (e.g. "Friendly").
    pub tier: String,
}

/// A bundle of prerequisites. An empty bundle is always satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Minimum character level.
    #[serde(default)]
    pub min_level: Option<u32>,
    /// Minimum derived stat values.
    #[serde(default)]
    pub stats: StatMap,
    /// Minimum reputation tiers.
    #[serde(default)]
    pub reputation: Vec<ReputationGate>,
    /// Quests that must have been completed at least once.
    #[serde(default)]
    pub completed_quests: Vec<QuestId>,
}

impl Requirements {
    /// Returns true if nothing is required.
    pub fn is_empty(&self) -> bool {
        self.min_level.is_none()
            && self.stats.is_empty()
            && self.reputation.is_empty()
            && self.completed_quests.is_empty()
    }

    /// Require a minimum level.
    pub fn at_level(mut self, level: u32) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Require a minimum stat value.
    pub fn with_stat(mut self, stat: Stat, min: i32) -> Self {
        self.stats.insert(stat, min);
        self
    }

    /// Require a minimum reputation tier.
    pub fn with_tier(mut self, faction: impl Into<FactionId>, tier: impl Into<String>) -> Self {
        self.reputation.push(ReputationGate {
            faction: faction.into(),
            tier: tier.into(),
        });
        self
    }

    /// Require a completed quest.
    pub fn after_quest(mut self, quest: impl Into<QuestId>) -> Self {
        self.completed_quests.push(quest.into());
        self
    }
}

/// One prerequisite a character failed, phrased for logs and narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Unmet {
    /// Level too low.
    Level {
        /// Level required.
        required: u32,
        /// Character's level.
        actual: u32,
    },
    /// A stat too low.
    Stat {
        /// Which stat.
        stat: Stat,
        /// Value required.
        required: i32,
        /// Character's derived value.
        actual: i32,
    },
    /// Reputation tier too low.
    Reputation {
        /// Which faction.
        faction: FactionId,
        /// Tier required.
        required: String,
        /// Character's current tier, if the faction has tiers.
        actual: Option<String>,
    },
    /// A prior quest not completed.
    Quest {
        /// The quest that must be completed first.
        quest: QuestId,
    },
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level { required, actual } => {
                write!(f, "requires level {required} (is {actual})")
            }
            Self::Stat {
                stat,
                required,
                actual,
            } => write!(f, "requires {stat} {required} (has {actual})"),
            Self::Reputation {
                faction,
                required,
                actual,
            } => match actual {
                Some(tier) => write!(f, "requires {required} with {faction} (is {tier})"),
                None => write!(f, "requires {required} with {faction}"),
            },
            Self::Quest { quest } => write!(f, "requires completing {quest}"),
        }
    }
}
