//! Rulesets: the data tables that drive progression.
//!
//! A [`RuleSet`] holds the level curve, pool sizes, bag capacity, class
//! tables, and experience reward table. Load one from JSON with
//! [`RuleSet::from_json`] or start from [`preset::standard`].

pub mod experience;
pub mod preset;

pub use experience::{ExperienceTable, experience_reward, variance_spec};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tb_core::StatMap;

use crate::error::{MechError, MechResult};
use crate::stats::Ability;

/// Experience needed for each level-up, as per-level deltas.
///
/// `steps[0]` takes a character from level 1 to 2, `steps[1]` from 2 to 3,
/// and so on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelCurve {
    /// Per-level experience deltas.
    pub steps: Vec<u64>,
}

impl LevelCurve {
    /// A curve from explicit deltas.
    pub fn new(steps: Vec<u64>) -> Self {
        Self { steps }
    }

    /// Experience needed to advance past `level`.
    pub fn threshold(&self, level: u32) -> Option<u64> {
        let index = usize::try_from(level).ok()?.checked_sub(1)?;
        self.steps.get(index).copied()
    }

    /// Highest level the curve can reach.
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.steps.len())
            .map_or(u32::MAX, |n| n.saturating_add(1))
    }

    /// Total experience from level 1 to `level`.
    pub fn total_to(&self, level: u32) -> u64 {
        let count = usize::try_from(level.saturating_sub(1)).unwrap_or(usize::MAX);
        self.steps.iter().take(count).sum()
    }
}

/// Attribute increases and abilities granted on reaching a level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelBonus {
    /// Attribute increases.
    #[serde(default)]
    pub stats: StatMap,
    /// Abilities learned.
    #[serde(default)]
    pub abilities: Vec<String>,
}

/// Everything a class contributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassProgression {
    /// Adjustments to starting attributes.
    #[serde(default)]
    pub attributes: StatMap,
    /// Starting abilities.
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Bonuses by level reached.
    #[serde(default)]
    pub levels: BTreeMap<u32, LevelBonus>,
}

/// A complete progression ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Ruleset name.
    pub name: String,
    /// Experience per level-up.
    pub level_curve: LevelCurve,
    /// Level cap.
    pub max_level: u32,
    /// Attribute points granted per level gained.
    pub points_per_level: u32,
    /// Starting value of every attribute.
    pub base_attribute: i32,
    /// Max health at level 1.
    pub base_health: i32,
    /// Max health gained per level.
    pub health_per_level: i32,
    /// Max mana at level 1.
    pub base_mana: i32,
    /// Max mana gained per level.
    pub mana_per_level: i32,
    /// Unequipped entries a character may carry.
    pub bag_slots: usize,
    /// Abilities every character starts with.
    #[serde(default)]
    pub starting_abilities: Vec<Ability>,
    /// Class tables, keyed by lowercase class name.
    #[serde(default)]
    pub classes: BTreeMap<String, ClassProgression>,
    /// Experience rewards by action kind and difficulty.
    #[serde(default)]
    pub experience: ExperienceTable,
}

impl RuleSet {
    /// Parse a ruleset from JSON.
    pub fn from_json(json: &str) -> MechResult<Self> {
        let rules: Self = serde_json::from_str(json)?;
        if rules.level_curve.steps.is_empty() {
            return Err(MechError::InvalidConfig(
                "level curve must have at least one step".to_string(),
            ));
        }
        Ok(rules)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> MechResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a class (case-insensitive).
    pub fn class(&self, name: &str) -> Option<&ClassProgression> {
        self.classes.get(&name.to_lowercase())
    }

    /// The lower of the configured cap and what the curve can reach.
    pub fn effective_max_level(&self) -> u32 {
        self.max_level.min(self.level_curve.max_level()).max(1)
    }
}
