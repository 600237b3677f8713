//! Stat checks: a d20 plus the modifier of one derived stat.

use serde::{Deserialize, Serialize};
use tb_core::{Stat, StatMap};

use crate::dice::{DiceRoll, DiceSource, RollSpec, resolve};
use crate::error::MechResult;
use crate::resolution::{Outcome, check};

/// The d20 modifier of a stat value: `(value - 10) / 2`, rounded down.
pub fn stat_modifier(value: i32) -> i64 {
    (i64::from(value) - 10).div_euclid(2)
}

/// A request to test one stat against a DC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCheck {
    /// The stat whose modifier applies.
    pub stat: Stat,
    /// Difficulty class.
    pub dc: i64,
    /// Extra situational modifiers (cover, help, fatigue).
    #[serde(default)]
    pub situational: Vec<i64>,
}

impl StatCheck {
    /// Test `stat` against `dc`.
    pub fn new(stat: Stat, dc: i64) -> Self {
        Self {
            stat,
            dc,
            situational: Vec::new(),
        }
    }

    /// Add a situational modifier.
    pub fn with_modifier(mut self, modifier: i64) -> Self {
        self.situational.push(modifier);
        self
    }

    /// Total modifier for a character with these derived stats.
    pub fn modifier_total(&self, derived: &StatMap) -> i64 {
        let base = stat_modifier(derived.get(&self.stat).copied().unwrap_or(10));
        self.situational
            .iter()
            .fold(base, |acc, m| acc.saturating_add(*m))
    }

    /// Roll a d20 and compare against the DC.
    pub fn roll(
        &self,
        derived: &StatMap,
        context: Option<&str>,
        source: &mut dyn DiceSource,
    ) -> MechResult<(DiceRoll, Outcome)> {
        let roll = resolve(&RollSpec::d20(), self.modifier_total(derived), context, source)?;
        let outcome = check(&roll, self.dc);
        Ok((roll, outcome))
    }
}
