//! Experience rewards for narrative actions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dice::{CriticalRule, DiceRoll, DiceSource, Die, RollSpec, resolve};
use crate::error::MechResult;

fn default_base() -> u64 {
    100
}

/// Base experience per action kind and difficulty label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceTable {
    /// `action -> difficulty -> base experience`.
    #[serde(default)]
    pub actions: BTreeMap<String, BTreeMap<String, u64>>,
    /// Used for action kinds missing from `actions`.
    #[serde(default)]
    pub fallback: BTreeMap<String, u64>,
    /// Used when the difficulty label is unknown.
    #[serde(default = "default_base")]
    pub default_base: u64,
}

impl Default for ExperienceTable {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
            fallback: BTreeMap::new(),
            default_base: default_base(),
        }
    }
}

impl ExperienceTable {
    /// Base experience before success and variance adjustments.
    pub fn base(&self, action: &str, difficulty: &str) -> u64 {
        let difficulty = difficulty.to_lowercase();
        let row = self
            .actions
            .get(&action.to_lowercase())
            .unwrap_or(&self.fallback);
        row.get(&difficulty).copied().unwrap_or(self.default_base)
    }
}

/// The variance die: one d21 without criticals, face 1 is 90% and face 21 is 110%.
pub fn variance_spec() -> RollSpec {
    RollSpec::new(Die::Custom(21), 1).with_critical(CriticalRule::Never)
}

/// Experience earned for an action, with the variance roll that shaped it.
///
/// Failure halves the base. A ±10% variance is rolled from `source` as
/// [`variance_spec`]. The result is rounded to the nearest 5 and is never
/// below 5.
pub fn experience_reward(
    table: &ExperienceTable,
    action: &str,
    difficulty: &str,
    success: bool,
    source: &mut dyn DiceSource,
) -> MechResult<(u64, DiceRoll)> {
    let mut base = table.base(action, difficulty);
    if !success {
        base /= 2;
    }
    let context = format!("experience {action}/{difficulty}");
    let roll = resolve(&variance_spec(), 0, Some(&context), source)?;
    let face = u64::try_from(roll.natural()).unwrap_or(11);
    let percent = 89 + face;
    let scaled = base.saturating_mul(percent);
    let rounded = scaled.saturating_add(250) / 500 * 5;
    Ok((rounded.max(5), roll))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedSource;
    use crate::rules::preset;

    fn reward(action: &str, difficulty: &str, success: bool, face: u32) -> u64 {
        let table = preset::standard().experience;
        let mut source = ScriptedSource::new([face]);
        experience_reward(&table, action, difficulty, success, &mut source)
            .unwrap()
            .0
    }

    #[test]
    fn base_lookup() {
        let table = preset::standard().experience;
        assert_eq!(table.base("combat", "boss"), 1000);
        assert_eq!(table.base("Quest", "EPIC"), 2500);
        assert_eq!(table.base("combat", "legendary"), 100);
        assert_eq!(table.base("dancing", "hard"), 200);
    }

    #[test]
    fn variance_bounds() {
        // Face 1 is 90%, face 11 is 100%, face 21 is 110%.
        assert_eq!(reward("combat", "hard", true, 1), 360);
        assert_eq!(reward("combat", "hard", true, 11), 400);
        assert_eq!(reward("combat", "hard", true, 21), 440);
    }

    #[test]
    fn failure_halves() {
        assert_eq!(reward("combat", "hard", false, 11), 200);
    }

    #[test]
    fn rounds_to_five_with_a_floor() {
        assert_eq!(reward("roleplay", "minor", true, 2), 45);
        let mut table = ExperienceTable::default();
        table.default_base = 3;
        let mut source = ScriptedSource::new([1]);
        assert_eq!(
            experience_reward(&table, "x", "y", false, &mut source).unwrap().0,
            5
        );
    }

    #[test]
    fn variance_is_an_ordinary_roll() {
        let table = preset::standard().experience;
        let mut source = ScriptedSource::new([21]);
        let (amount, roll) = experience_reward(&table, "combat", "hard", true, &mut source).unwrap();
        assert_eq!(amount, 440);
        assert_eq!(roll.rolls, vec![21]);
        assert_eq!(roll.spec.die.sides(), 21);
        assert!(!roll.is_critical_success);
        assert_eq!(roll.context.as_deref(), Some("experience combat/hard"));
    }
}
