//! Experience and level-ups.

use serde::{Deserialize, Serialize};
use tb_core::StatMap;

use super::{Ability, AbilityKind, Character};
use crate::error::{MechError, MechResult};
use crate::rules::RuleSet;

/// What one level-up granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGain {
    /// The level reached.
    pub level: u32,
    /// Attribute points granted.
    pub points: u32,
    /// Class attribute increases.
    pub stats: StatMap,
    /// Abilities learned.
    pub abilities: Vec<String>,
}

/// The result of granting experience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    /// Experience granted.
    pub gained: u64,
    /// Level before.
    pub previous_level: u32,
    /// Level after.
    pub level: u32,
    /// Progress within the new level band.
    pub experience: u64,
    /// Experience needed for the next level, or `None` at the cap.
    pub next_threshold: Option<u64>,
    /// Every level gained, in order.
    pub levels: Vec<LevelGain>,
}

impl LevelReport {
    /// Returns true if at least one level was gained.
    pub fn leveled_up(&self) -> bool {
        !self.levels.is_empty()
    }
}

/// Grant experience and apply every level-up it pays for.
///
/// Each level's threshold is subtracted as it is crossed and the leftover
/// carries into the next band, so one large grant can gain several levels.
/// At the maximum level experience still accumulates but no level is gained.
pub fn apply_experience(
    character: &mut Character,
    amount: i64,
    rules: &RuleSet,
) -> MechResult<LevelReport> {
    let gained = u64::try_from(amount).map_err(|_| {
        MechError::InvalidAmount(format!("experience must not be negative (got {amount})"))
    })?;

    let previous_level = character.level;
    character.experience = character.experience.saturating_add(gained);
    character.lifetime_experience = character.lifetime_experience.saturating_add(gained);

    let mut levels = Vec::new();
    while character.level < rules.effective_max_level() {
        let Some(threshold) = rules.level_curve.threshold(character.level) else {
            break;
        };
        if character.experience < threshold {
            break;
        }
        character.experience -= threshold;
        character.level += 1;
        levels.push(grant_level(character, rules));
    }

    Ok(LevelReport {
        gained,
        previous_level,
        level: character.level,
        experience: character.experience,
        next_threshold: next_threshold(character.level, rules),
        levels,
    })
}

fn next_threshold(level: u32, rules: &RuleSet) -> Option<u64> {
    if level >= rules.effective_max_level() {
        return None;
    }
    rules.level_curve.threshold(level)
}

fn grant_level(character: &mut Character, rules: &RuleSet) -> LevelGain {
    let level = character.level;
    character.unspent_points = character
        .unspent_points
        .saturating_add(rules.points_per_level);

    let mut stats = StatMap::new();
    let mut abilities = Vec::new();
    if let Some(bonus) = rules
        .class(&character.class)
        .and_then(|c| c.levels.get(&level))
    {
        for (stat, delta) in bonus.stats.iter().filter(|(s, _)| s.is_attribute()) {
            let value = character.attributes.entry(*stat).or_insert(rules.base_attribute);
            *value = value.saturating_add(*delta);
            stats.insert(*stat, *delta);
        }
        for name in &bonus.abilities {
            if !character.has_ability(name) {
                character
                    .abilities
                    .push(Ability::new(name.clone(), AbilityKind::Active));
                abilities.push(name.clone());
            }
        }
    }

    LevelGain {
        level,
        points: rules.points_per_level,
        stats,
        abilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{LevelCurve, preset};
    use tb_core::{Stat, UserId};

    fn rules_with_curve(steps: &[u64]) -> RuleSet {
        let mut rules = preset::standard();
        rules.level_curve = LevelCurve::new(steps.to_vec());
        rules
    }

    #[test]
    fn multi_level_gain_carries_leftover() {
        let rules = rules_with_curve(&[100, 80, 500]);
        let mut c = Character::new(UserId::new(), "Ada", "wizard", &rules);
        let report = apply_experience(&mut c, 200, &rules).unwrap();
        assert_eq!(report.level, 3);
        assert_eq!(report.experience, 20);
        assert_eq!(report.levels.len(), 2);
        assert_eq!(report.next_threshold, Some(500));
        assert_eq!(c.lifetime_experience, 200);
        assert_eq!(c.unspent_points, 2 * rules.points_per_level);
    }

    #[test]
    fn class_bonuses_apply_per_level() {
        let rules = preset::standard();
        let mut c = Character::new(UserId::new(), "Brakka", "warrior", &rules);
        let report = apply_experience(&mut c, 3000, &rules).unwrap();
        assert_eq!(report.level, 3);
        assert_eq!(report.experience, 0);
        // Level 2 gives +1 strength, level 3 gives +1 constitution.
        assert_eq!(c.attribute(Stat::Strength), 16);
        assert_eq!(c.attribute(Stat::Constitution), 14);
        assert_eq!(report.levels[0].abilities, vec!["Improved Combat Techniques"]);
        assert!(c.has_ability("Battle Cry"));
    }

    #[test]
    fn below_threshold_just_accumulates() {
        let rules = preset::standard();
        let mut c = Character::new(UserId::new(), "Ada", "wizard", &rules);
        let report = apply_experience(&mut c, 999, &rules).unwrap();
        assert!(!report.leveled_up());
        assert_eq!(c.experience, 999);
        assert_eq!(report.next_threshold, Some(1000));
    }

    #[test]
    fn negative_experience_is_rejected() {
        let rules = preset::standard();
        let mut c = Character::new(UserId::new(), "Ada", "wizard", &rules);
        let before = c.clone();
        assert!(matches!(
            apply_experience(&mut c, -5, &rules),
            Err(MechError::InvalidAmount(_))
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn experience_past_the_cap_accumulates() {
        let rules = rules_with_curve(&[10, 10]);
        let mut c = Character::new(UserId::new(), "Ada", "wizard", &rules);
        let report = apply_experience(&mut c, 1000, &rules).unwrap();
        assert_eq!(report.level, 3);
        assert_eq!(report.experience, 980);
        assert_eq!(report.next_threshold, None);
        let report = apply_experience(&mut c, 5, &rules).unwrap();
        assert_eq!(report.level, 3);
        assert_eq!(c.experience, 985);
    }

    proptest::proptest! {
        #[test]
        fn level_never_decreases(grants in proptest::collection::vec(0i64..5000, 1..20)) {
            let rules = preset::standard();
            let mut c = Character::new(UserId::new(), "Ada", "wizard", &rules);
            let mut total = 0u64;
            for grant in grants {
                let before = c.level;
                apply_experience(&mut c, grant, &rules).unwrap();
                total += grant as u64;
                proptest::prop_assert!(c.level >= before);
            }
            proptest::prop_assert_eq!(c.lifetime_experience, total);
        }
    }
}
