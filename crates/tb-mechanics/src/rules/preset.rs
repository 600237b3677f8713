//! The standard fantasy ruleset.
//!
//! Ten classes, a twenty-level curve whose per-level cost grows by 1000 each
//! level, and the reward table used for narrative actions.

use std::collections::BTreeMap;

use tb_core::{Stat, StatMap};

use crate::rules::{ClassProgression, ExperienceTable, LevelBonus, LevelCurve, RuleSet};
use crate::stats::{Ability, AbilityKind};

/// The standard ruleset.
pub fn standard() -> RuleSet {
    RuleSet {
        name: "standard".to_string(),
        level_curve: LevelCurve::new((1..=19).map(|n| n * 1000).collect()),
        max_level: 20,
        points_per_level: 1,
        base_attribute: 10,
        base_health: 100,
        health_per_level: 10,
        base_mana: 100,
        mana_per_level: 5,
        bag_slots: 20,
        starting_abilities: vec![
            Ability::new("Rest", AbilityKind::Passive),
            Ability::new("Observe", AbilityKind::Passive),
            Ability::new("Attack", AbilityKind::Active),
        ],
        classes: classes(),
        experience: experience_table(),
    }
}

type Levels = [(&'static str, &'static [(Stat, i32)]); 9];

fn class(
    attributes: &[(Stat, i32)],
    passive: &[&str],
    active: &[&str],
    special: &[&str],
    levels: Levels,
) -> ClassProgression {
    let abilities = [
        (AbilityKind::Passive, passive),
        (AbilityKind::Active, active),
        (AbilityKind::Special, special),
    ]
    .into_iter()
    .flat_map(|(kind, names)| names.iter().map(move |n| Ability::new(*n, kind)))
    .collect();

    ClassProgression {
        attributes: attributes.iter().copied().collect(),
        abilities,
        levels: (2u32..)
            .zip(levels)
            .map(|(level, (ability, stats))| {
                (
                    level,
                    LevelBonus {
                        stats: stats.iter().copied().collect::<StatMap>(),
                        abilities: vec![ability.to_string()],
                    },
                )
            })
            .collect(),
    }
}

fn classes() -> BTreeMap<String, ClassProgression> {
    use Stat::{Charisma as CHA, Constitution as CON, Dexterity as DEX};
    use Stat::{Intelligence as INT, Strength as STR, Wisdom as WIS};

    BTreeMap::from([
        (
            "warrior".to_string(),
            class(
                &[(STR, 5), (CON, 3), (DEX, 2)],
                &["Toughness", "Intimidate"],
                &["Power Strike", "Shield Block", "Charge"],
                &["Berserker Rage"],
                [
                    ("Improved Combat Techniques", &[(STR, 1)]),
                    ("Battle Cry", &[(CON, 1)]),
                    ("Second Wind", &[(STR, 1)]),
                    ("Extra Attack", &[(DEX, 1), (STR, 1)]),
                    ("Defensive Stance", &[(CON, 1)]),
                    ("Intimidating Presence", &[(STR, 1)]),
                    ("Improved Critical", &[(STR, 1), (CON, 1)]),
                    ("Cleave", &[(STR, 1)]),
                    ("Champion's Might", &[(STR, 2), (CON, 1)]),
                ],
            ),
        ),
        (
            "wizard".to_string(),
            class(
                &[(INT, 5), (WIS, 3), (CON, -1)],
                &["Arcane Knowledge", "Spell Focus"],
                &["Fireball", "Magic Missile", "Arcane Shield"],
                &["Teleport", "Time Manipulation"],
                [
                    ("Arcane Recovery", &[(INT, 1)]),
                    ("Spell School Specialization", &[(INT, 1)]),
                    ("Cantrip Mastery", &[(INT, 1)]),
                    ("3rd Level Spells", &[(INT, 1), (WIS, 1)]),
                    ("Arcane Tradition Feature", &[(INT, 1)]),
                    ("4th Level Spells", &[(INT, 1)]),
                    ("Ability Score Improvement", &[(INT, 2)]),
                    ("5th Level Spells", &[(INT, 1)]),
                    ("Arcane Mastery", &[(INT, 1), (WIS, 1)]),
                ],
            ),
        ),
        (
            "rogue".to_string(),
            class(
                &[(DEX, 5), (CHA, 2), (INT, 2)],
                &["Stealth", "Trap Detection"],
                &["Backstab", "Pickpocket", "Evasion"],
                &["Shadow Strike"],
                [
                    ("Cunning Action", &[(DEX, 1)]),
                    ("Roguish Archetype", &[(DEX, 1)]),
                    ("Uncanny Dodge", &[(DEX, 1)]),
                    ("Improved Evasion", &[(DEX, 1)]),
                    ("Expertise", &[(DEX, 1)]),
                    ("Advanced Sneak Attack", &[(DEX, 1)]),
                    ("Ability Score Improvement", &[(DEX, 1), (CHA, 1)]),
                    ("Improved Reflexes", &[(DEX, 1)]),
                    ("Shadow Master", &[(DEX, 2)]),
                ],
            ),
        ),
        (
            "cleric".to_string(),
            class(
                &[(WIS, 5), (CHA, 2), (CON, 2)],
                &["Divine Favor", "Healing Aura"],
                &["Heal", "Smite", "Bless"],
                &["Divine Intervention"],
                [
                    ("Channel Divinity", &[(WIS, 1)]),
                    ("2nd Level Spells", &[(WIS, 1)]),
                    ("Divine Domain Feature", &[(WIS, 1)]),
                    ("3rd Level Spells", &[(WIS, 1), (CHA, 1)]),
                    ("Improved Healing", &[(WIS, 1)]),
                    ("4th Level Spells", &[(WIS, 1)]),
                    ("Divine Strike", &[(WIS, 1), (CON, 1)]),
                    ("5th Level Spells", &[(WIS, 1)]),
                    ("Greater Divine Intervention", &[(WIS, 2)]),
                ],
            ),
        ),
        (
            "bard".to_string(),
            class(
                &[(CHA, 5), (DEX, 2), (INT, 2)],
                &["Charismatic Aura", "Lore Knowledge"],
                &["Inspire", "Soothing Song", "Distraction"],
                &["Epic Performance"],
                [
                    ("Jack of All Trades", &[(CHA, 1)]),
                    ("Bard College", &[(CHA, 1)]),
                    ("Expertise", &[(CHA, 1)]),
                    ("Font of Inspiration", &[(CHA, 1), (DEX, 1)]),
                    ("Countercharm", &[(CHA, 1)]),
                    ("Bard College Feature", &[(CHA, 1)]),
                    ("Ability Score Improvement", &[(CHA, 1), (INT, 1)]),
                    ("Song of Rest Improvement", &[(CHA, 1)]),
                    ("Magical Secrets", &[(CHA, 2)]),
                ],
            ),
        ),
        (
            "ranger".to_string(),
            class(
                &[(DEX, 4), (WIS, 3), (STR, 2)],
                &["Track", "Animal Empathy"],
                &["Precise Shot", "Animal Companion", "Nature's Eye"],
                &["One With Nature"],
                [
                    ("Fighting Style", &[(DEX, 1)]),
                    ("Ranger Conclave", &[(WIS, 1)]),
                    ("Primeval Awareness", &[(DEX, 1)]),
                    ("Extra Attack", &[(DEX, 1), (WIS, 1)]),
                    ("Greater Favored Enemy", &[(DEX, 1)]),
                    ("Ranger Conclave Feature", &[(WIS, 1)]),
                    ("Land's Stride", &[(DEX, 1), (WIS, 1)]),
                    ("Hide in Plain Sight", &[(DEX, 1)]),
                    ("Nature's Warden", &[(WIS, 2)]),
                ],
            ),
        ),
        (
            "paladin".to_string(),
            class(
                &[(STR, 3), (CHA, 3), (CON, 3)],
                &["Divine Sense", "Aura of Protection"],
                &["Lay on Hands", "Divine Smite", "Sacred Oath"],
                &["Holy Avenger"],
                [
                    ("Improved Divine Smite", &[(STR, 1)]),
                    ("Sacred Oath Tenets", &[(CHA, 1)]),
                    ("Divine Health", &[(CON, 1)]),
                    ("Extra Attack", &[(STR, 1), (CHA, 1)]),
                    ("Greater Aura of Protection", &[(CHA, 1)]),
                    ("Sacred Oath Feature", &[(STR, 1)]),
                    ("Aura of Courage", &[(CHA, 1), (WIS, 1)]),
                    ("Divine Sense Improvement", &[(CHA, 1)]),
                    ("Aura of Devotion", &[(CHA, 2)]),
                ],
            ),
        ),
        (
            "druid".to_string(),
            class(
                &[(WIS, 4), (CON, 3), (INT, 2)],
                &["Nature Bond", "Wild Empathy"],
                &["Wild Shape", "Entangle", "Speak with Animals"],
                &["Nature's Wrath"],
                [
                    ("Wild Shape Mastery", &[(WIS, 1)]),
                    ("Druid Circle", &[(WIS, 1)]),
                    ("Wild Shape Improvement", &[(WIS, 1)]),
                    ("3rd Level Spells", &[(WIS, 1), (CON, 1)]),
                    ("Druid Circle Feature", &[(WIS, 1)]),
                    ("4th Level Spells", &[(WIS, 1)]),
                    ("Greater Wild Shape", &[(WIS, 1), (CON, 1)]),
                    ("5th Level Spells", &[(WIS, 1)]),
                    ("Nature's Sanctuary", &[(WIS, 2)]),
                ],
            ),
        ),
        (
            "monk".to_string(),
            class(
                &[(DEX, 4), (WIS, 3), (STR, 2)],
                &["Meditation", "Unarmored Defense"],
                &["Flurry of Blows", "Stunning Strike", "Deflect Missiles"],
                &["Ki Focus"],
                [
                    ("Ki", &[(DEX, 1)]),
                    ("Monastic Tradition", &[(WIS, 1)]),
                    ("Slow Fall", &[(DEX, 1)]),
                    ("Improved Stunning Strike", &[(DEX, 1), (WIS, 1)]),
                    ("Ki-Empowered Strikes", &[(DEX, 1)]),
                    ("Evasion", &[(DEX, 1)]),
                    ("Stillness of Mind", &[(WIS, 1), (DEX, 1)]),
                    ("Unarmored Movement Improvement", &[(DEX, 1)]),
                    ("Purity of Body", &[(CON, 1), (WIS, 1)]),
                ],
            ),
        ),
        (
            "sorcerer".to_string(),
            class(
                &[(CHA, 5), (CON, 2), (INT, 2)],
                &["Magical Heritage", "Elemental Affinity"],
                &["Wild Magic", "Metamagic", "Arcane Blast"],
                &["Sorcerous Origin"],
                [
                    ("Font of Magic", &[(CHA, 1)]),
                    ("Metamagic Adept", &[(CHA, 1)]),
                    ("Sorcerous Origin Feature", &[(CHA, 1)]),
                    ("3rd Level Spells", &[(CHA, 1), (CON, 1)]),
                    ("Additional Metamagic", &[(CHA, 1)]),
                    ("4th Level Spells", &[(CHA, 1)]),
                    ("Ability Score Improvement", &[(CHA, 1), (CON, 1)]),
                    ("5th Level Spells", &[(CHA, 1)]),
                    ("Sorcerous Restoration", &[(CHA, 2)]),
                ],
            ),
        ),
    ])
}

fn row(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
    entries
        .iter()
        .map(|(label, xp)| ((*label).to_string(), *xp))
        .collect()
}

fn experience_table() -> ExperienceTable {
    ExperienceTable {
        actions: BTreeMap::from([
            (
                "combat".to_string(),
                row(&[("easy", 100), ("medium", 200), ("hard", 400), ("boss", 1000)]),
            ),
            (
                "quest".to_string(),
                row(&[("minor", 300), ("standard", 600), ("major", 1200), ("epic", 2500)]),
            ),
            (
                "puzzle".to_string(),
                row(&[("easy", 150), ("medium", 300), ("hard", 600)]),
            ),
            (
                "exploration".to_string(),
                row(&[("location", 100), ("secret", 200), ("landmark", 300)]),
            ),
            (
                "roleplay".to_string(),
                row(&[("minor", 50), ("significant", 150), ("major", 300)]),
            ),
            (
                "crafting".to_string(),
                row(&[("basic", 50), ("advanced", 150), ("masterwork", 300)]),
            ),
        ]),
        fallback: row(&[
            ("easy", 50),
            ("medium", 100),
            ("hard", 200),
            ("minor", 50),
            ("standard", 100),
            ("major", 200),
            ("epic", 500),
            ("boss", 500),
            ("location", 50),
            ("secret", 100),
            ("landmark", 150),
            ("significant", 100),
            ("basic", 50),
            ("advanced", 100),
            ("masterwork", 200),
        ]),
        default_base: 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_matches_cumulative_table() {
        let rules = standard();
        assert_eq!(rules.level_curve.total_to(2), 1000);
        assert_eq!(rules.level_curve.total_to(5), 10_000);
        assert_eq!(rules.level_curve.total_to(20), 190_000);
    }

    #[test]
    fn every_class_has_nine_level_bonuses() {
        let rules = standard();
        assert_eq!(rules.classes.len(), 10);
        for (name, class) in &rules.classes {
            assert_eq!(class.levels.len(), 9, "{name}");
            assert_eq!(class.levels.keys().next(), Some(&2));
            assert_eq!(class.levels.keys().last(), Some(&10));
        }
    }

    #[test]
    fn class_abilities_carry_kinds() {
        let rules = standard();
        let wizard = rules.class("wizard").unwrap();
        let teleport = wizard
            .abilities
            .iter()
            .find(|a| a.name == "Teleport")
            .unwrap();
        assert_eq!(teleport.kind, AbilityKind::Special);
    }
}
