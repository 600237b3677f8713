use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named character statistic.
///
/// The first six are base attributes stored on every character. The rest
/// only exist as derived values (pool sizes and combat ratings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Physical power.
    Strength,
    /// Agility and reflexes.
    Dexterity,
    /// Endurance and toughness.
    Constitution,
    /// Reasoning and memory.
    Intelligence,
    /// Perception and insight.
    Wisdom,
    /// Force of personality.
    Charisma,
    /// Size of the health pool.
    MaxHealth,
    /// Size of the mana pool.
    MaxMana,
    /// Damage mitigation rating.
    Defense,
    /// Bonus damage rating.
    Damage,
}

/// A stat → value mapping with a stable iteration order.
pub type StatMap = BTreeMap<Stat, i32>;

impl Stat {
    /// The six base attributes, in sheet order.
    pub const ATTRIBUTES: [Stat; 6] = [
        Stat::Strength,
        Stat::Dexterity,
        Stat::Constitution,
        Stat::Intelligence,
        Stat::Wisdom,
        Stat::Charisma,
    ];

    /// Returns true for the six base attributes.
    pub fn is_attribute(self) -> bool {
        Self::ATTRIBUTES.contains(&self)
    }

    /// Parse a stat name or common abbreviation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strength" | "str" => Some(Self::Strength),
            "dexterity" | "dex" => Some(Self::Dexterity),
            "constitution" | "con" => Some(Self::Constitution),
            "intelligence" | "int" => Some(Self::Intelligence),
            "wisdom" | "wis" => Some(Self::Wisdom),
            "charisma" | "cha" => Some(Self::Charisma),
            "max_health" | "health" | "hp" => Some(Self::MaxHealth),
            "max_mana" | "mana" | "mp" => Some(Self::MaxMana),
            "defense" | "def" => Some(Self::Defense),
            "damage" | "dmg" => Some(Self::Damage),
            _ => None,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strength => "strength",
            Self::Dexterity => "dexterity",
            Self::Constitution => "constitution",
            Self::Intelligence => "intelligence",
            Self::Wisdom => "wisdom",
            Self::Charisma => "charisma",
            Self::MaxHealth => "max_health",
            Self::MaxMana => "max_mana",
            Self::Defense => "defense",
            Self::Damage => "damage",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names_and_abbreviations() {
        assert_eq!(Stat::parse("STR"), Some(Stat::Strength));
        assert_eq!(Stat::parse("charisma"), Some(Stat::Charisma));
        assert_eq!(Stat::parse("hp"), Some(Stat::MaxHealth));
        assert_eq!(Stat::parse("luck"), None);
    }

    #[test]
    fn attributes_are_the_first_six() {
        assert!(Stat::Wisdom.is_attribute());
        assert!(!Stat::MaxHealth.is_attribute());
        assert!(!Stat::Defense.is_attribute());
    }

    #[test]
    fn display_matches_serde_name() {
        for stat in [Stat::Strength, Stat::MaxMana, Stat::Damage] {
            let json = serde_json::to_string(&stat).unwrap();
            assert_eq!(json, format!("\"{stat}\""));
        }
    }
}
