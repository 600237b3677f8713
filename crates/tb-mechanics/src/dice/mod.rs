//! Dice specs, expressions, sources, and auditable rolls.
//!
//! A [`RollSpec`] names the die, how many to roll, a flat modifier, and the
//! critical policy. [`resolve`] turns a spec into a [`DiceRoll`] using an
//! injectable [`DiceSource`], so the same seed always replays the same roll.

pub mod roll;
pub mod source;

pub use roll::{DiceRoll, resolve};
pub use source::{DiceSource, RngSource, ScriptedSource};

use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};

/// Most dice a single spec may roll.
pub const MAX_DICE: u32 = 100;

/// A polyhedral die type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Die {
    /// Four-sided die.
    D4,
    /// Six-sided die.
    D6,
    /// Eight-sided die.
    D8,
    /// Ten-sided die.
    D10,
    /// Twelve-sided die.
    D12,
    /// Twenty-sided die.
    D20,
    /// Percentile die (1-100).
    D100,
    /// A die with a custom number of faces (at least 2).
    Custom(u32),
}

impl Die {
    /// Number of faces.
    pub fn sides(self) -> u32 {
        match self {
            Self::D4 => 4,
            Self::D6 => 6,
            Self::D8 => 8,
            Self::D10 => 10,
            Self::D12 => 12,
            Self::D20 => 20,
            Self::D100 => 100,
            Self::Custom(n) => n,
        }
    }

    /// The die with this many faces. Standard sizes map to their named variant.
    pub fn with_sides(sides: u32) -> MechResult<Self> {
        match sides {
            4 => Ok(Self::D4),
            6 => Ok(Self::D6),
            8 => Ok(Self::D8),
            10 => Ok(Self::D10),
            12 => Ok(Self::D12),
            20 => Ok(Self::D20),
            100 => Ok(Self::D100),
            n if n >= 2 => Ok(Self::Custom(n)),
            n => Err(MechError::InvalidDice(format!("a die needs at least 2 faces, got {n}"))),
        }
    }

    /// Parse a die tag like "d20" or "d30".
    pub fn from_str_tag(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let sides = s.strip_prefix('d')?.parse::<u32>().ok()?;
        Self::with_sides(sides).ok()
    }
}

impl From<Die> for u32 {
    fn from(die: Die) -> Self {
        die.sides()
    }
}

impl TryFrom<u32> for Die {
    type Error = MechError;

    fn try_from(sides: u32) -> MechResult<Self> {
        Self::with_sides(sides)
    }
}

impl std::fmt::Display for Die {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// When a roll counts as a critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalRule {
    /// Only a single d20 crits: natural 20 succeeds, natural 1 fails.
    #[default]
    SingleD20,
    /// Every die showing its maximum succeeds, every die showing 1 fails.
    EveryDie,
    /// No criticals.
    Never,
}

/// What to roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSpec {
    /// Die type.
    pub die: Die,
    /// Number of dice (1..=[`MAX_DICE`]).
    pub count: u32,
    /// Flat modifier written into the expression (e.g. the `+3` of `2d6+3`).
    #[serde(default)]
    pub modifier: i64,
    /// Critical policy.
    #[serde(default)]
    pub critical: CriticalRule,
}

impl RollSpec {
    /// `count` dice of one type, no modifier, default criticals.
    pub fn new(die: Die, count: u32) -> Self {
        Self {
            die,
            count,
            modifier: 0,
            critical: CriticalRule::default(),
        }
    }

    /// A single d20.
    pub fn d20() -> Self {
        Self::new(Die::D20, 1)
    }

    /// Set the flat modifier.
    pub fn with_modifier(mut self, modifier: i64) -> Self {
        self.modifier = modifier;
        self
    }

    /// Set the critical policy.
    pub fn with_critical(mut self, critical: CriticalRule) -> Self {
        self.critical = critical;
        self
    }

    /// Reject specs that cannot be rolled.
    pub fn validate(&self) -> MechResult<()> {
        if self.die.sides() < 2 {
            return Err(MechError::InvalidDice(format!(
                "a die needs at least 2 faces, got {}",
                self.die.sides()
            )));
        }
        if self.count == 0 {
            return Err(MechError::InvalidDice("roll at least one die".to_string()));
        }
        if self.count > MAX_DICE {
            return Err(MechError::InvalidDice(format!(
                "at most {MAX_DICE} dice per roll, got {}",
                self.count
            )));
        }
        Ok(())
    }

    /// Parse a dice expression: `NdF`, `dF`, optionally followed by `+M` or `-M`.
    ///
    /// ```
    /// use tb_mechanics::dice::{Die, RollSpec};
    ///
    /// let spec = RollSpec::parse("2d6+3").unwrap();
    /// assert_eq!((spec.die, spec.count, spec.modifier), (Die::D6, 2, 3));
    /// ```
    pub fn parse(expr: &str) -> MechResult<Self> {
        let compact: String = expr
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let bad = || MechError::InvalidDice(format!("cannot parse \"{expr}\""));

        let (count_part, rest) = compact.split_once('d').ok_or_else(bad)?;
        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().map_err(|_| bad())?
        };

        let (faces_part, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let (faces, signed) = rest.split_at(pos);
                let (negative, digits) = match signed.split_at(1) {
                    ("-", digits) => (true, digits),
                    (_, digits) => (false, digits),
                };
                if !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(bad());
                }
                let value = digits.parse::<i64>().map_err(|_| bad())?;
                let modifier = if negative {
                    value.checked_neg().ok_or_else(bad)?
                } else {
                    value
                };
                (faces, modifier)
            }
            None => (rest, 0),
        };
        let sides = faces_part.parse::<u32>().map_err(|_| bad())?;

        let spec = Self::new(Die::with_sides(sides)?, count).with_modifier(modifier);
        spec.validate()?;
        Ok(spec)
    }
}

impl std::fmt::Display for RollSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 1 {
            write!(f, "{}", self.die)?;
        } else {
            write!(f, "{}{}", self.count, self.die)?;
        }
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn die_sides() {
        assert_eq!(Die::D4.sides(), 4);
        assert_eq!(Die::D100.sides(), 100);
        assert_eq!(Die::Custom(30).sides(), 30);
    }

    #[test]
    fn die_from_str() {
        assert_eq!(Die::from_str_tag("d20"), Some(Die::D20));
        assert_eq!(Die::from_str_tag("D6"), Some(Die::D6));
        assert_eq!(Die::from_str_tag("d30"), Some(Die::Custom(30)));
        assert_eq!(Die::from_str_tag("d1"), None);
        assert_eq!(Die::from_str_tag("foo"), None);
    }

    #[test]
    fn die_serializes_as_faces() {
        assert_eq!(serde_json::to_string(&Die::D20).unwrap(), "20");
        let die: Die = serde_json::from_str("7").unwrap();
        assert_eq!(die, Die::Custom(7));
        assert!(serde_json::from_str::<Die>("1").is_err());
    }

    #[test]
    fn parse_expressions() {
        let spec = RollSpec::parse("2d6+3").unwrap();
        assert_eq!((spec.die, spec.count, spec.modifier), (Die::D6, 2, 3));

        let spec = RollSpec::parse("d20-1").unwrap();
        assert_eq!((spec.die, spec.count, spec.modifier), (Die::D20, 1, -1));

        let spec = RollSpec::parse("d20-9223372036854775807").unwrap();
        assert_eq!(spec.modifier, -i64::MAX);

        let spec = RollSpec::parse(" 3D8 ").unwrap();
        assert_eq!((spec.die, spec.count, spec.modifier), (Die::D8, 3, 0));
    }

    #[test]
    fn parse_rejects_nonsense() {
        for expr in [
            "",
            "d",
            "2x6",
            "0d6",
            "2d1",
            "2d6+",
            "d6+x",
            "101d6",
            "d20--1",
            "d20+-1",
            "d20++1",
            "d20--9223372036854775808",
            "d20+99999999999999999999",
        ] {
            assert!(
                matches!(RollSpec::parse(expr), Err(MechError::InvalidDice(_))),
                "{expr} should be rejected"
            );
        }
    }

    #[test]
    fn spec_display() {
        assert_eq!(RollSpec::parse("2d6+3").unwrap().to_string(), "2d6+3");
        assert_eq!(RollSpec::parse("d20-1").unwrap().to_string(), "d20-1");
        assert_eq!(RollSpec::d20().to_string(), "d20");
    }
}
