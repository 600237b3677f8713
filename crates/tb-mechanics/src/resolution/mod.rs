//! Interpreting rolls against a difficulty class.
//!
//! A check succeeds when the total meets or beats the DC. Criticals
//! override the comparison in both directions.

pub mod stat;

pub use stat::{StatCheck, stat_modifier};

use serde::{Deserialize, Serialize};

use crate::dice::DiceRoll;

/// The outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// A natural critical; succeeds whatever the total.
    CriticalSuccess {
        /// Total minus DC (may be negative).
        margin: i64,
    },
    /// Total met or beat the DC.
    Success {
        /// Total minus DC.
        margin: i64,
    },
    /// Total fell short of the DC.
    Failure {
        /// Total minus DC (negative).
        margin: i64,
    },
    /// A natural fumble; fails whatever the total.
    CriticalFailure {
        /// Total minus DC (may be positive).
        margin: i64,
    },
}

impl Outcome {
    /// Returns true for both kinds of success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess { .. } | Self::Success { .. })
    }

    /// Total minus DC.
    pub fn margin(self) -> i64 {
        match self {
            Self::CriticalSuccess { margin }
            | Self::Success { margin }
            | Self::Failure { margin }
            | Self::CriticalFailure { margin } => margin,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CriticalSuccess { margin } => write!(f, "Critical Success (margin {margin})"),
            Self::Success { margin } => write!(f, "Success (margin {margin})"),
            Self::Failure { margin } => write!(f, "Failure (margin {margin})"),
            Self::CriticalFailure { margin } => write!(f, "Critical Failure (margin {margin})"),
        }
    }
}

/// Compare a roll against a difficulty class.
pub fn check(roll: &DiceRoll, dc: i64) -> Outcome {
    let margin = roll.total.saturating_sub(dc);
    if roll.is_critical_success {
        Outcome::CriticalSuccess { margin }
    } else if roll.is_critical_failure {
        Outcome::CriticalFailure { margin }
    } else if margin >= 0 {
        Outcome::Success { margin }
    } else {
        Outcome::Failure { margin }
    }
}
