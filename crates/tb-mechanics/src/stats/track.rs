//! Clamped resource pools (health, mana).

use serde::{Deserialize, Serialize};

/// A numeric pool that always stays within `0..=max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Current value.
    pub current: i32,
    /// Maximum value.
    pub max: i32,
}

impl Track {
    /// A full pool.
    pub fn full(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    /// A pool at `current`, clamped into bounds.
    pub fn at(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Add a signed delta, clamping to bounds. Returns the new value.
    pub fn adjust(&mut self, delta: i64) -> i32 {
        let next = i64::from(self.current)
            .saturating_add(delta)
            .clamp(0, i64::from(self.max));
        // Clamped into 0..=max, which fits in i32.
        self.current = i32::try_from(next).unwrap_or(self.max);
        self.current
    }

    /// Change the maximum. The current value is clamped down, never raised.
    pub fn resize(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }

    /// Returns true at 0.
    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    /// Returns true at the maximum.
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Filled fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            return 1.0;
        }
        f64::from(self.current) / f64::from(self.max)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}
