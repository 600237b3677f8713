//! Where dice faces come from.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{MechError, MechResult};

/// A supplier of uniform die faces.
///
/// Implementations must return a value in `1..=faces`.
pub trait DiceSource: Send {
    /// Roll one die with the given number of faces.
    fn next_face(&mut self, faces: u32) -> MechResult<u32>;
}

/// Faces drawn from a [`StdRng`].
///
/// A seeded source replays the same sequence for the same seed; an entropy
/// source is seeded from the operating system.
#[derive(Debug, Clone)]
pub struct RngSource {
    rng: StdRng,
}

impl RngSource {
    /// A deterministic source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl DiceSource for RngSource {
    fn next_face(&mut self, faces: u32) -> MechResult<u32> {
        if faces < 2 {
            return Err(MechError::InvalidDice(format!(
                "a die needs at least 2 faces, got {faces}"
            )));
        }
        Ok(self.rng.random_range(1..=faces))
    }
}

/// Replays recorded faces in order. Useful for audits and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    faces: VecDeque<u32>,
}

impl ScriptedSource {
    /// Replay these faces.
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedSource {
    fn next_face(&mut self, faces: u32) -> MechResult<u32> {
        let face = self.faces.pop_front().ok_or(MechError::DiceExhausted)?;
        if face == 0 || face > faces {
            return Err(MechError::InvalidDice(format!(
                "scripted face {face} does not fit a d{faces}"
            )));
        }
        Ok(face)
    }
}
