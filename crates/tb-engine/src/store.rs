//! The persistence collaborator and its in-memory implementation.
//!
//! The engine loads a whole [`CharacterState`] aggregate, works on it, and
//! saves it back with the version it loaded. A save whose expected version
//! no longer matches is rejected with
//! [`EngineError::ConcurrentModification`]; a batch is all-or-nothing.

use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use tb_core::CharacterId;
use tb_mechanics::{CharacterState, DiceRoll};

use crate::error::{EngineError, EngineResult};

/// One aggregate to write, with the version the writer loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    /// `None` for a character that must not exist yet.
    pub expected_version: Option<u64>,
    /// The new state, already carrying its bumped version.
    pub state: CharacterState,
}

/// Durable storage for character aggregates and the dice audit log.
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
    /// Load a character aggregate.
    fn load(&self, id: CharacterId) -> EngineResult<Option<CharacterState>>;

    /// Save aggregates transactionally. Every expected version is checked
    /// before anything is written.
    fn save(&self, batch: &[PendingSave]) -> EngineResult<()>;

    /// Append a roll to the audit log.
    fn append_roll(&self, roll: &DiceRoll) -> EngineResult<()>;

    /// Rolls in the audit log, oldest first, optionally for one actor.
    fn rolls(&self, actor: Option<CharacterId>) -> EngineResult<Vec<DiceRoll>>;

    /// Delete a character. Returns false if it did not exist.
    fn delete(&self, id: CharacterId) -> EngineResult<bool>;

    /// Ids of every stored character.
    fn ids(&self) -> EngineResult<Vec<CharacterId>>;
}

/// A [`Store`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: DashMap<CharacterId, CharacterState>,
    rolls: Mutex<Vec<DiceRoll>>,
    commit: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored characters.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether no characters are stored.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    fn check(&self, write: &PendingSave) -> EngineResult<()> {
        let id = write.state.id();
        let stored = self.characters.get(&id).map(|s| s.version());
        match (write.expected_version, stored) {
            (None, Some(_)) => Err(EngineError::CharacterExists(id)),
            (Some(_), None) => Err(EngineError::CharacterNotFound(id)),
            (Some(expected), Some(found)) if expected != found => {
                Err(EngineError::ConcurrentModification {
                    character: id,
                    expected,
                    found,
                })
            }
            _ => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn load(&self, id: CharacterId) -> EngineResult<Option<CharacterState>> {
        Ok(self.characters.get(&id).map(|s| s.clone()))
    }

    fn save(&self, batch: &[PendingSave]) -> EngineResult<()> {
        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        for write in batch {
            self.check(write)?;
        }
        for write in batch {
            self.characters.insert(write.state.id(), write.state.clone());
        }
        Ok(())
    }

    fn append_roll(&self, roll: &DiceRoll) -> EngineResult<()> {
        self.rolls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(roll.clone());
        Ok(())
    }

    fn rolls(&self, actor: Option<CharacterId>) -> EngineResult<Vec<DiceRoll>> {
        let rolls = self.rolls.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rolls
            .iter()
            .filter(|r| actor.is_none() || r.actor == actor)
            .cloned()
            .collect())
    }

    fn delete(&self, id: CharacterId) -> EngineResult<bool> {
        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.characters.remove(&id).is_some())
    }

    fn ids(&self) -> EngineResult<Vec<CharacterId>> {
        let mut ids: Vec<CharacterId> = self.characters.iter().map(|e| *e.key()).collect();
        ids.sort();
        Ok(ids)
    }
}
