//! Error types for the engine service.

use tb_core::CharacterId;
use tb_mechanics::MechError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while dispatching an action.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule rejected the action. State is unchanged.
    #[error(transparent)]
    Mechanics(#[from] MechError),

    /// The stored aggregate changed since it was loaded.
    #[error("character {character} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification {
        /// The contested character.
        character: CharacterId,
        /// Version the writer loaded.
        expected: u64,
        /// Version in the store.
        found: u64,
    },

    /// A dice roll could not be written to the audit log.
    #[error("failed to record roll: {0}")]
    RecordFailed(String),

    /// The store has no such character.
    #[error("character {0} not found")]
    CharacterNotFound(CharacterId),

    /// A character with this id is already stored.
    #[error("character {0} already exists")]
    CharacterExists(CharacterId),

    /// The request is malformed (missing target, unknown entry selector, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mechanics(err) => err.kind(),
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::RecordFailed(_) => "record_failed",
            Self::CharacterNotFound(_) => "character_not_found",
            Self::CharacterExists(_) => "character_exists",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) => "store",
        }
    }

    /// Returns true if re-running the whole request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanics_kinds_pass_through() {
        let err: EngineError = MechError::Incapacitated.into();
        assert_eq!(err.kind(), "incapacitated");
        assert_eq!(err.to_string(), "character is incapacitated");
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let err = EngineError::ConcurrentModification {
            character: CharacterId::new(),
            expected: 3,
            found: 4,
        };
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "concurrent_modification");
    }
}
