use crate::id::{FactionId, ItemId, QuestId};
use crate::item::ItemRef;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No item with this key has been published.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// The item exists, but not at the requested version.
    #[error("unknown item version: {0}")]
    UnknownItemVersion(ItemRef),

    /// No quest with this key exists.
    #[error("unknown quest: {0}")]
    UnknownQuest(QuestId),

    /// No faction with this key exists.
    #[error("unknown faction: {0}")]
    UnknownFaction(FactionId),

    /// A quest or faction with the same key was already added.
    #[error("duplicate {kind}: \"{id}\"")]
    Duplicate {
        /// What was duplicated ("quest" or "faction").
        kind: &'static str,
        /// The duplicated key.
        id: String,
    },

    /// A definition failed structural validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The catalog document could not be parsed.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}
