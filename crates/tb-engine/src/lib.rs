//! Engine service for Talebound characters.
//!
//! Accepts typed [`ActionRequest`]s, resolves them against the rules in
//! `tb-mechanics` inside per-character exclusive sections, persists the
//! result through a [`Store`] with optimistic version checks, records every
//! dice roll in an append-only audit log, and publishes an
//! [`OutcomeEvent`] to each registered [`EventSink`]. A [`Journal`] turns
//! those events into a readable session record.

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod locks;
pub mod store;

pub use action::{ActionRequest, EntrySelector, Intent};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use events::{EventSink, ItemEvent, MemorySink, OutcomeEvent, QuestEvent, TracingSink};
pub use journal::{Journal, JournalEntry};
pub use locks::LockTable;
pub use store::{MemoryStore, PendingSave, Store};
