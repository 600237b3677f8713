//! Core types for Talebound: identifiers, stats, and the item/quest/faction catalog.
//!
//! This crate defines the reference data the rules engine reads. Catalog
//! entities are immutable once published: changing an item publishes a new
//! version instead of mutating the old one. You can build a [`Catalog`]
//! programmatically or load one from JSON.

/// The versioned catalog of items, quests, and factions.
pub mod catalog;
/// Error types used throughout the crate.
pub mod error;
/// Factions, standing tiers, and tier lookup.
pub mod faction;
/// Identifier newtypes for runtime records and catalog entries.
pub mod id;
/// Item definitions, slots, rarities, and use-effects.
pub mod item;
/// Quest definitions, objectives, branches, and rewards.
pub mod quest;
/// Prerequisite requirements shared by items and quests.
pub mod requirement;
/// Character stat names.
pub mod stat;

/// Re-export the catalog.
pub use catalog::{Catalog, CatalogFile};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export faction types.
pub use faction::{Faction, Tier};
/// Re-export identifiers.
pub use id::{
    CharacterId, EntryId, FactionId, GroupId, ItemId, ObjectiveId, ProgressId, QuestId, RollId,
    UserId,
};
/// Re-export item types.
pub use item::{EquipSlot, Item, ItemEffect, ItemKind, ItemRef, Rarity};
/// Re-export quest types.
pub use quest::{
    Difficulty, GroupMode, IMPLICIT_GROUP, ItemGrant, Objective, ObjectiveGroup, ObjectiveKind, Quest,
    QuestReward, ReputationGrant,
};
/// Re-export requirement types.
pub use requirement::{ReputationGate, Requirements, Unmet};
/// Re-export stat types.
pub use stat::{Stat, StatMap};
