//! Error types for the rules engine.

use tb_core::{CoreError, EntryId, EquipSlot, FactionId, ItemId, ItemRef, ObjectiveId, QuestId, Unmet};

use crate::quest::QuestStatus;

/// Errors raised by rule operations.
///
/// Validation and consistency errors are returned before any state is
/// touched. Composite operations that fail part-way roll back and report
/// the cause (see [`MechError::RewardApplicationFailed`]).
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// A negative, zero, or otherwise unusable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The bag does not have enough free entry slots.
    #[error("inventory full: need {needed} free slot(s), {available} available")]
    CapacityExceeded {
        /// Entry slots the operation needs.
        needed: usize,
        /// Entry slots still free.
        available: usize,
    },

    /// Another entry already occupies the equipment slot.
    #[error("slot {slot} is occupied by entry {occupant}")]
    SlotOccupied {
        /// The contested slot.
        slot: EquipSlot,
        /// The entry currently in it.
        occupant: EntryId,
    },

    /// The character does not meet an item's requirements.
    #[error("requirements not met: {}", join(.0))]
    RequirementsNotMet(Vec<Unmet>),

    /// Fewer units are held than requested.
    #[error("insufficient quantity: requested {requested}, have {available}")]
    InsufficientQuantity {
        /// Units requested.
        requested: u32,
        /// Units in the entry.
        available: u32,
    },

    /// The character does not meet a quest's prerequisites.
    #[error("prerequisites for {quest} not met: {}", join(.unmet))]
    PrerequisitesNotMet {
        /// The quest being started.
        quest: QuestId,
        /// Every failed prerequisite.
        unmet: Vec<Unmet>,
    },

    /// The quest already has a non-terminal record.
    #[error("quest {0} is already in progress")]
    AlreadyActive(QuestId),

    /// The reward bundle could not be applied; nothing was granted.
    #[error("reward for {quest} could not be applied: {source}")]
    RewardApplicationFailed {
        /// The quest being completed.
        quest: QuestId,
        /// Why the reward failed.
        source: Box<MechError>,
    },

    /// No faction with this key exists.
    #[error("unknown faction: {0}")]
    UnknownFaction(FactionId),

    /// No item with this key exists.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// No quest with this key exists.
    #[error("unknown quest: {0}")]
    UnknownQuest(QuestId),

    /// The quest is not in a state that allows this operation.
    #[error("cannot {action} quest {quest} while {status}")]
    InvalidTransition {
        /// The quest.
        quest: QuestId,
        /// Its current status.
        status: QuestStatus,
        /// What was attempted.
        action: &'static str,
    },

    /// A finished quest that cannot be attempted again.
    #[error("quest {0} is not repeatable")]
    NotRepeatable(QuestId),

    /// The evaluator rejected the evidence.
    #[error("objective {objective} of {quest} not met")]
    ObjectiveNotMet {
        /// The quest.
        quest: QuestId,
        /// The objective.
        objective: ObjectiveId,
    },

    /// The quest has no objective with this key.
    #[error("quest {quest} has no objective {objective}")]
    UnknownObjective {
        /// The quest.
        quest: QuestId,
        /// The missing objective.
        objective: ObjectiveId,
    },

    /// An ordered quest's earlier objective is still open.
    #[error("objective {objective} of {quest} must wait for {waiting_on}")]
    ObjectiveOutOfOrder {
        /// The quest.
        quest: QuestId,
        /// The objective that was recorded too early.
        objective: ObjectiveId,
        /// The first open objective before it.
        waiting_on: ObjectiveId,
    },

    /// The character is at 0 health and cannot act offensively.
    #[error("character is incapacitated")]
    Incapacitated,

    /// The item has no equipment slot.
    #[error("{0} cannot be equipped")]
    NotEquippable(ItemRef),

    /// The item has no use-effects to consume.
    #[error("{0} is not consumable")]
    NotConsumable(ItemRef),

    /// Equipped entries must be unequipped first.
    #[error("entry {0} is equipped")]
    ItemEquipped(EntryId),

    /// The entry's durability is spent.
    #[error("entry {0} is broken")]
    ItemBroken(EntryId),

    /// No inventory entry with this id.
    #[error("entry {0} not found")]
    EntryNotFound(EntryId),

    /// A malformed dice spec or expression.
    #[error("invalid dice: {0}")]
    InvalidDice(String),

    /// A scripted dice source ran out of faces.
    #[error("dice source exhausted")]
    DiceExhausted,

    /// A ruleset or catalog reference that cannot be used.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Any other catalog failure.
    #[error("catalog error: {0}")]
    Catalog(CoreError),

    /// A ruleset document could not be parsed.
    #[error("invalid ruleset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CoreError> for MechError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownItem(id) => Self::UnknownItem(id),
            CoreError::UnknownQuest(id) => Self::UnknownQuest(id),
            CoreError::UnknownFaction(id) => Self::UnknownFaction(id),
            other => Self::Catalog(other),
        }
    }
}

impl MechError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "invalid_amount",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::SlotOccupied { .. } => "slot_occupied",
            Self::RequirementsNotMet(_) => "requirements_not_met",
            Self::InsufficientQuantity { .. } => "insufficient_quantity",
            Self::PrerequisitesNotMet { .. } => "prerequisites_not_met",
            Self::AlreadyActive(_) => "already_active",
            Self::RewardApplicationFailed { .. } => "reward_application_failed",
            Self::UnknownFaction(_) => "unknown_faction",
            Self::UnknownItem(_) => "unknown_item",
            Self::UnknownQuest(_) => "unknown_quest",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotRepeatable(_) => "not_repeatable",
            Self::ObjectiveNotMet { .. } => "objective_not_met",
            Self::UnknownObjective { .. } => "unknown_objective",
            Self::ObjectiveOutOfOrder { .. } => "objective_out_of_order",
            Self::Incapacitated => "incapacitated",
            Self::NotEquippable(_) => "not_equippable",
            Self::NotConsumable(_) => "not_consumable",
            Self::ItemEquipped(_) => "item_equipped",
            Self::ItemBroken(_) => "item_broken",
            Self::EntryNotFound(_) => "entry_not_found",
            Self::InvalidDice(_) => "invalid_dice",
            Self::DiceExhausted => "dice_exhausted",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Catalog(_) => "catalog",
            Self::Json(_) => "json",
        }
    }
}

fn join(unmet: &[Unmet]) -> String {
    unmet
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience result type for rule operations.
pub type MechResult<T> = Result<T, MechError>;
