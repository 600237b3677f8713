//! Typed action requests.
//!
//! An [`ActionRequest`] is what the conversation layer sends when something
//! happens in the story: who acts, on whom, and what they intend. Requests
//! are plain serde data so they can arrive as JSON.

use serde::{Deserialize, Serialize};
use tb_core::{CharacterId, EntryId, FactionId, ItemId, ObjectiveId, QuestId, Stat};
use tb_mechanics::{Evidence, Inventory, InventoryEntry, Overrides};

use crate::error::{EngineError, EngineResult};

/// A narrative event to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The acting character.
    pub actor: CharacterId,
    /// The other party, for intents that involve one (transfers).
    #[serde(default)]
    pub target: Option<CharacterId>,
    /// What the actor wants to do.
    pub intent: Intent,
}

impl ActionRequest {
    /// A request with no target.
    pub fn new(actor: CharacterId, intent: Intent) -> Self {
        Self {
            actor,
            target: None,
            intent,
        }
    }

    /// Set the target.
    pub fn with_target(mut self, target: CharacterId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Picks an inventory entry, either by id or by the item it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySelector {
    /// An exact entry.
    Entry(EntryId),
    /// The first matching entry of this item.
    Item(ItemId),
}

impl From<EntryId> for EntrySelector {
    fn from(id: EntryId) -> Self {
        Self::Entry(id)
    }
}

impl From<&str> for EntrySelector {
    fn from(item: &str) -> Self {
        Self::Item(ItemId::new(item))
    }
}

impl EntrySelector {
    /// Resolve to an entry id.
    ///
    /// When selecting by item, entries whose equipped state matches
    /// `prefer_equipped` win; any entry of the item is the fallback.
    pub fn resolve(&self, inventory: &Inventory, prefer_equipped: bool) -> EngineResult<EntryId> {
        match self {
            Self::Entry(id) => Ok(*id),
            Self::Item(item) => {
                let matching = || inventory.entries().iter().filter(|e| &e.item.id == item);
                matching()
                    .find(|e| e.is_equipped() == prefer_equipped)
                    .or_else(|| matching().next())
                    .map(|e: &InventoryEntry| e.id)
                    .ok_or_else(|| {
                        EngineError::InvalidRequest(format!("no inventory entry holds {item}"))
                    })
            }
        }
    }
}

fn one() -> u32 {
    1
}

/// What an actor wants to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Roll a dice expression such as `2d6+1`.
    Roll {
        /// Dice expression.
        dice: String,
        /// Situational modifier.
        #[serde(default)]
        situational: i64,
        /// Difficulty class to check the total against.
        #[serde(default)]
        dc: Option<i64>,
        /// Narrative tag.
        #[serde(default)]
        context: Option<String>,
        /// Offensive rolls are refused while incapacitated.
        #[serde(default)]
        offensive: bool,
    },
    /// Roll a d20 against a stat and difficulty class.
    StatCheck {
        /// Stat to test.
        stat: Stat,
        /// Difficulty class.
        dc: i64,
        /// Situational modifiers.
        #[serde(default)]
        modifiers: Vec<i64>,
        /// Narrative tag.
        #[serde(default)]
        context: Option<String>,
        /// Offensive checks are refused while incapacitated.
        #[serde(default)]
        offensive: bool,
    },
    /// Grant a fixed amount of experience.
    GainExperience {
        /// Experience points.
        amount: i64,
    },
    /// Grant experience rolled from the ruleset's reward table.
    AwardExperience {
        /// Action key, e.g. `combat`.
        action: String,
        /// Difficulty key, e.g. `hard`.
        difficulty: String,
        /// Whether the action succeeded.
        success: bool,
    },
    /// Lose health.
    Damage {
        /// Hit points.
        amount: i32,
    },
    /// Regain health.
    Heal {
        /// Hit points.
        amount: i32,
    },
    /// Spend an unspent attribute point.
    SpendPoint {
        /// Attribute to raise.
        stat: Stat,
    },
    /// Add units of an item.
    AddItem {
        /// Catalog key.
        item: ItemId,
        /// Published version; latest when absent.
        #[serde(default)]
        version: Option<u32>,
        /// Units to add.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Equip an entry.
    Equip {
        /// Entry to equip.
        entry: EntrySelector,
        /// Send the current occupant of the slot back to the bag.
        #[serde(default)]
        swap: bool,
    },
    /// Return an equipped entry to the bag.
    Unequip {
        /// Entry to unequip.
        entry: EntrySelector,
    },
    /// Drop units of an unequipped entry.
    RemoveItem {
        /// Entry to remove from.
        entry: EntrySelector,
        /// Units to remove.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Use up units of a consumable.
    Consume {
        /// Entry to consume.
        entry: EntrySelector,
        /// Units to consume.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Wear an entry down.
    Degrade {
        /// Entry to wear.
        entry: EntrySelector,
        /// Durability lost.
        #[serde(default = "one")]
        amount: u32,
    },
    /// Restore an entry to full durability.
    Repair {
        /// Entry to repair.
        entry: EntrySelector,
    },
    /// Replace an entry's per-instance overrides.
    Customize {
        /// Entry to customize.
        entry: EntrySelector,
        /// New overrides.
        overrides: Overrides,
    },
    /// Give units of an entry to the request's target.
    Transfer {
        /// Entry to give.
        entry: EntrySelector,
        /// Units to give.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Shift standing with a faction.
    AdjustReputation {
        /// Faction key.
        faction: FactionId,
        /// Signed change.
        delta: i64,
    },
    /// Begin a quest attempt.
    StartQuest {
        /// Quest key.
        quest: QuestId,
    },
    /// Offer evidence for an objective.
    RecordObjective {
        /// Quest key.
        quest: QuestId,
        /// Objective key.
        objective: ObjectiveId,
        /// What happened.
        evidence: Evidence,
    },
    /// Complete a quest and receive its reward.
    CompleteQuest {
        /// Quest key.
        quest: QuestId,
    },
    /// End a quest attempt as failed.
    FailQuest {
        /// Quest key.
        quest: QuestId,
        /// Why it failed.
        reason: String,
    },
    /// Drop a quest attempt.
    AbandonQuest {
        /// Quest key.
        quest: QuestId,
    },
}

impl Intent {
    /// Snake-case name of the intent, as it appears in JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Roll { .. } => "roll",
            Self::StatCheck { .. } => "stat_check",
            Self::GainExperience { .. } => "gain_experience",
            Self::AwardExperience { .. } => "award_experience",
            Self::Damage { .. } => "damage",
            Self::Heal { .. } => "heal",
            Self::SpendPoint { .. } => "spend_point",
            Self::AddItem { .. } => "add_item",
            Self::Equip { .. } => "equip",
            Self::Unequip { .. } => "unequip",
            Self::RemoveItem { .. } => "remove_item",
            Self::Consume { .. } => "consume",
            Self::Degrade { .. } => "degrade",
            Self::Repair { .. } => "repair",
            Self::Customize { .. } => "customize",
            Self::Transfer { .. } => "transfer",
            Self::AdjustReputation { .. } => "adjust_reputation",
            Self::StartQuest { .. } => "start_quest",
            Self::RecordObjective { .. } => "record_objective",
            Self::CompleteQuest { .. } => "complete_quest",
            Self::FailQuest { .. } => "fail_quest",
            Self::AbandonQuest { .. } => "abandon_quest",
        }
    }

    /// Whether the intent is refused while the actor is incapacitated.
    pub fn is_offensive(&self) -> bool {
        match self {
            Self::Roll { offensive, .. } | Self::StatCheck { offensive, .. } => *offensive,
            _ => false,
        }
    }

    /// Whether the intent only reads state (it may still roll dice).
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Roll { .. } | Self::StatCheck { .. })
    }
}
