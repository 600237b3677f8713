//! Rules engine for Talebound characters.
//!
//! Provides dice resolution with injectable randomness, the stat model and
//! levelling, the inventory and equipment ledger, the quest state machine
//! with pluggable objective evaluation, and faction reputation. Every
//! operation on a character goes through [`CharacterState`], which keeps
//! the aggregate consistent and rolls back composite operations that fail
//! part-way. Ships with a `standard` ruleset of ten classes.

pub mod dice;
pub mod error;
pub mod inventory;
pub mod quest;
pub mod reputation;
pub mod requirements;
pub mod resolution;
pub mod rules;
pub mod state;
pub mod stats;
pub mod validate;

pub use dice::{
    CriticalRule, DiceRoll, DiceSource, Die, RngSource, RollSpec, ScriptedSource, resolve,
};
pub use error::{MechError, MechResult};
pub use inventory::{Inventory, InventoryEntry, Overrides, Wear};
pub use quest::{
    EvalContext, EvaluatorRegistry, Evidence, GroupState, ObjectiveEvaluator, ObjectiveUpdate,
    QuestLog, QuestProgress, QuestStatus, unlocked_by,
};
pub use reputation::{Direction, ReputationChange, ReputationLedger, TierChange};
pub use resolution::{Outcome, StatCheck, check, stat_modifier};
pub use rules::{
    ClassProgression, ExperienceTable, LevelBonus, LevelCurve, RuleSet, experience_reward,
};
pub use state::{
    CharacterState, Consumption, Context, EquipChange, ItemReceipt, QuestCompletion,
    RewardReceipt, TransferReceipt, transfer,
};
pub use stats::{
    Ability, AbilityKind, Character, Condition, HealthChange, LevelGain, LevelReport, Track,
    apply_experience, derived_stats,
};
pub use validate::{ValidationIssue, validate};
