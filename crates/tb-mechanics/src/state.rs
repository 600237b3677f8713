//! The per-character aggregate and every rule operation on it.
//!
//! [`CharacterState`] bundles a character with their inventory, quest log
//! and reputation ledger. Operations either succeed completely or leave
//! the state exactly as it was: single-step operations validate before they
//! mutate, and composite ones ([`CharacterState::complete_quest`],
//! [`CharacterState::consume`], [`transfer`]) run on a copy that is swapped
//! in only on success.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{
    Catalog, CharacterId, EntryId, EquipSlot, FactionId, Item, ItemEffect, ItemRef, ObjectiveId,
    QuestId, QuestReward, Requirements, Stat, StatMap,
};

use crate::dice::{DiceRoll, DiceSource};
use crate::error::{MechError, MechResult};
use crate::inventory::{Inventory, InventoryEntry, Overrides, Wear};
use crate::quest::{
    EvalContext, EvaluatorRegistry, Evidence, ObjectiveUpdate, QuestLog, QuestProgress,
};
use crate::reputation::{ReputationChange, ReputationLedger};
use crate::requirements::{Standing, unmet};
use crate::resolution::Outcome;
use crate::resolution::stat::StatCheck;
use crate::rules::RuleSet;
use crate::rules::experience::experience_reward;
use crate::stats::level::{LevelReport, apply_experience};
use crate::stats::{Character, HealthChange, derived_stats};

/// The shared, read-only inputs every operation needs.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Item, quest and faction definitions.
    pub catalog: &'a Catalog,
    /// Progression rules.
    pub rules: &'a RuleSet,
    /// Objective evaluators.
    pub evaluators: &'a EvaluatorRegistry,
}

impl<'a> Context<'a> {
    /// Bundle the shared inputs.
    pub fn new(catalog: &'a Catalog, rules: &'a RuleSet, evaluators: &'a EvaluatorRegistry) -> Self {
        Self {
            catalog,
            rules,
            evaluators,
        }
    }
}

/// Result of equipping an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipChange {
    /// The entry now in the slot (a split-off unit for stacks).
    pub entry: EntryId,
    /// The slot.
    pub slot: EquipSlot,
    /// The entry sent back to the bag by a swap.
    pub displaced: Option<EntryId>,
    /// Derived stats afterwards.
    pub stats: StatMap,
}

/// Result of consuming units of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    /// The item consumed.
    pub item: ItemRef,
    /// Units used.
    pub quantity: u32,
    /// Health change from heal and damage effects.
    pub health: Option<HealthChange>,
    /// Mana after restore effects.
    pub mana: Option<i32>,
    /// Level report from experience effects.
    pub level: Option<LevelReport>,
}

/// Items granted by a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReceipt {
    /// The exact version granted.
    pub item: ItemRef,
    /// Units granted.
    pub quantity: u32,
    /// Entries that received them.
    pub entries: Vec<EntryId>,
}

/// Everything a completed quest paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardReceipt {
    /// Experience and level-ups.
    pub experience: Option<LevelReport>,
    /// Items.
    pub items: Vec<ItemReceipt>,
    /// Reputation changes.
    pub reputation: Vec<ReputationChange>,
}

/// A completed quest and its reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCompletion {
    /// The final record.
    pub progress: QuestProgress,
    /// What was paid out.
    pub reward: RewardReceipt,
}

/// Result of moving items between characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// The item moved.
    pub item: ItemRef,
    /// Units moved.
    pub quantity: u32,
    /// The entry the units came from.
    pub from_entry: EntryId,
    /// The entry that holds them now.
    pub to_entry: EntryId,
}

/// One character and everything they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// The character sheet.
    pub character: Character,
    /// Items.
    pub inventory: Inventory,
    /// Quest attempts.
    pub quests: QuestLog,
    /// Faction standing.
    pub reputation: ReputationLedger,
}

impl CharacterState {
    /// A fresh aggregate with an empty bag sized by the ruleset.
    pub fn new(character: Character, rules: &RuleSet) -> Self {
        Self {
            character,
            inventory: Inventory::new(rules.bag_slots),
            quests: QuestLog::new(),
            reputation: ReputationLedger::default(),
        }
    }

    /// The character's id.
    pub fn id(&self) -> CharacterId {
        self.character.id
    }

    /// Persisted version, for optimistic concurrency.
    pub fn version(&self) -> u64 {
        self.character.version
    }

    /// Run `f` against a copy and keep the copy only if it succeeds.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> MechResult<T>) -> MechResult<T> {
        let mut draft = self.clone();
        let value = f(&mut draft)?;
        *self = draft;
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Effective stats with current equipment.
    pub fn derived(&self, ctx: &Context<'_>) -> MechResult<StatMap> {
        let bonuses = self.inventory.equipment_bonuses(ctx.catalog)?;
        Ok(derived_stats(&self.character, ctx.rules, bonuses))
    }

    fn refresh(&mut self, ctx: &Context<'_>) -> MechResult<StatMap> {
        let derived = self.derived(ctx)?;
        self.character.sync_pools(&derived);
        Ok(derived)
    }

    /// Check requirements against current stats, ignoring the bonuses of
    /// `leaving` (an equipped entry about to be displaced).
    fn check_requirements(
        &self,
        ctx: &Context<'_>,
        requirements: &Requirements,
        leaving: Option<EntryId>,
    ) -> MechResult<()> {
        if requirements.is_empty() {
            return Ok(());
        }
        let mut bonuses = Vec::new();
        for entry in self.inventory.equipped().filter(|e| Some(e.id) != leaving) {
            let item = ctx.catalog.item(&entry.item)?;
            bonuses.extend(entry.bonuses(item));
        }
        let stats = derived_stats(&self.character, ctx.rules, bonuses);
        let standing = Standing {
            level: self.character.level,
            stats: &stats,
            reputation: &self.reputation,
            quests: &self.quests,
            catalog: ctx.catalog,
        };
        let failed = unmet(requirements, &standing);
        if failed.is_empty() {
            Ok(())
        } else {
            Err(MechError::RequirementsNotMet(failed))
        }
    }

    /// Grant experience, levelling up as often as it pays for.
    pub fn gain_experience(&mut self, ctx: &Context<'_>, amount: i64) -> MechResult<LevelReport> {
        let report = apply_experience(&mut self.character, amount, ctx.rules)?;
        if report.leveled_up() {
            self.refresh(ctx)?;
        }
        Ok(report)
    }

    /// Roll experience for an action from the ruleset's table and grant it.
    /// Returns the level report and the variance roll, for the audit log.
    pub fn award_experience(
        &mut self,
        ctx: &Context<'_>,
        action: &str,
        difficulty: &str,
        success: bool,
        source: &mut dyn DiceSource,
    ) -> MechResult<(LevelReport, DiceRoll)> {
        let (amount, roll) =
            experience_reward(&ctx.rules.experience, action, difficulty, success, source)?;
        let amount = i64::try_from(amount)
            .map_err(|_| MechError::InvalidAmount(format!("experience {amount} is too large")))?;
        let report = self.gain_experience(ctx, amount)?;
        Ok((report, roll.by(self.id())))
    }

    /// Lose health.
    pub fn damage(&mut self, amount: i32) -> MechResult<HealthChange> {
        self.character.apply_damage(amount)
    }

    /// Regain health.
    pub fn heal(&mut self, amount: i32) -> MechResult<HealthChange> {
        self.character.apply_healing(amount)
    }

    /// Spend an attribute point. Returns the derived stats afterwards.
    pub fn spend_point(&mut self, ctx: &Context<'_>, stat: Stat) -> MechResult<StatMap> {
        self.character.spend_point(stat)?;
        self.refresh(ctx)
    }

    /// Roll a stat check against current derived stats.
    pub fn stat_check(
        &self,
        ctx: &Context<'_>,
        check: &StatCheck,
        context: Option<&str>,
        source: &mut dyn DiceSource,
    ) -> MechResult<(DiceRoll, Outcome)> {
        let derived = self.derived(ctx)?;
        let (roll, outcome) = check.roll(&derived, context, source)?;
        Ok((roll.by(self.id()), outcome))
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    /// Add units of an item version.
    pub fn add_item(
        &mut self,
        ctx: &Context<'_>,
        item: &ItemRef,
        quantity: u32,
    ) -> MechResult<Vec<EntryId>> {
        let item = ctx.catalog.item(item)?;
        self.inventory.add(item, quantity)
    }

    fn item_of<'c>(&self, ctx: &Context<'c>, entry: EntryId) -> MechResult<&'c Item> {
        let item = &self.inventory.entry(entry)?.item;
        Ok(ctx.catalog.item(item)?)
    }

    /// Equip an entry into its (free) slot.
    pub fn equip(&mut self, ctx: &Context<'_>, entry: EntryId) -> MechResult<EquipChange> {
        let item = self.item_of(ctx, entry)?;
        let Some(slot) = item.slot else {
            return Err(MechError::NotEquippable(item.item_ref()));
        };
        self.check_requirements(ctx, &item.requirements, None)?;
        let equipped = self.inventory.equip(entry, item)?;
        let stats = self.refresh(ctx)?;
        Ok(EquipChange {
            entry: equipped,
            slot,
            displaced: None,
            stats,
        })
    }

    /// Equip an entry, sending any occupant of its slot back to the bag.
    pub fn equip_swap(&mut self, ctx: &Context<'_>, entry: EntryId) -> MechResult<EquipChange> {
        let item = self.item_of(ctx, entry)?;
        let Some(slot) = item.slot else {
            return Err(MechError::NotEquippable(item.item_ref()));
        };
        let occupant = self.inventory.occupant(slot).map(|e| e.id);
        self.check_requirements(ctx, &item.requirements, occupant)?;
        let (equipped, displaced) = self.inventory.equip_swap(entry, item)?;
        let stats = self.refresh(ctx)?;
        Ok(EquipChange {
            entry: equipped,
            slot,
            displaced,
            stats,
        })
    }

    /// Return an equipped entry to the bag. Returns the derived stats afterwards.
    pub fn unequip(&mut self, ctx: &Context<'_>, entry: EntryId) -> MechResult<StatMap> {
        self.inventory.unequip(entry)?;
        self.refresh(ctx)
    }

    /// Remove units of an unequipped entry.
    pub fn remove_item(&mut self, entry: EntryId, quantity: u32) -> MechResult<InventoryEntry> {
        self.inventory.take(entry, quantity)
    }

    /// Use up units of a consumable, applying its effects once per unit.
    pub fn consume(
        &mut self,
        ctx: &Context<'_>,
        entry: EntryId,
        quantity: u32,
    ) -> MechResult<Consumption> {
        let item = self.item_of(ctx, entry)?;
        if item.use_effects.is_empty() {
            return Err(MechError::NotConsumable(item.item_ref()));
        }
        self.transact(|draft| {
            draft.inventory.take(entry, quantity)?;
            let mut consumption = Consumption {
                item: item.item_ref(),
                quantity,
                health: None,
                mana: None,
                level: None,
            };
            for effect in &item.use_effects {
                match *effect {
                    ItemEffect::Heal { amount } => {
                        consumption.health = Some(draft.heal(scaled(amount, quantity))?);
                    }
                    ItemEffect::Damage { amount } => {
                        consumption.health = Some(draft.damage(scaled(amount, quantity))?);
                    }
                    ItemEffect::RestoreMana { amount } => {
                        consumption.mana =
                            Some(draft.character.restore_mana(scaled(amount, quantity))?);
                    }
                    ItemEffect::GrantExperience { amount } => {
                        let total = amount.saturating_mul(u64::from(quantity));
                        let total = i64::try_from(total).unwrap_or(i64::MAX);
                        consumption.level = Some(draft.gain_experience(ctx, total)?);
                    }
                }
            }
            Ok(consumption)
        })
    }

    /// Wear an entry down. Bonuses of broken items stop applying at once.
    pub fn degrade(&mut self, ctx: &Context<'_>, entry: EntryId, amount: u32) -> MechResult<Wear> {
        let wear = self.inventory.degrade(entry, amount)?;
        if wear.broken {
            self.refresh(ctx)?;
        }
        Ok(wear)
    }

    /// Restore an entry to full durability.
    pub fn repair(&mut self, ctx: &Context<'_>, entry: EntryId) -> MechResult<Option<u32>> {
        let item = self.item_of(ctx, entry)?;
        let durability = self.inventory.repair(entry, item)?;
        self.refresh(ctx)?;
        Ok(durability)
    }

    /// Replace an entry's per-instance overrides.
    pub fn customize(
        &mut self,
        ctx: &Context<'_>,
        entry: EntryId,
        overrides: Overrides,
    ) -> MechResult<StatMap> {
        self.inventory.customize(entry, overrides)?;
        self.refresh(ctx)
    }

    // -----------------------------------------------------------------------
    // Reputation
    // -----------------------------------------------------------------------

    /// Shift standing with a faction.
    pub fn adjust_reputation(
        &mut self,
        ctx: &Context<'_>,
        faction: &FactionId,
        delta: i64,
    ) -> MechResult<ReputationChange> {
        self.reputation.adjust(ctx.catalog, faction, delta)
    }

    // -----------------------------------------------------------------------
    // Quests
    // -----------------------------------------------------------------------

    /// Begin a quest attempt.
    pub fn start_quest(
        &mut self,
        ctx: &Context<'_>,
        quest: &QuestId,
        now: DateTime<Utc>,
    ) -> MechResult<QuestProgress> {
        let quest = ctx.catalog.quest(quest)?;
        self.quests.check_startable(quest)?;
        match self.check_requirements(ctx, &quest.prerequisites, None) {
            Err(MechError::RequirementsNotMet(unmet)) => {
                return Err(MechError::PrerequisitesNotMet {
                    quest: quest.id.clone(),
                    unmet,
                });
            }
            other => other?,
        }
        Ok(self.quests.start(quest, now)?.clone())
    }

    /// Evaluate evidence for an objective and record it when satisfied.
    pub fn record_objective(
        &mut self,
        ctx: &Context<'_>,
        quest: &QuestId,
        objective: &ObjectiveId,
        evidence: Evidence,
        now: DateTime<Utc>,
    ) -> MechResult<ObjectiveUpdate> {
        let quest = ctx.catalog.quest(quest)?;
        let definition = quest
            .objective(objective)
            .ok_or_else(|| MechError::UnknownObjective {
                quest: quest.id.clone(),
                objective: objective.clone(),
            })?;
        if definition.kind.is_offensive() {
            self.character.ensure_able()?;
        }
        let eval = EvalContext {
            character: &self.character,
            inventory: &self.inventory,
        };
        let satisfied = ctx.evaluators.evaluate(&definition.kind, &evidence, &eval)?;
        self.quests.record(quest, objective, satisfied, evidence, now)
    }

    /// Complete a quest and pay out its reward as one unit.
    ///
    /// If any part of the reward cannot be applied nothing is granted, the
    /// quest stays `ObjectiveComplete` and the cause is returned inside
    /// [`MechError::RewardApplicationFailed`].
    pub fn complete_quest(
        &mut self,
        ctx: &Context<'_>,
        quest: &QuestId,
        now: DateTime<Utc>,
    ) -> MechResult<QuestCompletion> {
        let quest = ctx.catalog.quest(quest)?;
        self.quests.ensure_completable(&quest.id)?;
        self.transact(|draft| {
            let reward = draft.apply_reward(ctx, &quest.reward).map_err(|source| {
                MechError::RewardApplicationFailed {
                    quest: quest.id.clone(),
                    source: Box::new(source),
                }
            })?;
            let progress = draft.quests.mark_completed(&quest.id, now)?.clone();
            Ok(QuestCompletion { progress, reward })
        })
    }

    fn apply_reward(&mut self, ctx: &Context<'_>, reward: &QuestReward) -> MechResult<RewardReceipt> {
        let experience = if reward.experience > 0 {
            let amount = i64::try_from(reward.experience).map_err(|_| {
                MechError::InvalidAmount(format!("experience {} is too large", reward.experience))
            })?;
            Some(self.gain_experience(ctx, amount)?)
        } else {
            None
        };

        let mut items = Vec::with_capacity(reward.items.len());
        for grant in &reward.items {
            let item = ctx.catalog.latest_item(&grant.item)?;
            let entries = self.inventory.add(item, grant.quantity)?;
            items.push(ItemReceipt {
                item: item.item_ref(),
                quantity: grant.quantity,
                entries,
            });
        }

        let mut reputation = Vec::with_capacity(reward.reputation.len());
        for grant in &reward.reputation {
            reputation.push(self.reputation.adjust(
                ctx.catalog,
                &grant.faction,
                i64::from(grant.delta),
            )?);
        }

        Ok(RewardReceipt {
            experience,
            items,
            reputation,
        })
    }

    /// End a quest attempt as failed.
    pub fn fail_quest(
        &mut self,
        ctx: &Context<'_>,
        quest: &QuestId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> MechResult<QuestProgress> {
        let quest = ctx.catalog.quest(quest)?;
        Ok(self.quests.fail(&quest.id, reason, now)?.clone())
    }

    /// Drop a quest attempt.
    pub fn abandon_quest(
        &mut self,
        ctx: &Context<'_>,
        quest: &QuestId,
        now: DateTime<Utc>,
    ) -> MechResult<QuestProgress> {
        let quest = ctx.catalog.quest(quest)?;
        Ok(self.quests.abandon(&quest.id, now)?.clone())
    }
}

fn scaled(amount: u32, quantity: u32) -> i32 {
    i32::try_from(amount.saturating_mul(quantity)).unwrap_or(i32::MAX)
}

/// Move units of an entry from one character to another.
///
/// Both sides change or neither does. Durability and per-instance
/// overrides travel with the units, and moving a whole entry keeps its id.
pub fn transfer(
    from: &mut CharacterState,
    to: &mut CharacterState,
    ctx: &Context<'_>,
    entry: EntryId,
    quantity: u32,
) -> MechResult<TransferReceipt> {
    let mut giver = from.clone();
    let mut taker = to.clone();

    let moved = giver.inventory.take(entry, quantity)?;
    let item = ctx.catalog.item(&moved.item)?;
    let item_ref = moved.item.clone();
    let to_entry = taker.inventory.receive(moved, item)?;

    *from = giver;
    *to = taker;
    Ok(TransferReceipt {
        item: item_ref,
        quantity,
        from_entry: entry,
        to_entry,
    })
}
