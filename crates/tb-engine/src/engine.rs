//! The engine service: turns action requests into committed outcomes.
//!
//! A dispatch enters the actor's exclusive section (both sections, in id
//! order, for transfers), loads the aggregate from the store, applies the
//! intent to a copy, records any dice roll in the audit log, and saves the
//! copy with the version it loaded. Only then is the outcome event
//! published. A failure at any step leaves the stored state untouched.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tb_core::{Catalog, CharacterId, EntryId, ItemRef, QuestId, StatMap, UserId};
use tb_mechanics::requirements::{Standing, unmet};
use tb_mechanics::{
    Character, CharacterState, Context, DiceRoll, DiceSource, EvaluatorRegistry, Evidence,
    MechError, QuestProgress, ReputationChange, RewardReceipt, RngSource, RollSpec, RuleSet,
    StatCheck, check, resolve, transfer, unlocked_by,
};

use crate::action::{ActionRequest, Intent};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventSink, ItemEvent, OutcomeEvent, QuestEvent};
use crate::locks::LockTable;
use crate::store::{PendingSave, Store};

/// The character progression and quest resolution engine.
///
/// All characters draw from one dice source. With a seed, a given sequence of
/// dispatches always sees the same faces, but concurrent dispatches take
/// faces in whatever order they reach the source. The audit log records what
/// each character actually rolled.
pub struct Engine {
    catalog: Arc<Catalog>,
    rules: Arc<RuleSet>,
    evaluators: Arc<EvaluatorRegistry>,
    store: Arc<dyn Store>,
    sinks: Vec<Arc<dyn EventSink>>,
    locks: LockTable,
    dice: Mutex<Box<dyn DiceSource>>,
    config: EngineConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.rules.name)
            .field("sinks", &self.sinks.len())
            .field("sections", &self.locks.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine over a catalog, ruleset and store.
    ///
    /// Dice come from a seeded RNG when the config has a seed, otherwise
    /// from OS entropy. Objectives use the standard evaluators.
    pub fn new(
        catalog: Arc<Catalog>,
        rules: Arc<RuleSet>,
        store: Arc<dyn Store>,
        config: EngineConfig,
    ) -> Self {
        let source = match config.seed {
            Some(seed) => RngSource::seeded(seed),
            None => RngSource::from_entropy(),
        };
        Self {
            catalog,
            rules,
            evaluators: Arc::new(EvaluatorRegistry::standard()),
            store,
            sinks: Vec::new(),
            locks: LockTable::new(),
            dice: Mutex::new(Box::new(source)),
            config,
        }
    }

    /// Replace the objective evaluators.
    pub fn with_evaluators(mut self, evaluators: EvaluatorRegistry) -> Self {
        self.evaluators = Arc::new(evaluators);
        self
    }

    /// Add an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replace the dice source.
    pub fn with_dice(mut self, source: Box<dyn DiceSource>) -> Self {
        self.dice = Mutex::new(source);
        self
    }

    /// The catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The ruleset.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context(&self) -> Context<'_> {
        Context::new(&self.catalog, &self.rules, &self.evaluators)
    }

    fn load(&self, id: CharacterId) -> EngineResult<CharacterState> {
        self.store
            .load(id)?
            .ok_or(EngineError::CharacterNotFound(id))
    }

    /// Faces are handed out in lock order, across all characters.
    fn roll_with<T>(&self, f: impl FnOnce(&mut dyn DiceSource) -> T) -> T {
        let mut source = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
        f(source.as_mut())
    }

    // -----------------------------------------------------------------------
    // Characters
    // -----------------------------------------------------------------------

    /// Create and store a level 1 character.
    pub fn create_character(
        &self,
        owner: UserId,
        name: &str,
        class: &str,
    ) -> EngineResult<CharacterState> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "character name must not be empty".to_string(),
            ));
        }
        let character = Character::new(owner, name.trim(), class, &self.rules);
        let state = CharacterState::new(character, &self.rules);
        self.insert_character(state)
    }

    /// Store a prepared aggregate as a new character.
    pub fn insert_character(&self, state: CharacterState) -> EngineResult<CharacterState> {
        let id = state.id();
        self.locks.with_section(id, || {
            self.store.save(&[PendingSave {
                expected_version: None,
                state: state.clone(),
            }])
        })?;
        tracing::info!(
            character = %id,
            name = %state.character.name,
            class = %state.character.class,
            "character created"
        );
        Ok(state)
    }

    /// Load a character aggregate.
    pub fn character(&self, id: CharacterId) -> EngineResult<CharacterState> {
        self.load(id)
    }

    /// Ids of every stored character.
    pub fn characters(&self) -> EngineResult<Vec<CharacterId>> {
        self.store.ids()
    }

    /// A character's derived stats with current equipment.
    pub fn derived(&self, id: CharacterId) -> EngineResult<StatMap> {
        let state = self.load(id)?;
        Ok(state.derived(&self.context())?)
    }

    /// Quests the character could start right now: not already open, not
    /// finished unless repeatable, and with every prerequisite met.
    pub fn available_quests(&self, id: CharacterId) -> EngineResult<Vec<QuestId>> {
        let state = self.load(id)?;
        let stats = state.derived(&self.context())?;
        let standing = Standing {
            level: state.character.level,
            stats: &stats,
            reputation: &state.reputation,
            quests: &state.quests,
            catalog: &self.catalog,
        };
        Ok(self
            .catalog
            .quests()
            .into_iter()
            .filter(|quest| state.quests.check_startable(quest).is_ok())
            .filter(|quest| unmet(&quest.prerequisites, &standing).is_empty())
            .map(|quest| quest.id.clone())
            .collect())
    }

    /// Delete a character and everything it owns.
    pub fn delete_character(&self, id: CharacterId) -> EngineResult<()> {
        let deleted = self.locks.with_section(id, || self.store.delete(id));
        self.locks.remove(id);
        if !deleted? {
            return Err(EngineError::CharacterNotFound(id));
        }
        tracing::info!(character = %id, "character deleted");
        Ok(())
    }

    /// Rolls in the audit log, optionally for one actor.
    pub fn rolls(&self, actor: Option<CharacterId>) -> EngineResult<Vec<DiceRoll>> {
        self.store.rolls(actor)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Resolve one action request.
    ///
    /// On success the new state is stored and the outcome is published to
    /// every sink. On failure nothing is stored or published.
    pub fn dispatch(&self, request: &ActionRequest) -> EngineResult<OutcomeEvent> {
        let action = request.intent.kind();
        tracing::debug!(actor = %request.actor, action, "dispatching");

        let result = match (&request.intent, request.target) {
            (Intent::Transfer { .. }, Some(target)) => {
                self.locks.with_pair(request.actor, target, || {
                    self.apply_transfer(request, target)
                })
            }
            (Intent::Transfer { .. }, None) => Err(EngineError::InvalidRequest(
                "a transfer needs a target character".to_string(),
            )),
            _ => self
                .locks
                .with_section(request.actor, || self.apply(request)),
        };

        match &result {
            Ok(event) => {
                tracing::info!(
                    actor = %request.actor,
                    action,
                    version = event.version,
                    "action resolved"
                );
                for sink in &self.sinks {
                    sink.publish(event);
                }
            }
            Err(err) => {
                tracing::warn!(
                    actor = %request.actor,
                    action,
                    kind = err.kind(),
                    error = %err,
                    "action rejected"
                );
            }
        }
        result
    }

    /// Like [`dispatch`](Self::dispatch), re-running the whole request when
    /// the store reports a concurrent modification.
    pub fn dispatch_with_retry(&self, request: &ActionRequest) -> EngineResult<OutcomeEvent> {
        let mut attempt = 0;
        loop {
            match self.dispatch(request) {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        actor = %request.actor,
                        action = request.intent.kind(),
                        attempt,
                        "retrying after conflict"
                    );
                }
                other => return other,
            }
        }
    }

    fn apply(&self, request: &ActionRequest) -> EngineResult<OutcomeEvent> {
        let loaded = self.load(request.actor)?;
        let mut state = loaded.clone();
        let now = Utc::now();
        let mut event = OutcomeEvent::new(request.intent.kind(), request.actor, now);
        event.target = request.target;

        if request.intent.is_offensive() {
            state.character.ensure_able()?;
        }
        self.apply_intent(&mut state, &request.intent, now, &mut event)?;

        if let Some(roll) = &event.roll {
            self.record_roll(roll)?;
        }
        if state != loaded {
            state.character.version = loaded.version() + 1;
            self.store.save(&[PendingSave {
                expected_version: Some(loaded.version()),
                state: state.clone(),
            }])?;
        }
        event.version = state.version();
        Ok(event)
    }

    fn apply_transfer(
        &self,
        request: &ActionRequest,
        target: CharacterId,
    ) -> EngineResult<OutcomeEvent> {
        let Intent::Transfer { entry, quantity } = &request.intent else {
            return Err(EngineError::InvalidRequest(format!(
                "{} is not a transfer",
                request.intent.kind()
            )));
        };
        if target == request.actor {
            return Err(EngineError::InvalidRequest(
                "a character cannot transfer to itself".to_string(),
            ));
        }
        let giver_loaded = self.load(request.actor)?;
        let taker_loaded = self.load(target)?;
        let mut giver = giver_loaded.clone();
        let mut taker = taker_loaded.clone();

        let entry = entry.resolve(&giver.inventory, false)?;
        let receipt = transfer(&mut giver, &mut taker, &self.context(), entry, *quantity)?;

        giver.character.version = giver_loaded.version() + 1;
        taker.character.version = taker_loaded.version() + 1;
        self.store.save(&[
            PendingSave {
                expected_version: Some(giver_loaded.version()),
                state: giver.clone(),
            },
            PendingSave {
                expected_version: Some(taker_loaded.version()),
                state: taker,
            },
        ])?;

        let mut event = OutcomeEvent::new(request.intent.kind(), request.actor, Utc::now());
        event.target = Some(target);
        event.items.push(ItemEvent {
            item: receipt.item,
            quantity: -i64::from(receipt.quantity),
            entry: Some(receipt.from_entry),
        });
        event.version = giver.version();
        Ok(event)
    }

    fn record_roll(&self, roll: &DiceRoll) -> EngineResult<()> {
        self.store.append_roll(roll).map_err(|err| match err {
            EngineError::RecordFailed(_) => err,
            other => EngineError::RecordFailed(other.to_string()),
        })
    }

    fn apply_intent(
        &self,
        state: &mut CharacterState,
        intent: &Intent,
        now: DateTime<Utc>,
        event: &mut OutcomeEvent,
    ) -> EngineResult<()> {
        let ctx = self.context();
        match intent {
            Intent::Roll {
                dice,
                situational,
                dc,
                context,
                ..
            } => {
                let spec = RollSpec::parse(dice)?;
                let roll = self
                    .roll_with(|source| resolve(&spec, *situational, context.as_deref(), source))?
                    .by(state.id());
                event.outcome = dc.map(|dc| check(&roll, dc));
                event.roll = Some(roll);
            }
            Intent::StatCheck {
                stat,
                dc,
                modifiers,
                context,
                ..
            } => {
                let stat_check = modifiers
                    .iter()
                    .fold(StatCheck::new(*stat, *dc), |c, m| c.with_modifier(*m));
                let (roll, outcome) = self.roll_with(|source| {
                    state.stat_check(&ctx, &stat_check, context.as_deref(), source)
                })?;
                event.roll = Some(roll);
                event.outcome = Some(outcome);
            }
            Intent::GainExperience { amount } => {
                let report = state.gain_experience(&ctx, *amount)?;
                if report.leveled_up() {
                    event.stats = Some(state.derived(&ctx)?);
                }
                event.level = Some(report);
            }
            Intent::AwardExperience {
                action,
                difficulty,
                success,
            } => {
                let (report, roll) = self.roll_with(|source| {
                    state.award_experience(&ctx, action, difficulty, *success, source)
                })?;
                if report.leveled_up() {
                    event.stats = Some(state.derived(&ctx)?);
                }
                event.level = Some(report);
                event.roll = Some(roll);
            }
            Intent::Damage { amount } => event.health = Some(state.damage(*amount)?),
            Intent::Heal { amount } => event.health = Some(state.heal(*amount)?),
            Intent::SpendPoint { stat } => event.stats = Some(state.spend_point(&ctx, *stat)?),
            Intent::AddItem {
                item,
                version,
                quantity,
            } => {
                let item_ref = match version {
                    Some(version) => ItemRef {
                        id: item.clone(),
                        version: *version,
                    },
                    None => ctx
                        .catalog
                        .latest_item(item)
                        .map_err(MechError::from)?
                        .item_ref(),
                };
                let entries = state.add_item(&ctx, &item_ref, *quantity)?;
                event.items.push(ItemEvent {
                    item: item_ref,
                    quantity: i64::from(*quantity),
                    entry: single(&entries),
                });
            }
            Intent::Equip { entry, swap } => {
                let entry = entry.resolve(&state.inventory, false)?;
                let change = if *swap {
                    state.equip_swap(&ctx, entry)?
                } else {
                    state.equip(&ctx, entry)?
                };
                event.stats = Some(change.stats);
            }
            Intent::Unequip { entry } => {
                let entry = entry.resolve(&state.inventory, true)?;
                event.stats = Some(state.unequip(&ctx, entry)?);
            }
            Intent::RemoveItem { entry, quantity } => {
                let entry = entry.resolve(&state.inventory, false)?;
                let removed = state.remove_item(entry, *quantity)?;
                event.items.push(ItemEvent {
                    item: removed.item,
                    quantity: -i64::from(*quantity),
                    entry: Some(entry),
                });
            }
            Intent::Consume { entry, quantity } => {
                let entry = entry.resolve(&state.inventory, false)?;
                let consumption = state.consume(&ctx, entry, *quantity)?;
                event.items.push(ItemEvent {
                    item: consumption.item,
                    quantity: -i64::from(consumption.quantity),
                    entry: Some(entry),
                });
                event.health = consumption.health;
                event.level = consumption.level;
            }
            Intent::Degrade { entry, amount } => {
                let entry = entry.resolve(&state.inventory, true)?;
                let wear = state.degrade(&ctx, entry, *amount)?;
                if wear.broken {
                    event.stats = Some(state.derived(&ctx)?);
                }
            }
            Intent::Repair { entry } => {
                let entry = entry.resolve(&state.inventory, true)?;
                state.repair(&ctx, entry)?;
                event.stats = Some(state.derived(&ctx)?);
            }
            Intent::Customize { entry, overrides } => {
                let entry = entry.resolve(&state.inventory, true)?;
                event.stats = Some(state.customize(&ctx, entry, overrides.clone())?);
            }
            Intent::Transfer { .. } => {
                return Err(EngineError::InvalidRequest(
                    "a transfer needs a target character".to_string(),
                ));
            }
            Intent::AdjustReputation { faction, delta } => {
                let change = state.adjust_reputation(&ctx, faction, *delta)?;
                self.note_reputation(event, vec![change]);
            }
            Intent::StartQuest { quest } => {
                let progress = state.start_quest(&ctx, quest, now)?;
                event.quest = Some(quest_event(&progress));
            }
            Intent::RecordObjective {
                quest,
                objective,
                evidence,
            } => {
                let evidence = self.audited(state.id(), evidence)?;
                let update = state.record_objective(&ctx, quest, objective, evidence, now)?;
                let attempt = state.quests.latest(quest).map_or(1, |p| p.attempt);
                event.quest = Some(QuestEvent {
                    quest: update.quest,
                    attempt,
                    status: update.status,
                    objective: Some(update.objective),
                    satisfied_group: update.satisfied_group,
                });
            }
            Intent::CompleteQuest { quest } => {
                let completion = state.complete_quest(&ctx, quest, now)?;
                event.quest = Some(quest_event(&completion.progress));
                let RewardReceipt {
                    experience,
                    items,
                    reputation,
                } = completion.reward;
                if experience.as_ref().is_some_and(|r| r.leveled_up()) {
                    event.stats = Some(state.derived(&ctx)?);
                }
                event.level = experience;
                event.items.extend(items.into_iter().map(|receipt| ItemEvent {
                    entry: single(&receipt.entries),
                    item: receipt.item,
                    quantity: i64::from(receipt.quantity),
                }));
                self.note_reputation(event, reputation);
            }
            Intent::FailQuest { quest, reason } => {
                let progress = state.fail_quest(&ctx, quest, reason, now)?;
                event.quest = Some(quest_event(&progress));
            }
            Intent::AbandonQuest { quest } => {
                let progress = state.abandon_quest(&ctx, quest, now)?;
                event.quest = Some(quest_event(&progress));
            }
        }
        Ok(())
    }

    /// Roll evidence is only trusted as recorded in the audit log.
    fn audited(&self, actor: CharacterId, evidence: &Evidence) -> EngineResult<Evidence> {
        let Evidence::Roll { roll, .. } = evidence else {
            return Ok(evidence.clone());
        };
        let rolls = self.store.rolls(Some(actor))?;
        let found = match roll {
            Some(id) => rolls.iter().find(|r| r.id == *id),
            None => rolls.last(),
        };
        found.map(Evidence::from_roll).ok_or_else(|| {
            EngineError::InvalidRequest(match roll {
                Some(id) => format!("roll {id} is not in this character's audit log"),
                None => "no audited roll to use as evidence".to_string(),
            })
        })
    }

    fn note_reputation(&self, event: &mut OutcomeEvent, changes: Vec<ReputationChange>) {
        for change in &changes {
            let Some(crossed) = &change.tier_change else {
                continue;
            };
            for quest in unlocked_by(&self.catalog, crossed) {
                if !event.unlocked.contains(&quest.id) {
                    event.unlocked.push(quest.id.clone());
                }
            }
        }
        event.reputation.extend(changes);
    }
}

fn quest_event(progress: &QuestProgress) -> QuestEvent {
    QuestEvent {
        quest: progress.quest.clone(),
        attempt: progress.attempt,
        status: progress.status,
        objective: None,
        satisfied_group: progress.chosen_group.clone(),
    }
}

fn single(entries: &[EntryId]) -> Option<EntryId> {
    match entries {
        [entry] => Some(*entry),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use tb_core::{
        EquipSlot, Faction, Item, ItemEffect, ItemKind, Objective, ObjectiveId, ObjectiveKind,
        Quest, QuestReward, Requirements, RollId, Stat,
    };
    use tb_mechanics::rules::preset;
    use tb_mechanics::{QuestStatus, ScriptedSource};

    use crate::action::EntrySelector;
    use crate::events::MemorySink;
    use crate::store::{MemoryStore, MockStore};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.publish_item(
            Item::new("sword", "Longsword", ItemKind::Weapon)
                .with_slot(EquipSlot::MainHand)
                .with_bonus(Stat::Strength, 2),
        );
        catalog.publish_item(
            Item::new("potion", "Healing Draught", ItemKind::Consumable)
                .stackable(5)
                .with_effect(ItemEffect::Heal { amount: 30 }),
        );
        catalog.publish_item(Item::new("pelt", "Wolf Pelt", ItemKind::Material).stackable(10));
        catalog
            .add_faction(Faction::standard("ironguard", "Ironguard"))
            .unwrap();
        catalog
            .add_quest(
                Quest::new("wolf_hunt", "Wolf Hunt")
                    .with_objective(Objective::new(
                        "wolves",
                        ObjectiveKind::Kill {
                            target: "wolf".to_string(),
                            count: 3,
                        },
                    ))
                    .with_reward(
                        QuestReward::default()
                            .experience(1500)
                            .item("pelt", 12)
                            .reputation("ironguard", 150),
                    ),
            )
            .unwrap();
        catalog
            .add_quest(
                Quest::new("iron_oath", "The Iron Oath")
                    .with_objective(Objective::new(
                        "oath",
                        ObjectiveKind::DialogueFlag {
                            flag: "sworn".to_string(),
                        },
                    ))
                    .with_prerequisites(Requirements::default().with_tier("ironguard", "Friendly")),
            )
            .unwrap();
        catalog
    }

    fn engine_with(store: Arc<dyn Store>) -> Engine {
        Engine::new(
            Arc::new(catalog()),
            Arc::new(preset::standard()),
            store,
            EngineConfig::default().with_seed(42),
        )
    }

    fn engine() -> Engine {
        engine_with(Arc::new(MemoryStore::new()))
    }

    fn hero(engine: &Engine) -> CharacterId {
        engine
            .create_character(UserId::new(), "Mira", "warrior")
            .unwrap()
            .id()
    }

    fn act(engine: &Engine, actor: CharacterId, intent: Intent) -> EngineResult<OutcomeEvent> {
        engine.dispatch(&ActionRequest::new(actor, intent))
    }

    fn add(item: &str, quantity: u32) -> Intent {
        Intent::AddItem {
            item: item.into(),
            version: None,
            quantity,
        }
    }

    #[test]
    fn created_characters_can_be_loaded_and_deleted() {
        let engine = engine();
        let id = hero(&engine);
        let state = engine.character(id).unwrap();
        assert_eq!(state.character.name, "Mira");
        assert_eq!(state.version(), 0);
        assert_eq!(engine.characters().unwrap(), vec![id]);

        engine.delete_character(id).unwrap();
        assert!(matches!(
            engine.character(id),
            Err(EngineError::CharacterNotFound(_))
        ));
        assert!(matches!(
            engine.delete_character(id),
            Err(EngineError::CharacterNotFound(_))
        ));
        assert!(engine.locks.is_empty());
    }

    #[test]
    fn seeded_engines_replay_serial_dispatch() {
        let rolls = || {
            let engine = engine();
            let a = hero(&engine);
            let b = hero(&engine);
            let faces: Vec<i64> = [a, b, a, b]
                .into_iter()
                .map(|actor| {
                    let intent = Intent::Roll {
                        dice: "d20".to_string(),
                        situational: 0,
                        dc: None,
                        context: None,
                        offensive: false,
                    };
                    act(&engine, actor, intent).unwrap().roll.unwrap().total
                })
                .collect();
            let audited: Vec<i64> = engine
                .rolls(Some(a))
                .unwrap()
                .into_iter()
                .map(|r| r.total)
                .collect();
            assert_eq!(audited, vec![faces[0], faces[2]]);
            faces
        };
        assert_eq!(rolls(), rolls());
    }

    #[test]
    fn blank_names_are_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.create_character(UserId::new(), "  ", "warrior"),
            Err(EngineError::InvalidRequest(_))
        ));
    }

    #[test]
    fn mutations_bump_the_version_and_publish() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine().with_sink(sink.clone());
        let id = hero(&engine);
        let base = engine.derived(id).unwrap()[&Stat::Strength];

        act(&engine, id, add("sword", 1)).unwrap();
        let event = act(
            &engine,
            id,
            Intent::Equip {
                entry: "sword".into(),
                swap: false,
            },
        )
        .unwrap();
        assert_eq!(event.version, 2);
        assert_eq!(event.stats.as_ref().unwrap()[&Stat::Strength], base + 2);

        act(
            &engine,
            id,
            Intent::Unequip {
                entry: "sword".into(),
            },
        )
        .unwrap();
        assert_eq!(engine.derived(id).unwrap()[&Stat::Strength], base);
        assert_eq!(engine.character(id).unwrap().version(), 3);

        let actions: Vec<String> = sink.events().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, ["add_item", "equip", "unequip"]);
    }

    #[test]
    fn rejected_actions_change_nothing_and_publish_nothing() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine().with_sink(sink.clone());
        let id = hero(&engine);

        let err = act(&engine, id, add("dragon_egg", 1)).unwrap_err();
        assert_eq!(err.kind(), "unknown_item");
        assert_eq!(engine.character(id).unwrap().version(), 0);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn rolls_are_audited_without_touching_the_character() {
        let engine = engine().with_dice(Box::new(ScriptedSource::new([20, 7])));
        let id = hero(&engine);

        let event = act(
            &engine,
            id,
            Intent::Roll {
                dice: "1d20+2".to_string(),
                situational: 0,
                dc: Some(25),
                context: Some("lockpick".to_string()),
                offensive: false,
            },
        )
        .unwrap();
        let roll = event.roll.unwrap();
        assert!(roll.is_critical_success);
        assert!(event.outcome.unwrap().is_success());
        assert_eq!(event.version, 0);

        act(
            &engine,
            id,
            Intent::StatCheck {
                stat: Stat::Strength,
                dc: 10,
                modifiers: vec![1],
                context: None,
                offensive: true,
            },
        )
        .unwrap();

        let audit = engine.rolls(Some(id)).unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].context.as_deref(), Some("lockpick"));
        assert_eq!(audit[1].rolls, vec![7]);
    }

    #[test]
    fn experience_variance_is_audited() {
        let engine = engine().with_dice(Box::new(ScriptedSource::new([11])));
        let id = hero(&engine);

        let event = act(
            &engine,
            id,
            Intent::AwardExperience {
                action: "combat".to_string(),
                difficulty: "hard".to_string(),
                success: true,
            },
        )
        .unwrap();
        assert_eq!(event.level.as_ref().unwrap().gained, 400);
        let roll = event.roll.unwrap();
        assert_eq!(roll.actor, Some(id));

        let audit = engine.rolls(Some(id)).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].id, roll.id);
        assert_eq!(audit[0].rolls, vec![11]);
        assert_eq!(engine.character(id).unwrap().character.experience, 400);
    }

    #[test]
    fn roll_evidence_comes_from_the_audit_log() {
        let mut catalog = catalog();
        catalog
            .add_quest(
                Quest::new("bridge_toll", "The Troll Bridge").with_objective(Objective::new(
                    "persuade",
                    ObjectiveKind::RollSuccess { dc: 14 },
                )),
            )
            .unwrap();
        let engine = Engine::new(
            Arc::new(catalog),
            Arc::new(preset::standard()),
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
        )
        .with_dice(Box::new(ScriptedSource::new([3, 18])));
        let id = hero(&engine);
        let quest = QuestId::new("bridge_toll");
        act(&engine, id, Intent::StartQuest { quest: quest.clone() }).unwrap();

        let record = |roll, total| Intent::RecordObjective {
            quest: quest.clone(),
            objective: "persuade".into(),
            evidence: Evidence::Roll {
                roll,
                total,
                critical_success: false,
                critical_failure: false,
            },
        };
        let d20 = || Intent::Roll {
            dice: "d20".to_string(),
            situational: 0,
            dc: None,
            context: Some("haggle".to_string()),
            offensive: false,
        };

        let err = act(&engine, id, record(None, 30)).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");

        let low = act(&engine, id, d20()).unwrap().roll.unwrap();
        let err = act(&engine, id, record(None, 30)).unwrap_err();
        assert_eq!(err.kind(), "objective_not_met");

        let err = act(&engine, id, record(Some(RollId::new()), 30)).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");

        let high = act(&engine, id, d20()).unwrap().roll.unwrap();
        assert_eq!((low.total, high.total), (3, 18));
        let done = act(&engine, id, record(Some(high.id), 0)).unwrap();
        assert_eq!(done.quest.unwrap().status, QuestStatus::ObjectiveComplete);

        let progress = engine.character(id).unwrap();
        let recorded = &progress.quests.latest(&quest).unwrap().objectives[&ObjectiveId::new("persuade")];
        assert_eq!(recorded.evidence, Evidence::from_roll(&high));
    }

    #[test]
    fn incapacitated_characters_cannot_act_offensively() {
        let engine = engine();
        let id = hero(&engine);
        act(&engine, id, Intent::Damage { amount: 500 }).unwrap();

        let attack = Intent::Roll {
            dice: "d20".to_string(),
            situational: 0,
            dc: None,
            context: None,
            offensive: true,
        };
        assert_eq!(act(&engine, id, attack).unwrap_err().kind(), "incapacitated");
        act(&engine, id, Intent::Heal { amount: 10 }).unwrap();
    }

    #[test]
    fn quest_completion_reports_rewards_and_unlocks() {
        let engine = engine();
        let id = hero(&engine);
        let quest = QuestId::new("wolf_hunt");
        assert_eq!(engine.available_quests(id).unwrap(), vec![quest.clone()]);

        assert_eq!(
            act(&engine, id, Intent::StartQuest { quest: "iron_oath".into() })
                .unwrap_err()
                .kind(),
            "prerequisites_not_met"
        );

        act(&engine, id, Intent::StartQuest { quest: quest.clone() }).unwrap();
        let recorded = act(
            &engine,
            id,
            Intent::RecordObjective {
                quest: quest.clone(),
                objective: "wolves".into(),
                evidence: Evidence::Kills {
                    target: "Wolf".to_string(),
                    count: 3,
                },
            },
        )
        .unwrap();
        let progress = recorded.quest.unwrap();
        assert_eq!(progress.status, QuestStatus::ObjectiveComplete);
        assert_eq!(progress.objective, Some(ObjectiveId::new("wolves")));

        let done = act(&engine, id, Intent::CompleteQuest { quest: quest.clone() }).unwrap();
        assert_eq!(done.quest.as_ref().unwrap().status, QuestStatus::Completed);
        assert_eq!(done.level.as_ref().unwrap().level, 2);
        assert_eq!(done.items.len(), 1);
        assert_eq!(done.items[0].quantity, 12);
        assert_eq!(done.reputation[0].tier.as_deref(), Some("Friendly"));
        assert_eq!(done.unlocked, vec![QuestId::new("iron_oath")]);

        assert_eq!(engine.available_quests(id).unwrap(), vec![QuestId::new("iron_oath")]);
        act(&engine, id, Intent::StartQuest { quest: "iron_oath".into() }).unwrap();
    }

    #[test]
    fn transfers_move_items_between_characters() {
        let engine = engine();
        let giver = hero(&engine);
        let taker = engine
            .create_character(UserId::new(), "Tomas", "bard")
            .unwrap()
            .id();
        act(&engine, giver, add("potion", 4)).unwrap();

        let request = ActionRequest::new(
            giver,
            Intent::Transfer {
                entry: EntrySelector::from("potion"),
                quantity: 3,
            },
        );
        assert!(matches!(
            engine.dispatch(&request),
            Err(EngineError::InvalidRequest(_))
        ));

        let event = engine.dispatch(&request.clone().with_target(taker)).unwrap();
        assert_eq!(event.items[0].quantity, -3);
        assert_eq!(engine.character(giver).unwrap().inventory.quantity_of(&"potion".into()), 1);
        assert_eq!(engine.character(taker).unwrap().inventory.quantity_of(&"potion".into()), 3);
        assert_eq!(engine.character(taker).unwrap().version(), 1);

        let too_many = engine.dispatch(&request.with_target(taker)).unwrap_err();
        assert_eq!(too_many.kind(), "insufficient_quantity");
        assert_eq!(engine.character(taker).unwrap().version(), 1);
    }

    #[test]
    fn concurrent_equips_of_one_slot_admit_exactly_one() {
        let engine = Arc::new(engine());
        let id = hero(&engine);
        let entries: Vec<EntryId> = (0..8)
            .map(|_| act(&engine, id, add("sword", 1)).unwrap().items[0].entry.unwrap())
            .collect();

        let handles: Vec<_> = entries
            .into_iter()
            .map(|entry| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    act(
                        &engine,
                        id,
                        Intent::Equip {
                            entry: entry.into(),
                            swap: false,
                        },
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| e.kind() == "slot_occupied")
        );
        let state = engine.character(id).unwrap();
        assert_eq!(state.inventory.equipped().count(), 1);
    }

    #[test]
    fn failed_roll_recording_aborts_before_saving() {
        let rules = preset::standard();
        let state = CharacterState::new(
            Character::new(UserId::new(), "Mira", "rogue", &rules),
            &rules,
        );
        let id = state.id();

        let mut store = MockStore::new();
        store
            .expect_load()
            .returning(move |_| Ok(Some(state.clone())));
        store
            .expect_append_roll()
            .times(1)
            .returning(|_| Err(EngineError::Store("disk full".to_string())));
        store.expect_save().never();

        let engine = engine_with(Arc::new(store));
        let err = act(
            &engine,
            id,
            Intent::StatCheck {
                stat: Stat::Dexterity,
                dc: 12,
                modifiers: Vec::new(),
                context: None,
                offensive: false,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "record_failed");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn conflicts_are_retried() {
        let rules = preset::standard();
        let state = CharacterState::new(
            Character::new(UserId::new(), "Mira", "rogue", &rules),
            &rules,
        );
        let id = state.id();
        let saves = Arc::new(AtomicUsize::new(0));

        let mut store = MockStore::new();
        store
            .expect_load()
            .times(2)
            .returning(move |_| Ok(Some(state.clone())));
        let counter = Arc::clone(&saves);
        store.expect_save().times(2).returning(move |batch| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(EngineError::ConcurrentModification {
                    character: batch[0].state.id(),
                    expected: 0,
                    found: 1,
                })
            } else {
                Ok(())
            }
        });

        let engine = engine_with(Arc::new(store));
        let event = engine
            .dispatch_with_retry(&ActionRequest::new(id, Intent::Damage { amount: 5 }))
            .unwrap();
        assert_eq!(event.version, 1);
        assert_eq!(saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn retries_stop_at_the_budget() {
        let rules = preset::standard();
        let state = CharacterState::new(
            Character::new(UserId::new(), "Mira", "rogue", &rules),
            &rules,
        );
        let id = state.id();

        let mut store = MockStore::new();
        store
            .expect_load()
            .times(3)
            .returning(move |_| Ok(Some(state.clone())));
        store.expect_save().times(3).returning(move |_| {
            Err(EngineError::ConcurrentModification {
                character: id,
                expected: 0,
                found: 9,
            })
        });

        let engine = Engine::new(
            Arc::new(catalog()),
            Arc::new(preset::standard()),
            Arc::new(store),
            EngineConfig::default().with_max_retries(2),
        );
        let err = engine
            .dispatch_with_retry(&ActionRequest::new(id, Intent::Damage { amount: 5 }))
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
