//! The per-character quest log and quest lifecycle.
//!
//! ```text
//! NotStarted -> Active -> ObjectiveComplete -> Completed
//!                  |              |
//!                  +--> Failed <--+
//!                  +--> Abandoned <--+
//! ```
//!
//! Each attempt at a quest is one [`QuestProgress`] record. At most one
//! record per quest is non-terminal; repeat attempts append new records.
//! Prerequisites and reward issuance need the whole character and live in
//! [`crate::state`]; this module owns the transitions.

pub mod evaluate;

pub use evaluate::{EvalContext, EvaluatorRegistry, Evidence, ObjectiveEvaluator};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{
    Catalog, GroupId, GroupMode, ObjectiveGroup, ObjectiveId, ProgressId, Quest, QuestId,
};

use crate::error::{MechError, MechResult};
use crate::reputation::{Direction, TierChange};

/// Lifecycle status of a quest attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// No record exists.
    NotStarted,
    /// Accepted, objectives open.
    Active,
    /// A group is satisfied; waiting for the reward to be issued.
    ObjectiveComplete,
    /// Reward issued.
    Completed,
    /// Ended unsuccessfully.
    Failed,
    /// Dropped by the player.
    Abandoned,
}

impl QuestStatus {
    /// Returns true once the attempt has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned)
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Active => write!(f, "active"),
            Self::ObjectiveComplete => write!(f, "objective complete"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// A satisfied objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveRecord {
    /// What satisfied it.
    pub evidence: Evidence,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// One attempt at a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Record id.
    pub id: ProgressId,
    /// The quest.
    pub quest: QuestId,
    /// 1 for the first attempt, then 2, 3, ...
    pub attempt: u32,
    /// Current status.
    pub status: QuestStatus,
    /// Satisfied objectives.
    #[serde(default)]
    pub objectives: BTreeMap<ObjectiveId, ObjectiveRecord>,
    /// The group that satisfied the quest.
    #[serde(default)]
    pub chosen_group: Option<GroupId>,
    /// When the attempt began.
    pub started_at: DateTime<Utc>,
    /// When a group became satisfied.
    #[serde(default)]
    pub objectives_completed_at: Option<DateTime<Utc>>,
    /// When the attempt ended.
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Why the attempt failed.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl QuestProgress {
    /// Returns true if the objective has been recorded.
    pub fn is_recorded(&self, objective: &ObjectiveId) -> bool {
        self.objectives.contains_key(objective)
    }

    fn satisfies(&self, group: &ObjectiveGroup) -> bool {
        match group.mode {
            GroupMode::All => group.objectives.iter().all(|o| self.is_recorded(o)),
            GroupMode::Any => group.objectives.iter().any(|o| self.is_recorded(o)),
        }
    }
}

/// How far a group is from being satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    /// Group key.
    pub group: GroupId,
    /// All or Any.
    pub mode: GroupMode,
    /// Members recorded.
    pub done: usize,
    /// Members in the group.
    pub total: usize,
    /// Whether the group is satisfied.
    pub satisfied: bool,
}

/// Result of recording an objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveUpdate {
    /// The quest.
    pub quest: QuestId,
    /// The objective.
    pub objective: ObjectiveId,
    /// False when the objective was already recorded.
    pub newly_recorded: bool,
    /// Set when this recording satisfied a group.
    pub satisfied_group: Option<GroupId>,
    /// Status after the recording.
    pub status: QuestStatus,
}

/// Every quest attempt of one character, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestLog {
    records: Vec<QuestProgress>,
}

impl QuestLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[QuestProgress] {
        &self.records
    }

    /// All attempts at one quest, oldest first.
    pub fn attempts<'a>(&'a self, quest: &'a QuestId) -> impl Iterator<Item = &'a QuestProgress> {
        self.records.iter().filter(move |r| &r.quest == quest)
    }

    /// The most recent attempt, terminal or not.
    pub fn latest(&self, quest: &QuestId) -> Option<&QuestProgress> {
        self.records.iter().rev().find(|r| &r.quest == quest)
    }

    /// The non-terminal attempt, if any.
    pub fn current(&self, quest: &QuestId) -> Option<&QuestProgress> {
        self.latest(quest).filter(|r| !r.status.is_terminal())
    }

    fn current_mut(&mut self, quest: &QuestId) -> Option<&mut QuestProgress> {
        self.records
            .iter_mut()
            .rev()
            .find(|r| &r.quest == quest)
            .filter(|r| !r.status.is_terminal())
    }

    /// Status of the most recent attempt, or `NotStarted`.
    pub fn status(&self, quest: &QuestId) -> QuestStatus {
        self.latest(quest)
            .map_or(QuestStatus::NotStarted, |r| r.status)
    }

    /// Returns true if any attempt was completed.
    pub fn has_completed(&self, quest: &QuestId) -> bool {
        self.attempts(quest)
            .any(|r| r.status == QuestStatus::Completed)
    }

    /// Non-terminal records.
    pub fn open(&self) -> impl Iterator<Item = &QuestProgress> {
        self.records.iter().filter(|r| !r.status.is_terminal())
    }

    fn invalid(&self, quest: &QuestId, action: &'static str) -> MechError {
        MechError::InvalidTransition {
            quest: quest.clone(),
            status: self.status(quest),
            action,
        }
    }

    /// Check that a new attempt may begin. Returns its attempt number.
    pub fn check_startable(&self, quest: &Quest) -> MechResult<u32> {
        match self.latest(&quest.id) {
            None => Ok(1),
            Some(r) if !r.status.is_terminal() => Err(MechError::AlreadyActive(quest.id.clone())),
            Some(_) if !quest.repeatable => Err(MechError::NotRepeatable(quest.id.clone())),
            Some(r) => Ok(r.attempt + 1),
        }
    }

    /// Begin a new attempt.
    ///
    /// Prerequisites are the caller's job. A quest whose objectives are
    /// already satisfied (an empty `All` group) goes straight to
    /// `ObjectiveComplete`.
    pub fn start(&mut self, quest: &Quest, now: DateTime<Utc>) -> MechResult<&QuestProgress> {
        let attempt = self.check_startable(quest)?;
        let mut progress = QuestProgress {
            id: ProgressId::new(),
            quest: quest.id.clone(),
            attempt,
            status: QuestStatus::Active,
            objectives: BTreeMap::new(),
            chosen_group: None,
            started_at: now,
            objectives_completed_at: None,
            finished_at: None,
            failure_reason: None,
        };
        settle(&mut progress, quest, now);
        self.records.push(progress);
        let index = self.records.len() - 1;
        Ok(&self.records[index])
    }

    /// Record an objective as satisfied.
    ///
    /// `satisfied` is the evaluator's verdict. Recording an objective twice
    /// is a no-op. When a group becomes satisfied the quest moves to
    /// `ObjectiveComplete` and that group is locked in as the chosen branch.
    pub fn record(
        &mut self,
        quest: &Quest,
        objective: &ObjectiveId,
        satisfied: bool,
        evidence: Evidence,
        now: DateTime<Utc>,
    ) -> MechResult<ObjectiveUpdate> {
        if quest.objective(objective).is_none() {
            return Err(MechError::UnknownObjective {
                quest: quest.id.clone(),
                objective: objective.clone(),
            });
        }
        let Some(progress) = self.current(&quest.id) else {
            return Err(self.invalid(&quest.id, "record an objective for"));
        };
        if progress.is_recorded(objective) {
            return Ok(ObjectiveUpdate {
                quest: quest.id.clone(),
                objective: objective.clone(),
                newly_recorded: false,
                satisfied_group: None,
                status: progress.status,
            });
        }
        if progress.status != QuestStatus::Active {
            return Err(self.invalid(&quest.id, "record an objective for"));
        }
        if quest.ordered {
            if let Some(waiting_on) = waiting_on(progress, quest, objective) {
                return Err(MechError::ObjectiveOutOfOrder {
                    quest: quest.id.clone(),
                    objective: objective.clone(),
                    waiting_on,
                });
            }
        }
        if !satisfied {
            return Err(MechError::ObjectiveNotMet {
                quest: quest.id.clone(),
                objective: objective.clone(),
            });
        }

        let progress = self
            .current_mut(&quest.id)
            .ok_or_else(|| MechError::UnknownQuest(quest.id.clone()))?;
        progress.objectives.insert(
            objective.clone(),
            ObjectiveRecord {
                evidence,
                recorded_at: now,
            },
        );
        let satisfied_group = settle(progress, quest, now);
        Ok(ObjectiveUpdate {
            quest: quest.id.clone(),
            objective: objective.clone(),
            newly_recorded: true,
            satisfied_group,
            status: progress.status,
        })
    }

    /// Progress of every group for the most recent attempt.
    pub fn group_status(&self, quest: &Quest) -> Vec<GroupState> {
        let progress = self.latest(&quest.id);
        quest
            .effective_groups()
            .iter()
            .map(|group| {
                let done = group
                    .objectives
                    .iter()
                    .filter(|o| progress.is_some_and(|p| p.is_recorded(o)))
                    .count();
                GroupState {
                    group: group.id.clone(),
                    mode: group.mode,
                    done,
                    total: group.objectives.len(),
                    satisfied: progress.is_some_and(|p| p.satisfies(group)),
                }
            })
            .collect()
    }

    /// Check that the quest may be completed now.
    pub fn ensure_completable(&self, quest: &QuestId) -> MechResult<()> {
        match self.current(quest) {
            Some(r) if r.status == QuestStatus::ObjectiveComplete => Ok(()),
            _ => Err(self.invalid(quest, "complete")),
        }
    }

    /// Mark the quest completed. Reward issuance happens around this call.
    pub fn mark_completed(&mut self, quest: &QuestId, now: DateTime<Utc>) -> MechResult<&QuestProgress> {
        self.ensure_completable(quest)?;
        let progress = self
            .current_mut(quest)
            .ok_or_else(|| MechError::UnknownQuest(quest.clone()))?;
        progress.status = QuestStatus::Completed;
        progress.finished_at = Some(now);
        Ok(&*progress)
    }

    /// End any non-terminal attempt as failed.
    pub fn fail(
        &mut self,
        quest: &QuestId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> MechResult<&QuestProgress> {
        if self.current(quest).is_none() {
            return Err(self.invalid(quest, "fail"));
        }
        let progress = self
            .current_mut(quest)
            .ok_or_else(|| MechError::UnknownQuest(quest.clone()))?;
        progress.status = QuestStatus::Failed;
        progress.failure_reason = Some(reason.into());
        progress.finished_at = Some(now);
        Ok(&*progress)
    }

    /// Drop an active or objective-complete attempt.
    pub fn abandon(&mut self, quest: &QuestId, now: DateTime<Utc>) -> MechResult<&QuestProgress> {
        if self.current(quest).is_none() {
            return Err(self.invalid(quest, "abandon"));
        }
        let progress = self
            .current_mut(quest)
            .ok_or_else(|| MechError::UnknownQuest(quest.clone()))?;
        progress.status = QuestStatus::Abandoned;
        progress.finished_at = Some(now);
        Ok(&*progress)
    }
}

/// Move an active attempt to `ObjectiveComplete` if a group is satisfied.
/// Groups are tried in declaration order; the first satisfied one wins.
fn settle(progress: &mut QuestProgress, quest: &Quest, now: DateTime<Utc>) -> Option<GroupId> {
    if progress.status != QuestStatus::Active {
        return None;
    }
    let chosen = quest
        .effective_groups()
        .iter()
        .find(|g| progress.satisfies(g))
        .map(|g| g.id.clone())?;
    progress.status = QuestStatus::ObjectiveComplete;
    progress.chosen_group = Some(chosen.clone());
    progress.objectives_completed_at = Some(now);
    Some(chosen)
}

/// For ordered quests: the first open objective that must come before
/// `objective`, or `None` if it may be recorded now.
///
/// Order only binds within `All` groups. An objective that is in order in
/// at least one of its groups (or belongs to an `Any` group, or to no
/// group) may be recorded.
fn waiting_on(progress: &QuestProgress, quest: &Quest, objective: &ObjectiveId) -> Option<ObjectiveId> {
    let groups = quest.effective_groups();
    let mut blocker = None;
    for group in groups.iter().filter(|g| g.contains(objective)) {
        if group.mode == GroupMode::Any {
            return None;
        }
        let open = group
            .objectives
            .iter()
            .take_while(|o| *o != objective)
            .find(|o| !progress.is_recorded(o));
        match open {
            None => return None,
            Some(o) => {
                blocker.get_or_insert_with(|| o.clone());
            }
        }
    }
    blocker
}

/// Quests gated on a tier that the change just reached.
///
/// Only upward changes unlock anything: a gate counts when its tier is
/// above the old tier and at or below the new one.
pub fn unlocked_by<'c>(catalog: &'c Catalog, change: &TierChange) -> Vec<&'c Quest> {
    if change.direction != Direction::Up {
        return Vec::new();
    }
    let Ok(faction) = catalog.faction(&change.faction) else {
        return Vec::new();
    };
    let (Some(from), Some(to)) = (faction.tier_rank(&change.from), faction.tier_rank(&change.to))
    else {
        return Vec::new();
    };
    catalog
        .quests()
        .into_iter()
        .filter(|quest| {
            quest.prerequisites.reputation.iter().any(|gate| {
                gate.faction == change.faction
                    && faction
                        .tier_rank(&gate.tier)
                        .is_some_and(|rank| rank > from && rank <= to)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{Faction, Objective, ObjectiveKind, Requirements};

    fn flag(name: &str) -> ObjectiveKind {
        ObjectiveKind::DialogueFlag {
            flag: name.to_string(),
        }
    }

    fn flag_evidence(name: &str) -> Evidence {
        Evidence::Flag {
            flag: name.to_string(),
        }
    }

    fn wolf_hunt() -> Quest {
        Quest::new("wolf_hunt", "Wolf Hunt")
            .with_objective(Objective::new(
                "wolves",
                ObjectiveKind::Kill {
                    target: "wolf".to_string(),
                    count: 5,
                },
            ))
            .with_objective(Objective::new("report", flag("reported")))
            .with_objective(Objective::new("alpha", flag("alpha_slain")).optional())
    }

    fn gate() -> Quest {
        Quest::new("gate", "The Gate")
            .with_objective(Objective::new("bribe", flag("bribed")))
            .with_objective(Objective::new("sneak", flag("sneaked")))
            .with_objective(Objective::new("fight", flag("fought")))
            .with_objective(Objective::new("loot", flag("looted")))
            .with_group(ObjectiveGroup::new("quiet", GroupMode::Any, &["bribe", "sneak"]))
            .with_group(ObjectiveGroup::new("loud", GroupMode::All, &["fight", "loot"]))
    }

    fn record(log: &mut QuestLog, quest: &Quest, objective: &str) -> MechResult<ObjectiveUpdate> {
        log.record(
            quest,
            &objective.into(),
            true,
            flag_evidence(objective),
            Utc::now(),
        )
    }

    #[test]
    fn implicit_group_completes_on_required_objectives() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        assert_eq!(log.status(&quest.id), QuestStatus::Active);

        record(&mut log, &quest, "alpha").unwrap();
        record(&mut log, &quest, "wolves").unwrap();
        assert_eq!(log.status(&quest.id), QuestStatus::Active);
        let update = record(&mut log, &quest, "report").unwrap();
        assert_eq!(update.status, QuestStatus::ObjectiveComplete);
        assert_eq!(update.satisfied_group, Some(GroupId::new(tb_core::IMPLICIT_GROUP)));
    }

    #[test]
    fn recording_twice_is_a_no_op() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        assert!(record(&mut log, &quest, "wolves").unwrap().newly_recorded);
        assert!(!record(&mut log, &quest, "wolves").unwrap().newly_recorded);
        assert_eq!(log.current(&quest.id).unwrap().objectives.len(), 1);
    }

    #[test]
    fn unmet_and_unknown_objectives() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        let err = log
            .record(&quest, &"wolves".into(), false, Evidence::Possession, Utc::now())
            .unwrap_err();
        assert!(matches!(err, MechError::ObjectiveNotMet { .. }));
        let err = record(&mut log, &quest, "dragon").unwrap_err();
        assert!(matches!(err, MechError::UnknownObjective { .. }));
    }

    #[test]
    fn any_group_is_a_choice() {
        let quest = gate();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        record(&mut log, &quest, "fight").unwrap();
        let update = record(&mut log, &quest, "sneak").unwrap();
        assert_eq!(update.satisfied_group, Some(GroupId::new("quiet")));
        let progress = log.current(&quest.id).unwrap();
        assert_eq!(progress.chosen_group, Some(GroupId::new("quiet")));

        // The branch is locked in; the other path is closed.
        let err = record(&mut log, &quest, "loot").unwrap_err();
        assert!(matches!(
            err,
            MechError::InvalidTransition {
                status: QuestStatus::ObjectiveComplete,
                ..
            }
        ));

        let states = log.group_status(&quest);
        assert!(states[0].satisfied);
        assert_eq!((states[1].done, states[1].total), (1, 2));
        assert!(!states[1].satisfied);
    }

    #[test]
    fn ordered_quests_enforce_order_within_all_groups() {
        let quest = gate().ordered();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        let err = record(&mut log, &quest, "loot").unwrap_err();
        assert!(matches!(
            err,
            MechError::ObjectiveOutOfOrder { ref waiting_on, .. } if waiting_on.as_str() == "fight"
        ));
        // Any groups have no order.
        record(&mut log, &quest, "sneak").unwrap();
    }

    #[test]
    fn complete_only_from_objective_complete() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        let err = log.mark_completed(&quest.id, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            MechError::InvalidTransition {
                status: QuestStatus::NotStarted,
                ..
            }
        ));

        log.start(&quest, Utc::now()).unwrap();
        assert!(log.mark_completed(&quest.id, Utc::now()).is_err());
        assert_eq!(log.status(&quest.id), QuestStatus::Active);

        record(&mut log, &quest, "wolves").unwrap();
        record(&mut log, &quest, "report").unwrap();
        let done = log.mark_completed(&quest.id, Utc::now()).unwrap();
        assert_eq!(done.status, QuestStatus::Completed);
        assert!(done.finished_at.is_some());
        assert!(log.has_completed(&quest.id));
    }

    #[test]
    fn starting_rules() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        log.start(&quest, Utc::now()).unwrap();
        assert!(matches!(
            log.start(&quest, Utc::now()),
            Err(MechError::AlreadyActive(_))
        ));
        log.abandon(&quest.id, Utc::now()).unwrap();
        assert!(matches!(
            log.start(&quest, Utc::now()),
            Err(MechError::NotRepeatable(_))
        ));

        let repeatable = wolf_hunt().repeatable();
        let second = log.start(&repeatable, Utc::now()).unwrap();
        assert_eq!(second.attempt, 2);
        assert_eq!(log.attempts(&quest.id).count(), 2);
    }

    #[test]
    fn fail_records_the_reason() {
        let quest = wolf_hunt();
        let mut log = QuestLog::new();
        assert!(log.fail(&quest.id, "too slow", Utc::now()).is_err());
        log.start(&quest, Utc::now()).unwrap();
        let failed = log.fail(&quest.id, "too slow", Utc::now()).unwrap();
        assert_eq!(failed.status, QuestStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("too slow"));
        assert!(log.abandon(&quest.id, Utc::now()).is_err());
    }

    #[test]
    fn quests_without_objectives_are_immediately_complete() {
        let quest = Quest::new("greet", "Say Hello");
        let mut log = QuestLog::new();
        let progress = log.start(&quest, Utc::now()).unwrap();
        assert_eq!(progress.status, QuestStatus::ObjectiveComplete);
    }

    #[test]
    fn tier_changes_unlock_gated_quests() {
        let mut catalog = Catalog::new();
        catalog
            .add_faction(Faction::standard("ironguard", "Ironguard"))
            .unwrap();
        catalog
            .add_quest(
                Quest::new("patrol", "Patrol")
                    .with_prerequisites(Requirements::default().with_tier("ironguard", "Friendly")),
            )
            .unwrap();
        catalog
            .add_quest(
                Quest::new("oath", "The Oath")
                    .with_prerequisites(Requirements::default().with_tier("ironguard", "Allied")),
            )
            .unwrap();

        let up = TierChange {
            faction: "ironguard".into(),
            from: "Neutral".to_string(),
            to: "Friendly".to_string(),
            direction: Direction::Up,
        };
        let unlocked: Vec<_> = unlocked_by(&catalog, &up).iter().map(|q| q.id.clone()).collect();
        assert_eq!(unlocked, vec![QuestId::new("patrol")]);

        let down = TierChange {
            direction: Direction::Down,
            ..up
        };
        assert!(unlocked_by(&catalog, &down).is_empty());
    }
}
