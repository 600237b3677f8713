//! Pluggable objective evaluation.
//!
//! The quest state machine only consumes a yes/no answer. Deciding whether
//! some evidence satisfies an objective is the job of an
//! [`ObjectiveEvaluator`], looked up by the objective kind's tag.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tb_core::{ObjectiveKind, RollId};

use crate::dice::DiceRoll;
use crate::error::{MechError, MechResult};
use crate::inventory::Inventory;
use crate::stats::Character;

/// What the caller observed when reporting an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    /// Creatures defeated.
    Kills {
        /// What was defeated.
        target: String,
        /// How many.
        count: u32,
    },
    /// "Look in my bag." The evaluator checks the inventory itself.
    Possession,
    /// A dialogue flag that was set.
    Flag {
        /// Flag name.
        flag: String,
    },
    /// The result of a dice roll.
    ///
    /// The engine only accepts rolls from the audit log: it looks `roll` up
    /// (or takes the actor's latest roll when absent) and replaces the
    /// totals with the recorded ones.
    Roll {
        /// Audited roll this evidence refers to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        roll: Option<RollId>,
        /// Roll total.
        #[serde(default)]
        total: i64,
        /// Natural critical success.
        #[serde(default)]
        critical_success: bool,
        /// Natural critical failure.
        #[serde(default)]
        critical_failure: bool,
    },
    /// Free-form data for custom evaluators.
    Custom {
        /// Evaluator-defined payload.
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl Evidence {
    /// Evidence from a resolved roll.
    pub fn from_roll(roll: &DiceRoll) -> Self {
        Self::Roll {
            roll: Some(roll.id),
            total: roll.total,
            critical_success: roll.is_critical_success,
            critical_failure: roll.is_critical_failure,
        }
    }
}

/// The character-side view an evaluator may inspect.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The character recording the objective.
    pub character: &'a Character,
    /// Their inventory.
    pub inventory: &'a Inventory,
}

/// Decides whether evidence satisfies an objective.
pub trait ObjectiveEvaluator: Send + Sync {
    /// Returns true if the objective is satisfied.
    fn evaluate(
        &self,
        kind: &ObjectiveKind,
        evidence: &Evidence,
        ctx: &EvalContext<'_>,
    ) -> MechResult<bool>;
}

impl<F> ObjectiveEvaluator for F
where
    F: Fn(&ObjectiveKind, &Evidence, &EvalContext<'_>) -> MechResult<bool> + Send + Sync,
{
    fn evaluate(
        &self,
        kind: &ObjectiveKind,
        evidence: &Evidence,
        ctx: &EvalContext<'_>,
    ) -> MechResult<bool> {
        self(kind, evidence, ctx)
    }
}

/// Evaluators keyed by objective tag.
pub struct EvaluatorRegistry {
    evaluators: HashMap<String, Box<dyn ObjectiveEvaluator>>,
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.evaluators.keys().collect();
        tags.sort();
        f.debug_struct("EvaluatorRegistry")
            .field("tags", &tags)
            .finish()
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl EvaluatorRegistry {
    /// A registry with no evaluators at all.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// The built-in evaluators for kill, possess, dialogue-flag and
    /// roll-success objectives.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("kill", kill);
        registry.register("possess", possess);
        registry.register("dialogue_flag", dialogue_flag);
        registry.register("roll_success", roll_success);
        registry
    }

    /// Register (or replace) the evaluator for a tag.
    pub fn register(&mut self, tag: impl Into<String>, evaluator: impl ObjectiveEvaluator + 'static) {
        self.evaluators.insert(tag.into(), Box::new(evaluator));
    }

    /// Returns true if a tag has an evaluator.
    pub fn supports(&self, tag: &str) -> bool {
        self.evaluators.contains_key(tag)
    }

    /// Evaluate evidence against an objective.
    ///
    /// A kind without a registered evaluator is a configuration error.
    pub fn evaluate(
        &self,
        kind: &ObjectiveKind,
        evidence: &Evidence,
        ctx: &EvalContext<'_>,
    ) -> MechResult<bool> {
        let evaluator = self.evaluators.get(kind.tag()).ok_or_else(|| {
            MechError::InvalidConfig(format!("no evaluator for objective kind '{}'", kind.tag()))
        })?;
        evaluator.evaluate(kind, evidence, ctx)
    }
}

fn kill(kind: &ObjectiveKind, evidence: &Evidence, _: &EvalContext<'_>) -> MechResult<bool> {
    match (kind, evidence) {
        (
            ObjectiveKind::Kill { target, count },
            Evidence::Kills {
                target: killed,
                count: killed_count,
            },
        ) => Ok(target.eq_ignore_ascii_case(killed) && killed_count >= count),
        _ => Ok(false),
    }
}

fn possess(kind: &ObjectiveKind, _: &Evidence, ctx: &EvalContext<'_>) -> MechResult<bool> {
    match kind {
        ObjectiveKind::Possess { item, quantity } => {
            Ok(ctx.inventory.quantity_of(item) >= *quantity)
        }
        _ => Ok(false),
    }
}

fn dialogue_flag(kind: &ObjectiveKind, evidence: &Evidence, _: &EvalContext<'_>) -> MechResult<bool> {
    match (kind, evidence) {
        (ObjectiveKind::DialogueFlag { flag }, Evidence::Flag { flag: set }) => Ok(flag == set),
        _ => Ok(false),
    }
}

fn roll_success(kind: &ObjectiveKind, evidence: &Evidence, _: &EvalContext<'_>) -> MechResult<bool> {
    match (kind, evidence) {
        (
            ObjectiveKind::RollSuccess { dc },
            Evidence::Roll {
                total,
                critical_success,
                critical_failure,
                ..
            },
        ) => Ok(*critical_success || (!critical_failure && total >= dc)),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{Item, ItemKind, UserId};

    use crate::rules::preset;

    fn fixture() -> (Character, Inventory) {
        let rules = preset::standard();
        let character = Character::new(UserId::new(), "Mira", "rogue", &rules);
        (character, Inventory::new(10))
    }

    #[test]
    fn kill_needs_matching_target_and_count() {
        let (character, inventory) = fixture();
        let ctx = EvalContext {
            character: &character,
            inventory: &inventory,
        };
        let registry = EvaluatorRegistry::standard();
        let kind = ObjectiveKind::Kill {
            target: "wolf".to_string(),
            count: 3,
        };
        let kills = |target: &str, count| Evidence::Kills {
            target: target.to_string(),
            count,
        };
        assert!(registry.evaluate(&kind, &kills("Wolf", 3), &ctx).unwrap());
        assert!(!registry.evaluate(&kind, &kills("wolf", 2), &ctx).unwrap());
        assert!(!registry.evaluate(&kind, &kills("bear", 5), &ctx).unwrap());
        assert!(!registry.evaluate(&kind, &Evidence::Possession, &ctx).unwrap());
    }

    #[test]
    fn possession_reads_the_inventory() {
        let (character, mut inventory) = fixture();
        let pelt = Item::new("pelt", "Wolf Pelt", ItemKind::Material).stackable(10);
        let kind = ObjectiveKind::Possess {
            item: "pelt".into(),
            quantity: 3,
        };
        let registry = EvaluatorRegistry::standard();
        inventory.add(&pelt, 2).unwrap();
        let ctx = EvalContext {
            character: &character,
            inventory: &inventory,
        };
        assert!(!registry.evaluate(&kind, &Evidence::Possession, &ctx).unwrap());

        inventory.add(&pelt, 1).unwrap();
        let ctx = EvalContext {
            character: &character,
            inventory: &inventory,
        };
        assert!(registry.evaluate(&kind, &Evidence::Possession, &ctx).unwrap());
    }

    #[test]
    fn roll_success_honours_criticals() {
        let (character, inventory) = fixture();
        let ctx = EvalContext {
            character: &character,
            inventory: &inventory,
        };
        let registry = EvaluatorRegistry::standard();
        let kind = ObjectiveKind::RollSuccess { dc: 15 };
        let roll = |total, critical_success, critical_failure| Evidence::Roll {
            roll: None,
            total,
            critical_success,
            critical_failure,
        };
        assert!(registry.evaluate(&kind, &roll(15, false, false), &ctx).unwrap());
        assert!(!registry.evaluate(&kind, &roll(14, false, false), &ctx).unwrap());
        assert!(registry.evaluate(&kind, &roll(3, true, false), &ctx).unwrap());
        assert!(!registry.evaluate(&kind, &roll(30, false, true), &ctx).unwrap());
    }

    #[test]
    fn custom_kinds_need_a_registered_evaluator() {
        let (character, inventory) = fixture();
        let ctx = EvalContext {
            character: &character,
            inventory: &inventory,
        };
        let kind = ObjectiveKind::Custom {
            kind: "escort".to_string(),
            params: serde_json::json!({ "npc": "Tobin" }),
        };
        let evidence = Evidence::Custom {
            data: serde_json::json!({ "npc": "Tobin", "alive": true }),
        };

        let mut registry = EvaluatorRegistry::standard();
        let err = registry.evaluate(&kind, &evidence, &ctx).unwrap_err();
        assert!(matches!(err, MechError::InvalidConfig(_)));

        registry.register(
            "escort",
            |kind: &ObjectiveKind, evidence: &Evidence, _: &EvalContext<'_>| match (kind, evidence) {
                (ObjectiveKind::Custom { params, .. }, Evidence::Custom { data }) => {
                    Ok(params["npc"] == data["npc"] && data["alive"] == true)
                }
                _ => Ok(false),
            },
        );
        assert!(registry.supports("escort"));
        assert!(registry.evaluate(&kind, &evidence, &ctx).unwrap());
    }
}
