//! Rolling a spec and the immutable audit record it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{CharacterId, RollId};

use super::source::DiceSource;
use super::{CriticalRule, RollSpec};
use crate::error::MechResult;

/// One resolved roll. Created once, never mutated after recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Audit id.
    pub id: RollId,
    /// Who rolled, if anyone.
    pub actor: Option<CharacterId>,
    /// What was rolled.
    pub spec: RollSpec,
    /// Situational modifiers added on top of the spec's own modifier.
    pub situational: i64,
    /// Raw faces in roll order.
    pub rolls: Vec<u32>,
    /// Sum of faces plus all modifiers.
    pub total: i64,
    /// Critical success under the spec's rule.
    pub is_critical_success: bool,
    /// Critical failure under the spec's rule.
    pub is_critical_failure: bool,
    /// Narrative tag supplied by the caller (e.g. "lockpick").
    pub context: Option<String>,
    /// When the roll happened.
    pub rolled_at: DateTime<Utc>,
}

impl DiceRoll {
    /// Attach the rolling character.
    pub fn by(mut self, actor: CharacterId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Sum of the raw faces.
    pub fn natural(&self) -> i64 {
        self.rolls.iter().map(|&f| i64::from(f)).sum()
    }

    /// Spec modifier plus situational modifiers.
    pub fn modifier(&self) -> i64 {
        self.spec.modifier.saturating_add(self.situational)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let faces: Vec<String> = self.rolls.iter().map(u32::to_string).collect();
        write!(f, "{}: [{}]", self.spec, faces.join(", "))?;
        if self.situational > 0 {
            write!(f, " +{}", self.situational)?;
        } else if self.situational < 0 {
            write!(f, " {}", self.situational)?;
        }
        write!(f, " = {}", self.total)?;
        if self.is_critical_success {
            write!(f, " (critical success)")?;
        } else if self.is_critical_failure {
            write!(f, " (critical failure)")?;
        }
        Ok(())
    }
}

/// Roll `spec`, add `situational` modifiers, and classify criticals.
///
/// The critical flags look only at the faces, never at the modifier.
pub fn resolve(
    spec: &RollSpec,
    situational: i64,
    context: Option<&str>,
    source: &mut dyn DiceSource,
) -> MechResult<DiceRoll> {
    spec.validate()?;
    let faces = spec.die.sides();
    let rolls = (0..spec.count)
        .map(|_| source.next_face(faces))
        .collect::<MechResult<Vec<u32>>>()?;

    let natural: i64 = rolls.iter().map(|&f| i64::from(f)).sum();
    let total = natural
        .saturating_add(spec.modifier)
        .saturating_add(situational);
    let (is_critical_success, is_critical_failure) = criticals(spec, &rolls);

    Ok(DiceRoll {
        id: RollId::new(),
        actor: None,
        spec: *spec,
        situational,
        rolls,
        total,
        is_critical_success,
        is_critical_failure,
        context: context.map(str::to_string),
        rolled_at: Utc::now(),
    })
}

fn criticals(spec: &RollSpec, rolls: &[u32]) -> (bool, bool) {
    let max = spec.die.sides();
    match spec.critical {
        CriticalRule::Never => (false, false),
        CriticalRule::SingleD20 => match rolls {
            [face] if max == 20 => (*face == 20, *face == 1),
            _ => (false, false),
        },
        CriticalRule::EveryDie => (
            !rolls.is_empty() && rolls.iter().all(|&f| f == max),
            !rolls.is_empty() && rolls.iter().all(|&f| f == 1),
        ),
    }
}
