//! The `session.json` script replayed by `tb run`.

use serde::{Deserialize, Serialize};
use tb_engine::Intent;

/// A scripted session: who takes part and what they do, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Characters created before the first step.
    pub characters: Vec<CharacterSpec>,
    /// Steps, replayed in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A character to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSpec {
    /// Short key that steps refer to.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Class name from the ruleset.
    pub class: String,
}

/// One step of the script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// A narrative note for the journal.
    Note {
        /// Note text.
        note: String,
    },
    /// An action by one character.
    Action {
        /// Key of the acting character.
        actor: String,
        /// Key of the other party, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        /// What the actor does.
        intent: Intent,
    },
}

impl Step {
    /// An action step without a target.
    pub fn act(actor: &str, intent: Intent) -> Self {
        Self::Action {
            actor: actor.to_string(),
            target: None,
            intent,
        }
    }

    /// An action step aimed at another character.
    pub fn act_on(actor: &str, target: &str, intent: Intent) -> Self {
        Self::Action {
            actor: actor.to_string(),
            target: Some(target.to_string()),
            intent,
        }
    }

    /// A note step.
    pub fn note(text: &str) -> Self {
        Self::Note {
            note: text.to_string(),
        }
    }
}
