//! Quest definitions: objectives, branching groups, rewards, and prerequisites.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{FactionId, GroupId, ItemId, ObjectiveId, QuestId};
use crate::requirement::Requirements;

/// Difficulty tier of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// A small errand.
    Minor,
    /// An ordinary quest.
    #[default]
    Standard,
    /// A significant undertaking.
    Major,
    /// A campaign-defining quest.
    Epic,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minor => write!(f, "minor"),
            Self::Standard => write!(f, "standard"),
            Self::Major => write!(f, "major"),
            Self::Epic => write!(f, "epic"),
        }
    }
}

/// What an objective asks for. Each kind has its own evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Defeat `count` of some target.
    Kill {
        /// Target description or creature key.
        target: String,
        /// How many must fall.
        count: u32,
    },
    /// Hold a quantity of an item.
    Possess {
        /// The item to hold.
        item: ItemId,
        /// How many units.
        quantity: u32,
    },
    /// A flag set by the conversation layer (e.g. "told_the_truth").
    DialogueFlag {
        /// Flag name.
        flag: String,
    },
    /// Succeed on a dice check of at least `dc`.
    RollSuccess {
        /// Difficulty class.
        dc: i64,
    },
    /// Anything else, evaluated by a registered custom evaluator.
    Custom {
        /// Evaluator key.
        kind: String,
        /// Free-form parameters for the evaluator.
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl ObjectiveKind {
    /// The evaluator key for this objective.
    pub fn tag(&self) -> &str {
        match self {
            Self::Kill { .. } => "kill",
            Self::Possess { .. } => "possess",
            Self::DialogueFlag { .. } => "dialogue_flag",
            Self::RollSuccess { .. } => "roll_success",
            Self::Custom { kind, .. } => kind,
        }
    }

    /// Offensive objectives cannot be advanced by an incapacitated character.
    pub fn is_offensive(&self) -> bool {
        matches!(self, Self::Kill { .. } | Self::RollSuccess { .. })
    }
}

/// A single objective of a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Key within the quest.
    pub id: ObjectiveId,
    /// Text shown to the player.
    #[serde(default)]
    pub description: String,
    /// What the objective asks for.
    pub kind: ObjectiveKind,
    /// Optional objectives never block the implicit group.
    #[serde(default)]
    pub optional: bool,
}

impl Objective {
    /// Create a required objective.
    pub fn new(id: impl Into<ObjectiveId>, kind: ObjectiveKind) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            kind,
            optional: false,
        }
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the objective optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// How many members of a group must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// Every member (a path through the quest).
    #[default]
    All,
    /// Any one member (a choice between approaches).
    Any,
}

/// A branch of a quest. Satisfying any one group completes the objectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveGroup {
    /// Key within the quest.
    pub id: GroupId,
    /// Narrative label of the branch.
    #[serde(default)]
    pub label: String,
    /// Satisfaction rule.
    #[serde(default)]
    pub mode: GroupMode,
    /// Member objectives, in order.
    pub objectives: Vec<ObjectiveId>,
}

impl ObjectiveGroup {
    /// Create a group.
    pub fn new(id: impl Into<GroupId>, mode: GroupMode, objectives: &[&str]) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            mode,
            objectives: objectives.iter().map(|o| ObjectiveId::new(*o)).collect(),
        }
    }

    /// Set the label.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns true if the objective is a member.
    pub fn contains(&self, objective: &ObjectiveId) -> bool {
        self.objectives.contains(objective)
    }
}

/// Items granted on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    /// Item key; the latest published version is granted.
    pub item: ItemId,
    /// Number of units.
    pub quantity: u32,
}

/// A reputation change applied on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationGrant {
    /// Faction key.
    pub faction: FactionId,
    /// Signed change.
    pub delta: i32,
}

/// The full reward bundle of a quest. Applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestReward {
    /// Experience granted.
    #[serde(default)]
    pub experience: u64,
    /// Items granted.
    #[serde(default)]
    pub items: Vec<ItemGrant>,
    /// Reputation changes.
    #[serde(default)]
    pub reputation: Vec<ReputationGrant>,
}

impl QuestReward {
    /// Set the experience reward.
    pub fn experience(mut self, amount: u64) -> Self {
        self.experience = amount;
        self
    }

    /// Add an item grant.
    pub fn item(mut self, item: impl Into<ItemId>, quantity: u32) -> Self {
        self.items.push(ItemGrant {
            item: item.into(),
            quantity,
        });
        self
    }

    /// Add a reputation change.
    pub fn reputation(mut self, faction: impl Into<FactionId>, delta: i32) -> Self {
        self.reputation.push(ReputationGrant {
            faction: faction.into(),
            delta,
        });
        self
    }
}

/// Key of the group synthesized for quests that declare none.
pub const IMPLICIT_GROUP: &str = "main";

/// A quest definition from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Catalog key.
    pub id: QuestId,
    /// Display title.
    pub title: String,
    /// Quest text.
    #[serde(default)]
    pub description: String,
    /// Difficulty tier.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// All objectives of the quest.
    pub objectives: Vec<Objective>,
    /// Branches. Empty means one implicit group of all required objectives.
    #[serde(default)]
    pub groups: Vec<ObjectiveGroup>,
    /// Whether objectives within a group must be satisfied in order.
    #[serde(default)]
    pub ordered: bool,
    /// Reward bundle.
    #[serde(default)]
    pub reward: QuestReward,
    /// What a character needs to start the quest.
    #[serde(default)]
    pub prerequisites: Requirements,
    /// Whether the quest may be attempted again after it ends.
    #[serde(default)]
    pub repeatable: bool,
}

impl Quest {
    /// Create an empty quest.
    pub fn new(id: impl Into<QuestId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::Standard,
            objectives: Vec::new(),
            groups: Vec::new(),
            ordered: false,
            reward: QuestReward::default(),
            prerequisites: Requirements::default(),
            repeatable: false,
        }
    }

    /// Add an objective.
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    /// Add a branch.
    pub fn with_group(mut self, group: ObjectiveGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Set the reward bundle.
    pub fn with_reward(mut self, reward: QuestReward) -> Self {
        self.reward = reward;
        self
    }

    /// Set prerequisites.
    pub fn with_prerequisites(mut self, prerequisites: Requirements) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    /// Set the difficulty tier.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Require objectives in declaration order.
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Allow repeat attempts.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Look up an objective by key.
    pub fn objective(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|o| &o.id == id)
    }

    /// The groups that decide completion.
    ///
    /// Quests without declared groups get a single `All` group named
    /// [`IMPLICIT_GROUP`] over their non-optional objectives.
    pub fn effective_groups(&self) -> Cow<'_, [ObjectiveGroup]> {
        if !self.groups.is_empty() {
            return Cow::Borrowed(&self.groups);
        }
        Cow::Owned(vec![ObjectiveGroup {
            id: GroupId::new(IMPLICIT_GROUP),
            label: String::new(),
            mode: GroupMode::All,
            objectives: self
                .objectives
                .iter()
                .filter(|o| !o.optional)
                .map(|o| o.id.clone())
                .collect(),
        }])
    }
}
