//! The stat model: characters, derived stats, pools, and abilities.
//!
//! Base attributes live on the [`Character`]. Everything a rule actually
//! reads comes from [`derived_stats`], which folds in level growth, active
//! abilities, and the bonuses of equipped items.

pub mod level;
pub mod track;

pub use level::{LevelGain, LevelReport, apply_experience};
pub use track::Track;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{CharacterId, Stat, StatMap, UserId};

use crate::error::{MechError, MechResult};
use crate::rules::RuleSet;

/// Whether a character can act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Above 0 health.
    #[default]
    Healthy,
    /// At 0 health; offensive actions are refused.
    Incapacitated,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Incapacitated => write!(f, "incapacitated"),
        }
    }
}

/// How an ability is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Always on.
    Passive,
    /// Used deliberately.
    Active,
    /// Rare signature abilities.
    Special,
}

/// A named ability, optionally modifying stats while in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Display name.
    pub name: String,
    /// Usage kind.
    pub kind: AbilityKind,
    /// Stat modifiers while in effect.
    #[serde(default)]
    pub modifiers: StatMap,
    /// Whether a non-passive ability is currently in effect.
    #[serde(default)]
    pub active: bool,
}

impl Ability {
    /// An ability without modifiers.
    pub fn new(name: impl Into<String>, kind: AbilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: StatMap::new(),
            active: false,
        }
    }

    /// Add a stat modifier.
    pub fn with_modifier(mut self, stat: Stat, value: i32) -> Self {
        *self.modifiers.entry(stat).or_insert(0) += value;
        self
    }

    /// Passive abilities always apply; others only while active.
    pub fn applies(&self) -> bool {
        self.kind == AbilityKind::Passive || self.active
    }
}

/// A player or AI character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique id.
    pub id: CharacterId,
    /// Owning user account.
    pub owner: UserId,
    /// Display name.
    pub name: String,
    /// Class key (e.g. "warrior"), lowercase.
    pub class: String,
    /// Current level; never decreases.
    pub level: u32,
    /// Progress within the current level band.
    pub experience: u64,
    /// Every point of experience ever earned.
    pub lifetime_experience: u64,
    /// Attribute points granted at level-up and not yet spent.
    pub unspent_points: u32,
    /// Base values of the six attributes.
    pub attributes: StatMap,
    /// Health pool.
    pub health: Track,
    /// Mana pool.
    pub mana: Track,
    /// Known abilities.
    pub abilities: Vec<Ability>,
    /// Healthy or incapacitated.
    pub condition: Condition,
    /// Bumped on every persisted change.
    pub version: u64,
    /// When the character was created.
    pub created_at: DateTime<Utc>,
}

/// Health before and after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChange {
    /// Health before.
    pub previous: i32,
    /// Health after.
    pub current: i32,
    /// Pool maximum.
    pub max: i32,
    /// Condition after the change.
    pub condition: Condition,
}

impl Character {
    /// Create a level 1 character with the class's starting attributes and abilities.
    ///
    /// Unknown classes start with plain base attributes.
    pub fn new(
        owner: UserId,
        name: impl Into<String>,
        class: impl Into<String>,
        rules: &RuleSet,
    ) -> Self {
        let class = class.into().to_lowercase();
        let progression = rules.class(&class);

        let mut attributes: StatMap = Stat::ATTRIBUTES
            .iter()
            .map(|&stat| (stat, rules.base_attribute))
            .collect();
        let mut abilities = rules.starting_abilities.clone();
        if let Some(progression) = progression {
            for (stat, delta) in &progression.attributes {
                if stat.is_attribute() {
                    *attributes.entry(*stat).or_insert(rules.base_attribute) += delta;
                }
            }
            abilities.extend(progression.abilities.iter().cloned());
        }

        Self {
            id: CharacterId::new(),
            owner,
            name: name.into(),
            class,
            level: 1,
            experience: 0,
            lifetime_experience: 0,
            unspent_points: 0,
            attributes,
            health: Track::full(rules.base_health),
            mana: Track::full(rules.base_mana),
            abilities,
            condition: Condition::Healthy,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Base value of an attribute.
    pub fn attribute(&self, stat: Stat) -> i32 {
        self.attributes.get(&stat).copied().unwrap_or_default()
    }

    /// Returns true at 0 health.
    pub fn is_incapacitated(&self) -> bool {
        self.condition == Condition::Incapacitated
    }

    /// Refuse offensive actions while incapacitated.
    pub fn ensure_able(&self) -> MechResult<()> {
        if self.is_incapacitated() {
            return Err(MechError::Incapacitated);
        }
        Ok(())
    }

    /// Lose health. Reaching 0 incapacitates.
    pub fn apply_damage(&mut self, amount: i32) -> MechResult<HealthChange> {
        if amount < 0 {
            return Err(MechError::InvalidAmount(format!(
                "damage must not be negative (got {amount})"
            )));
        }
        let previous = self.health.current;
        self.health.adjust(-i64::from(amount));
        self.refresh_condition();
        Ok(self.health_change(previous))
    }

    /// Regain health, up to the maximum. Rising above 0 restores `Healthy`.
    pub fn apply_healing(&mut self, amount: i32) -> MechResult<HealthChange> {
        if amount < 0 {
            return Err(MechError::InvalidAmount(format!(
                "healing must not be negative (got {amount})"
            )));
        }
        let previous = self.health.current;
        self.health.adjust(i64::from(amount));
        self.refresh_condition();
        Ok(self.health_change(previous))
    }

    /// Regain mana. Returns the new value.
    pub fn restore_mana(&mut self, amount: i32) -> MechResult<i32> {
        if amount < 0 {
            return Err(MechError::InvalidAmount(format!(
                "mana restored must not be negative (got {amount})"
            )));
        }
        Ok(self.mana.adjust(i64::from(amount)))
    }

    /// Spend mana. Fails without spending if the pool is too low.
    pub fn drain_mana(&mut self, amount: i32) -> MechResult<i32> {
        if amount < 0 {
            return Err(MechError::InvalidAmount(format!(
                "mana spent must not be negative (got {amount})"
            )));
        }
        if amount > self.mana.current {
            return Err(MechError::InsufficientQuantity {
                requested: amount.unsigned_abs(),
                available: self.mana.current.unsigned_abs(),
            });
        }
        Ok(self.mana.adjust(-i64::from(amount)))
    }

    /// Spend one unspent point on a base attribute. Returns its new value.
    pub fn spend_point(&mut self, stat: Stat) -> MechResult<i32> {
        if !stat.is_attribute() {
            return Err(MechError::InvalidAmount(format!(
                "{stat} is not a base attribute"
            )));
        }
        if self.unspent_points == 0 {
            return Err(MechError::InvalidAmount(
                "no unspent attribute points".to_string(),
            ));
        }
        self.unspent_points -= 1;
        let value = self.attributes.entry(stat).or_insert(0);
        *value = value.saturating_add(1);
        Ok(*value)
    }

    /// Resize pools to new derived maxima. Current values are clamped down, never raised.
    pub fn sync_pools(&mut self, derived: &StatMap) {
        if let Some(&max) = derived.get(&Stat::MaxHealth) {
            self.health.resize(max);
        }
        if let Some(&max) = derived.get(&Stat::MaxMana) {
            self.mana.resize(max);
        }
        self.refresh_condition();
    }

    /// Turn a non-passive ability on or off. Returns false if unknown.
    pub fn set_ability_active(&mut self, name: &str, active: bool) -> bool {
        match self
            .abilities
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(ability) => {
                ability.active = active;
                true
            }
            None => false,
        }
    }

    /// Returns true if the character knows the ability.
    pub fn has_ability(&self, name: &str) -> bool {
        self.abilities
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }

    fn refresh_condition(&mut self) {
        self.condition = if self.health.is_empty() {
            Condition::Incapacitated
        } else {
            Condition::Healthy
        };
    }

    fn health_change(&self, previous: i32) -> HealthChange {
        HealthChange {
            previous,
            current: self.health.current,
            max: self.health.max,
            condition: self.condition,
        }
    }
}

/// Effective stats: base attributes and level growth, plus active ability
/// modifiers, plus the given equipment bonuses.
///
/// Callers pass one bonus map per equipped, unbroken entry (item bonuses
/// and per-instance extras).
pub fn derived_stats<'a>(
    character: &Character,
    rules: &RuleSet,
    equipment: impl IntoIterator<Item = &'a StatMap>,
) -> StatMap {
    let mut derived = character.attributes.clone();
    for stat in Stat::ATTRIBUTES {
        derived.entry(stat).or_insert(rules.base_attribute);
    }

    let growth = i32::try_from(character.level.saturating_sub(1)).unwrap_or(i32::MAX);
    derived.insert(
        Stat::MaxHealth,
        rules
            .base_health
            .saturating_add(rules.health_per_level.saturating_mul(growth)),
    );
    derived.insert(
        Stat::MaxMana,
        rules
            .base_mana
            .saturating_add(rules.mana_per_level.saturating_mul(growth)),
    );
    derived.insert(Stat::Defense, 0);
    derived.insert(Stat::Damage, 0);

    for ability in character.abilities.iter().filter(|a| a.applies()) {
        add_bonuses(&mut derived, &ability.modifiers);
    }
    for bonuses in equipment {
        add_bonuses(&mut derived, bonuses);
    }

    for pool in [Stat::MaxHealth, Stat::MaxMana] {
        if let Some(value) = derived.get_mut(&pool) {
            *value = (*value).max(1);
        }
    }
    derived
}

fn add_bonuses(derived: &mut StatMap, bonuses: &StatMap) {
    for (stat, value) in bonuses {
        let entry = derived.entry(*stat).or_insert(0);
        *entry = entry.saturating_add(*value);
    }
}
