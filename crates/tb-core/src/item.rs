use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ItemId;
use crate::requirement::Requirements;
use crate::stat::{Stat, StatMap};

/// Broad category of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Something to hit with.
    Weapon,
    /// Something to wear for protection.
    Armor,
    /// A potion, food, scroll, or anything used up on use.
    Consumable,
    /// A quest token with no mechanical use.
    Quest,
    /// A crafting material.
    Material,
    /// A tool such as a lockpick set.
    Tool,
    /// A bag or chest.
    Container,
    /// Anything else.
    Misc,
}

impl ItemKind {
    /// Returns true if entries of this kind can be consumed.
    pub fn is_consumable(self) -> bool {
        matches!(self, Self::Consumable)
    }
}

/// Rarity tier of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Found everywhere.
    #[default]
    Common,
    /// Slightly special.
    Uncommon,
    /// Hard to find.
    Rare,
    /// Very hard to find.
    Epic,
    /// One of a handful.
    Legendary,
    /// Unique.
    Artifact,
}

/// An equipment slot on a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Helmets, hats, circlets.
    Head,
    /// Amulets.
    Neck,
    /// Body armor.
    Chest,
    /// Cloaks.
    Back,
    /// Gloves and gauntlets.
    Hands,
    /// Belts.
    Waist,
    /// Greaves and trousers.
    Legs,
    /// Boots.
    Feet,
    /// Primary weapon hand.
    MainHand,
    /// Shield or secondary weapon.
    OffHand,
    /// First ring.
    #[serde(rename = "finger_1")]
    Finger1,
    /// Second ring.
    #[serde(rename = "finger_2")]
    Finger2,
    /// First trinket.
    #[serde(rename = "trinket_1")]
    Trinket1,
    /// Second trinket.
    #[serde(rename = "trinket_2")]
    Trinket2,
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Head => "head",
            Self::Neck => "neck",
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Hands => "hands",
            Self::Waist => "waist",
            Self::Legs => "legs",
            Self::Feet => "feet",
            Self::MainHand => "main_hand",
            Self::OffHand => "off_hand",
            Self::Finger1 => "finger_1",
            Self::Finger2 => "finger_2",
            Self::Trinket1 => "trinket_1",
            Self::Trinket2 => "trinket_2",
        };
        write!(f, "{name}")
    }
}

/// What happens when one unit of a consumable is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Restore health.
    Heal {
        /// Health restored.
        amount: u32,
    },
    /// Restore mana.
    RestoreMana {
        /// Mana restored.
        amount: u32,
    },
    /// Hurt the user (poisons, cursed draughts).
    Damage {
        /// Health lost.
        amount: u32,
    },
    /// Grant experience (tomes, training manuals).
    GrantExperience {
        /// Experience granted.
        amount: u64,
    },
}

/// A reference to one published version of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Catalog key.
    pub id: ItemId,
    /// Published version (1-based).
    pub version: u32,
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.id, self.version)
    }
}

fn first_version() -> u32 {
    1
}

fn single() -> u32 {
    1
}

/// An item definition from the catalog.
///
/// Items are immutable once published. The catalog assigns `version` when
/// the definition is published, so a later edit becomes a new version and
/// existing inventory entries keep pointing at the one they were created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog key.
    pub id: ItemId,
    /// Published version, assigned by the catalog.
    #[serde(default = "first_version")]
    pub version: u32,
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Item category.
    pub kind: ItemKind,
    /// Rarity tier.
    #[serde(default)]
    pub rarity: Rarity,
    /// Trade value in copper.
    #[serde(default)]
    pub value: u32,
    /// Weight of a single unit.
    #[serde(default)]
    pub weight: f32,
    /// Whether several units share one inventory entry.
    #[serde(default)]
    pub stackable: bool,
    /// Largest stack for stackable items.
    #[serde(default = "single")]
    pub max_stack: u32,
    /// Where the item is worn, if it can be equipped.
    #[serde(default)]
    pub slot: Option<EquipSlot>,
    /// Stat bonuses while equipped.
    #[serde(default)]
    pub bonuses: StatMap,
    /// Effects applied per unit consumed.
    #[serde(default)]
    pub use_effects: Vec<ItemEffect>,
    /// What a character needs to equip the item.
    #[serde(default)]
    pub requirements: Requirements,
    /// Durability of a fresh instance, if the item wears out.
    #[serde(default)]
    pub max_durability: Option<u32>,
}

impl Item {
    /// Create a minimal, non-stackable item.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            version: 1,
            name: name.into(),
            description: String::new(),
            kind,
            rarity: Rarity::Common,
            value: 0,
            weight: 0.0,
            stackable: false,
            max_stack: 1,
            slot: None,
            bonuses: StatMap::new(),
            use_effects: Vec::new(),
            requirements: Requirements::default(),
            max_durability: None,
        }
    }

    /// Make the item stackable up to `max_stack` units per entry.
    pub fn stackable(mut self, max_stack: u32) -> Self {
        self.stackable = true;
        self.max_stack = max_stack.max(1);
        self
    }

    /// Make the item equippable in a slot.
    pub fn with_slot(mut self, slot: EquipSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Add a stat bonus granted while equipped.
    pub fn with_bonus(mut self, stat: Stat, value: i32) -> Self {
        *self.bonuses.entry(stat).or_insert(0) += value;
        self
    }

    /// Add a use-effect.
    pub fn with_effect(mut self, effect: ItemEffect) -> Self {
        self.use_effects.push(effect);
        self
    }

    /// Set equip requirements.
    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Give instances a durability budget.
    pub fn with_durability(mut self, max: u32) -> Self {
        self.max_durability = Some(max);
        self
    }

    /// Set the rarity tier.
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Largest quantity a single unequipped entry may hold.
    pub fn stack_limit(&self) -> u32 {
        if self.stackable {
            self.max_stack.max(1)
        } else {
            1
        }
    }

    /// Returns true if the item has an equipment slot.
    pub fn is_equippable(&self) -> bool {
        self.slot.is_some()
    }

    /// A reference to this exact version.
    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            id: self.id.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_limit_of_non_stackable_is_one() {
        let sword = Item::new("sword", "Longsword", ItemKind::Weapon);
        assert_eq!(sword.stack_limit(), 1);
        let arrows = Item::new("arrow", "Arrow", ItemKind::Misc).stackable(20);
        assert_eq!(arrows.stack_limit(), 20);
    }

    #[test]
    fn stackable_never_goes_below_one() {
        let odd = Item::new("dust", "Dust", ItemKind::Material).stackable(0);
        assert_eq!(odd.stack_limit(), 1);
    }

    #[test]
    fn bonuses_accumulate() {
        let ring = Item::new("ring", "Ring of Might", ItemKind::Misc)
            .with_slot(EquipSlot::Finger1)
            .with_bonus(Stat::Strength, 1)
            .with_bonus(Stat::Strength, 2);
        assert_eq!(ring.bonuses[&Stat::Strength], 3);
        assert!(ring.is_equippable());
    }

    #[test]
    fn minimal_item_json_uses_defaults() {
        let item: Item = serde_json::from_str(
            r#"{ "id": "bread", "name": "Bread", "kind": "consumable",
                 "use_effects": [{ "type": "heal", "amount": 5 }] }"#,
        )
        .unwrap();
        assert_eq!(item.version, 1);
        assert_eq!(item.rarity, Rarity::Common);
        assert_eq!(item.stack_limit(), 1);
        assert_eq!(item.use_effects, vec![ItemEffect::Heal { amount: 5 }]);
        assert!(item.requirements.is_empty());
    }

    #[test]
    fn slot_serde_names() {
        assert_eq!(
            serde_json::to_string(&EquipSlot::Finger1).unwrap(),
            "\"finger_1\""
        );
        assert_eq!(
            serde_json::to_string(&EquipSlot::MainHand).unwrap(),
            "\"main_hand\""
        );
        assert_eq!(EquipSlot::Trinket2.to_string(), "trinket_2");
    }

    #[test]
    fn item_ref_display() {
        let item = Item::new("sword", "Longsword", ItemKind::Weapon);
        assert_eq!(item.item_ref().to_string(), "sword@v1");
    }
}
