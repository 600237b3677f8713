//! A single inventory entry and its per-instance state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{EntryId, EquipSlot, Item, ItemRef, StatMap};

/// Per-instance customizations that travel with an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Replacement display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement description.
    #[serde(default)]
    pub description: Option<String>,
    /// Bonuses on top of the item's own while equipped.
    #[serde(default)]
    pub bonuses: StatMap,
}

impl Overrides {
    /// Returns true if nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.bonuses.is_empty()
    }
}

/// Units of one item version held by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Entry id; stays the same when the whole entry changes hands.
    pub id: EntryId,
    /// The exact item version.
    pub item: ItemRef,
    /// Units held. Always 1 while equipped.
    pub quantity: u32,
    /// The slot this entry occupies, if equipped.
    pub equipped: Option<EquipSlot>,
    /// Remaining durability for items that wear out.
    pub durability: Option<u32>,
    /// Per-instance customizations.
    #[serde(default)]
    pub overrides: Overrides,
    /// When the entry was created.
    pub acquired_at: DateTime<Utc>,
}

impl InventoryEntry {
    /// A new, unequipped entry at full durability.
    pub fn new(item: &Item, quantity: u32) -> Self {
        Self {
            id: EntryId::new(),
            item: item.item_ref(),
            quantity,
            equipped: None,
            durability: item.max_durability,
            overrides: Overrides::default(),
            acquired_at: Utc::now(),
        }
    }

    /// Returns true while equipped.
    pub fn is_equipped(&self) -> bool {
        self.equipped.is_some()
    }

    /// Returns true once durability reaches 0.
    pub fn is_broken(&self) -> bool {
        self.durability == Some(0)
    }

    /// Returns true if the entry is indistinguishable from a freshly added one.
    ///
    /// Only pristine entries merge into stacks.
    pub fn is_pristine(&self, item: &Item) -> bool {
        self.overrides.is_empty() && self.durability == item.max_durability
    }

    /// Returns true if `other` could share a stack with this entry.
    pub fn stacks_with(&self, other: &Self) -> bool {
        self.item == other.item
            && self.durability == other.durability
            && self.overrides == other.overrides
    }

    /// Name shown to players.
    pub fn display_name<'a>(&'a self, item: &'a Item) -> &'a str {
        self.overrides.name.as_deref().unwrap_or(&item.name)
    }

    /// Bonus maps granted while equipped. Broken entries grant nothing.
    pub fn bonuses<'a>(&'a self, item: &'a Item) -> Vec<&'a StatMap> {
        if self.is_broken() {
            return Vec::new();
        }
        vec![&item.bonuses, &self.overrides.bonuses]
    }

    /// A copy of this entry's instance state with a fresh id.
    pub(crate) fn split(&self, quantity: u32) -> Self {
        Self {
            id: EntryId::new(),
            quantity,
            equipped: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{ItemKind, Stat};

    #[test]
    fn new_entries_are_pristine() {
        let shield = Item::new("shield", "Shield", ItemKind::Armor).with_durability(30);
        let entry = InventoryEntry::new(&shield, 1);
        assert_eq!(entry.durability, Some(30));
        assert!(entry.is_pristine(&shield));
        assert!(!entry.is_broken());
    }

    #[test]
    fn broken_entries_grant_nothing() {
        let sword = Item::new("sword", "Sword", ItemKind::Weapon)
            .with_bonus(Stat::Damage, 3)
            .with_durability(5);
        let mut entry = InventoryEntry::new(&sword, 1);
        assert_eq!(entry.bonuses(&sword).len(), 2);
        entry.durability = Some(0);
        assert!(entry.bonuses(&sword).is_empty());
    }

    #[test]
    fn overrides_change_display_and_stacking() {
        let gem = Item::new("gem", "Gem", ItemKind::Misc).stackable(10);
        let plain = InventoryEntry::new(&gem, 1);
        let mut named = plain.split(1);
        named.overrides.name = Some("Heart of the Mountain".to_string());
        assert_eq!(named.display_name(&gem), "Heart of the Mountain");
        assert!(!plain.stacks_with(&named));
        assert!(!named.is_pristine(&gem));
        assert_ne!(plain.id, named.id);
    }
}
