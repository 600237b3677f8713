//! The inventory and equipment ledger.
//!
//! An [`Inventory`] is a list of entries plus a bag capacity. Only
//! unequipped entries count against the capacity. Every operation checks
//! everything it needs before it mutates, so a failed call leaves the
//! inventory exactly as it was.

pub mod entry;

pub use entry::{InventoryEntry, Overrides};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tb_core::{Catalog, EntryId, EquipSlot, Item, ItemId, StatMap};

use crate::error::{MechError, MechResult};

/// Durability change from [`Inventory::degrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wear {
    /// Durability left, or `None` for items that never wear.
    pub remaining: Option<u32>,
    /// Whether the entry broke.
    pub broken: bool,
    /// Whether a broken entry was taken out of its slot.
    pub unequipped: bool,
}

/// A character's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
    capacity: usize,
}

struct AddPlan {
    merges: Vec<(EntryId, u32)>,
    new_stacks: Vec<u32>,
}

impl Inventory {
    /// An empty inventory holding at most `capacity` unequipped entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Bag capacity in entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Unequipped entries.
    pub fn bag_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_equipped()).count()
    }

    /// Entry slots still free.
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.bag_count())
    }

    /// All entries, in acquisition order.
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    /// Look up an entry.
    pub fn entry(&self, id: EntryId) -> MechResult<&InventoryEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(MechError::EntryNotFound(id))
    }

    fn entry_mut(&mut self, id: EntryId) -> MechResult<&mut InventoryEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(MechError::EntryNotFound(id))
    }

    /// Equipped entries.
    pub fn equipped(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter().filter(|e| e.is_equipped())
    }

    /// The entry occupying a slot.
    pub fn occupant(&self, slot: EquipSlot) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.equipped == Some(slot))
    }

    /// First entry holding some version of an item.
    pub fn find(&self, item: &ItemId) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| &e.item.id == item)
    }

    /// Total units per item id.
    pub fn summary(&self) -> BTreeMap<ItemId, u32> {
        let mut summary = BTreeMap::new();
        for entry in &self.entries {
            *summary.entry(entry.item.id.clone()).or_insert(0) += entry.quantity;
        }
        summary
    }

    /// Units held of one item id.
    pub fn quantity_of(&self, item: &ItemId) -> u32 {
        self.entries
            .iter()
            .filter(|e| &e.item.id == item)
            .map(|e| e.quantity)
            .sum()
    }

    /// Total carried weight.
    pub fn weight(&self, catalog: &Catalog) -> MechResult<f32> {
        let mut total = 0.0;
        for entry in &self.entries {
            let item = catalog.item(&entry.item)?;
            total += item.weight * entry.quantity as f32;
        }
        Ok(total)
    }

    /// Bonus maps of every equipped, unbroken entry.
    pub fn equipment_bonuses<'a>(&'a self, catalog: &'a Catalog) -> MechResult<Vec<&'a StatMap>> {
        let mut bonuses = Vec::new();
        for entry in self.equipped() {
            let item = catalog.item(&entry.item)?;
            bonuses.extend(entry.bonuses(item));
        }
        Ok(bonuses)
    }

    // -----------------------------------------------------------------------
    // Adding and removing
    // -----------------------------------------------------------------------

    fn plan_add(&self, item: &Item, quantity: u32, skip_merge: bool) -> MechResult<AddPlan> {
        if quantity == 0 {
            return Err(MechError::InvalidAmount(
                "quantity must be at least 1".to_string(),
            ));
        }
        let limit = item.stack_limit();
        let item_ref = item.item_ref();
        let mut remaining = quantity;
        let mut merges = Vec::new();

        if !skip_merge && item.stackable {
            for entry in self.entries.iter().filter(|e| {
                !e.is_equipped() && e.item == item_ref && e.is_pristine(item)
            }) {
                let take = limit.saturating_sub(entry.quantity).min(remaining);
                if take > 0 {
                    merges.push((entry.id, take));
                    remaining -= take;
                }
                if remaining == 0 {
                    break;
                }
            }
        }

        let mut new_stacks = Vec::new();
        while remaining > 0 {
            let take = remaining.min(limit);
            new_stacks.push(take);
            remaining -= take;
        }

        if new_stacks.len() > self.free_slots() {
            return Err(MechError::CapacityExceeded {
                needed: new_stacks.len(),
                available: self.free_slots(),
            });
        }
        Ok(AddPlan { merges, new_stacks })
    }

    /// Add units of an item version.
    ///
    /// Units fill existing pristine stacks first; the rest become new
    /// entries of at most one stack each. Returns every entry touched.
    pub fn add(&mut self, item: &Item, quantity: u32) -> MechResult<Vec<EntryId>> {
        let plan = self.plan_add(item, quantity, false)?;
        let mut touched = Vec::with_capacity(plan.merges.len() + plan.new_stacks.len());
        for (id, take) in plan.merges {
            self.entry_mut(id)?.quantity += take;
            touched.push(id);
        }
        for stack in plan.new_stacks {
            let entry = InventoryEntry::new(item, stack);
            touched.push(entry.id);
            self.entries.push(entry);
        }
        Ok(touched)
    }

    /// Returns true if `add(item, quantity)` would succeed.
    pub fn can_add(&self, item: &Item, quantity: u32) -> bool {
        self.plan_add(item, quantity, false).is_ok()
    }

    /// Accept an entry from another inventory.
    ///
    /// Pristine stackable units top up existing stacks first; whatever is
    /// left lands as the incoming entry, keeping its id. Returns the id of
    /// the entry that received the last units.
    pub fn receive(&mut self, mut incoming: InventoryEntry, item: &Item) -> MechResult<EntryId> {
        incoming.equipped = None;
        let pristine = incoming.is_pristine(item);
        let plan = self.plan_add(item, incoming.quantity, !pristine)?;

        let mut last = incoming.id;
        for (id, take) in plan.merges {
            self.entry_mut(id)?.quantity += take;
            incoming.quantity -= take;
            last = id;
        }
        if incoming.quantity > 0 {
            last = incoming.id;
            self.entries.push(incoming);
        }
        Ok(last)
    }

    /// Take units out of an unequipped entry.
    ///
    /// Taking the whole entry returns it unchanged (same id); taking part
    /// returns a split-off entry with the same instance state.
    pub fn take(&mut self, id: EntryId, quantity: u32) -> MechResult<InventoryEntry> {
        if quantity == 0 {
            return Err(MechError::InvalidAmount(
                "quantity must be at least 1".to_string(),
            ));
        }
        let entry = self.entry(id)?;
        if entry.is_equipped() {
            return Err(MechError::ItemEquipped(id));
        }
        if quantity > entry.quantity {
            return Err(MechError::InsufficientQuantity {
                requested: quantity,
                available: entry.quantity,
            });
        }
        if quantity == entry.quantity {
            let index = self
                .entries
                .iter()
                .position(|e| e.id == id)
                .ok_or(MechError::EntryNotFound(id))?;
            return Ok(self.entries.remove(index));
        }
        let entry = self.entry_mut(id)?;
        entry.quantity -= quantity;
        Ok(entry.split(quantity))
    }

    // -----------------------------------------------------------------------
    // Equipment
    // -----------------------------------------------------------------------

    /// Equip an entry into its item's slot.
    ///
    /// A stacked entry has one unit split off into a new equipped entry.
    /// Returns the id of the equipped entry. Requirements are checked by
    /// the caller, which knows the character.
    pub fn equip(&mut self, id: EntryId, item: &Item) -> MechResult<EntryId> {
        let entry = self.entry(id)?;
        if entry.is_equipped() {
            return Ok(id);
        }
        let slot = item
            .slot
            .ok_or_else(|| MechError::NotEquippable(entry.item.clone()))?;
        if entry.is_broken() {
            return Err(MechError::ItemBroken(id));
        }
        if let Some(occupant) = self.occupant(slot) {
            return Err(MechError::SlotOccupied {
                slot,
                occupant: occupant.id,
            });
        }

        if entry.quantity > 1 {
            let mut single = entry.split(1);
            single.equipped = Some(slot);
            let single_id = single.id;
            self.entry_mut(id)?.quantity -= 1;
            self.entries.push(single);
            return Ok(single_id);
        }
        self.entry_mut(id)?.equipped = Some(slot);
        Ok(id)
    }

    /// Equip an entry, moving any occupant of the slot back to the bag.
    ///
    /// Both moves happen or neither does. Returns the equipped entry and
    /// the displaced occupant, if any.
    pub fn equip_swap(
        &mut self,
        id: EntryId,
        item: &Item,
    ) -> MechResult<(EntryId, Option<EntryId>)> {
        let entry = self.entry(id)?;
        if entry.is_equipped() {
            return Ok((id, None));
        }
        let slot = item
            .slot
            .ok_or_else(|| MechError::NotEquippable(entry.item.clone()))?;

        let mut draft = self.clone();
        let displaced = draft.occupant(slot).map(|o| o.id);
        if let Some(occupant) = displaced {
            draft.entry_mut(occupant)?.equipped = None;
        }
        let equipped = draft.equip(id, item)?;
        if draft.bag_count() > draft.capacity {
            return Err(MechError::CapacityExceeded {
                needed: 1,
                available: self.free_slots(),
            });
        }
        *self = draft;
        Ok((equipped, displaced))
    }

    /// Return an equipped entry to the bag.
    pub fn unequip(&mut self, id: EntryId) -> MechResult<()> {
        let entry = self.entry(id)?;
        if !entry.is_equipped() {
            return Ok(());
        }
        if self.free_slots() == 0 {
            return Err(MechError::CapacityExceeded {
                needed: 1,
                available: 0,
            });
        }
        self.entry_mut(id)?.equipped = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Durability and customization
    // -----------------------------------------------------------------------

    /// Wear an entry down.
    ///
    /// At 0 the entry is broken and stops granting bonuses. A broken
    /// equipped entry goes back to the bag when there is room; otherwise it
    /// stays in its slot, inert, until unequipped.
    pub fn degrade(&mut self, id: EntryId, amount: u32) -> MechResult<Wear> {
        let free = self.free_slots();
        let entry = self.entry_mut(id)?;
        let Some(current) = entry.durability else {
            return Ok(Wear {
                remaining: None,
                broken: false,
                unequipped: false,
            });
        };
        let remaining = current.saturating_sub(amount);
        entry.durability = Some(remaining);
        let broken = remaining == 0;
        let unequipped = broken && entry.is_equipped() && free > 0;
        if unequipped {
            entry.equipped = None;
        }
        Ok(Wear {
            remaining: Some(remaining),
            broken,
            unequipped,
        })
    }

    /// Restore full durability. Returns the new durability.
    pub fn repair(&mut self, id: EntryId, item: &Item) -> MechResult<Option<u32>> {
        let entry = self.entry_mut(id)?;
        entry.durability = item.max_durability;
        Ok(entry.durability)
    }

    /// Replace an entry's per-instance overrides.
    pub fn customize(&mut self, id: EntryId, overrides: Overrides) -> MechResult<()> {
        self.entry_mut(id)?.overrides = overrides;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{ItemKind, Stat};

    fn arrows() -> Item {
        Item::new("arrow", "Arrow", ItemKind::Misc).stackable(20)
    }

    fn sword() -> Item {
        Item::new("sword", "Longsword", ItemKind::Weapon)
            .with_slot(EquipSlot::MainHand)
            .with_bonus(Stat::Damage, 3)
    }

    fn axe() -> Item {
        Item::new("axe", "Axe", ItemKind::Weapon)
            .with_slot(EquipSlot::MainHand)
            .with_bonus(Stat::Damage, 4)
    }

    #[test]
    fn add_merges_then_overflows_into_new_stacks() {
        let mut inv = Inventory::new(10);
        inv.add(&arrows(), 15).unwrap();
        let touched = inv.add(&arrows(), 30).unwrap();
        assert_eq!(touched.len(), 3);
        let quantities: Vec<u32> = inv.entries().iter().map(|e| e.quantity).collect();
        assert_eq!(quantities, vec![20, 20, 5]);
        assert_eq!(inv.quantity_of(&"arrow".into()), 45);
    }

    #[test]
    fn add_is_all_or_nothing() {
        let mut inv = Inventory::new(2);
        inv.add(&arrows(), 20).unwrap();
        let before = inv.clone();
        let err = inv.add(&arrows(), 41).unwrap_err();
        assert!(matches!(
            err,
            MechError::CapacityExceeded {
                needed: 3,
                available: 1
            }
        ));
        assert_eq!(inv, before);
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let mut inv = Inventory::new(2);
        assert!(matches!(
            inv.add(&arrows(), 0),
            Err(MechError::InvalidAmount(_))
        ));
    }

    #[test]
    fn equip_then_slot_is_occupied() {
        let mut inv = Inventory::new(5);
        let s = inv.add(&sword(), 1).unwrap()[0];
        let a = inv.add(&axe(), 1).unwrap()[0];
        inv.equip(s, &sword()).unwrap();
        assert_eq!(inv.bag_count(), 1);
        let err = inv.equip(a, &axe()).unwrap_err();
        assert!(matches!(err, MechError::SlotOccupied { occupant, .. } if occupant == s));
    }

    #[test]
    fn equip_swap_exchanges_atomically() {
        let mut inv = Inventory::new(5);
        let s = inv.add(&sword(), 1).unwrap()[0];
        let a = inv.add(&axe(), 1).unwrap()[0];
        inv.equip(s, &sword()).unwrap();
        let (equipped, displaced) = inv.equip_swap(a, &axe()).unwrap();
        assert_eq!(equipped, a);
        assert_eq!(displaced, Some(s));
        assert_eq!(inv.occupant(EquipSlot::MainHand).unwrap().id, a);
        assert!(!inv.entry(s).unwrap().is_equipped());
    }

    #[test]
    fn equip_swap_fails_cleanly_when_the_bag_is_full() {
        let mut inv = Inventory::new(1);
        let s = inv.add(&sword(), 1).unwrap()[0];
        inv.equip(s, &sword()).unwrap();
        let shield = Item::new("shield", "Shields", ItemKind::Armor)
            .with_slot(EquipSlot::MainHand)
            .stackable(5);
        let stack = inv.add(&shield, 2).unwrap()[0];
        let before = inv.clone();
        // Splitting one off leaves the stack in the bag, so the sword has nowhere to go.
        let err = inv.equip_swap(stack, &shield).unwrap_err();
        assert!(matches!(err, MechError::CapacityExceeded { .. }));
        assert_eq!(inv, before);
    }

    #[test]
    fn equipping_a_stack_splits_one_unit() {
        let torch = Item::new("torch", "Torch", ItemKind::Tool)
            .stackable(5)
            .with_slot(EquipSlot::OffHand);
        let mut inv = Inventory::new(5);
        let stack = inv.add(&torch, 3).unwrap()[0];
        let lit = inv.equip(stack, &torch).unwrap();
        assert_ne!(lit, stack);
        assert_eq!(inv.entry(stack).unwrap().quantity, 2);
        assert_eq!(inv.entry(lit).unwrap().quantity, 1);
    }

    #[test]
    fn slotless_and_broken_items_cannot_be_equipped() {
        let mut inv = Inventory::new(5);
        let a = inv.add(&arrows(), 1).unwrap()[0];
        assert!(matches!(
            inv.equip(a, &arrows()),
            Err(MechError::NotEquippable(_))
        ));

        let fragile = sword().with_durability(1);
        let f = inv.add(&fragile, 1).unwrap()[0];
        inv.degrade(f, 5).unwrap();
        assert!(matches!(
            inv.equip(f, &fragile),
            Err(MechError::ItemBroken(_))
        ));
        assert_eq!(inv.repair(f, &fragile).unwrap(), Some(1));
        inv.equip(f, &fragile).unwrap();
    }

    #[test]
    fn take_rules() {
        let mut inv = Inventory::new(5);
        let stack = inv.add(&arrows(), 10).unwrap()[0];
        assert!(matches!(
            inv.take(stack, 11),
            Err(MechError::InsufficientQuantity {
                requested: 11,
                available: 10
            })
        ));
        let part = inv.take(stack, 4).unwrap();
        assert_ne!(part.id, stack);
        assert_eq!(inv.entry(stack).unwrap().quantity, 6);
        let whole = inv.take(stack, 6).unwrap();
        assert_eq!(whole.id, stack);
        assert!(inv.entries().is_empty());

        let s = inv.add(&sword(), 1).unwrap()[0];
        inv.equip(s, &sword()).unwrap();
        assert!(matches!(inv.take(s, 1), Err(MechError::ItemEquipped(_))));
    }

    #[test]
    fn receive_keeps_instance_state() {
        let mut from = Inventory::new(5);
        let mut to = Inventory::new(5);
        let blade = sword().with_durability(10);
        let id = from.add(&blade, 1).unwrap()[0];
        from.degrade(id, 3).unwrap();
        from.customize(
            id,
            Overrides {
                name: Some("Oathkeeper".to_string()),
                ..Overrides::default()
            },
        )
        .unwrap();

        let moved = from.take(id, 1).unwrap();
        let landed = to.receive(moved, &blade).unwrap();
        assert_eq!(landed, id);
        let entry = to.entry(id).unwrap();
        assert_eq!(entry.durability, Some(7));
        assert_eq!(entry.overrides.name.as_deref(), Some("Oathkeeper"));
    }

    #[test]
    fn broken_equipped_entries_leave_their_slot() {
        let mut inv = Inventory::new(5);
        let blade = sword().with_durability(2);
        let id = inv.add(&blade, 1).unwrap()[0];
        inv.equip(id, &blade).unwrap();
        let wear = inv.degrade(id, 2).unwrap();
        assert!(wear.broken && wear.unequipped);
        assert!(inv.occupant(EquipSlot::MainHand).is_none());
    }

    #[test]
    fn unequip_needs_bag_room() {
        let mut inv = Inventory::new(1);
        let s = inv.add(&sword(), 1).unwrap()[0];
        inv.equip(s, &sword()).unwrap();
        inv.add(&arrows(), 1).unwrap();
        assert!(matches!(
            inv.unequip(s),
            Err(MechError::CapacityExceeded { .. })
        ));
        assert!(inv.entry(s).unwrap().is_equipped());
    }
}
