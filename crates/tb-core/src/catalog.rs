use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::faction::Faction;
use crate::id::{FactionId, ItemId, QuestId};
use crate::item::{Item, ItemRef};
use crate::quest::Quest;

/// On-disk shape of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Item definitions. Repeated ids publish successive versions.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Quest definitions.
    #[serde(default)]
    pub quests: Vec<Quest>,
    /// Factions.
    #[serde(default)]
    pub factions: Vec<Faction>,
}

/// Read-only definitions of items, quests, and factions.
///
/// Items are versioned: publishing an id that already exists appends a new
/// version instead of replacing the old one, so inventory entries that
/// reference an earlier version keep resolving to the definition they
/// were created with.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<ItemId, Vec<Item>>,
    quests: HashMap<QuestId, Quest>,
    factions: HashMap<FactionId, Faction>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Publish an item definition, assigning it the next version.
    pub fn publish_item(&mut self, mut item: Item) -> ItemRef {
        let versions = self.items.entry(item.id.clone()).or_default();
        item.version = u32::try_from(versions.len()).map_or(u32::MAX, |n| n + 1);
        let item_ref = item.item_ref();
        versions.push(item);
        item_ref
    }

    /// Look up an exact item version.
    pub fn item(&self, item_ref: &ItemRef) -> CoreResult<&Item> {
        let versions = self
            .items
            .get(&item_ref.id)
            .ok_or_else(|| CoreError::UnknownItem(item_ref.id.clone()))?;
        let index = usize::try_from(item_ref.version)
            .ok()
            .and_then(|v| v.checked_sub(1))
            .ok_or_else(|| CoreError::UnknownItemVersion(item_ref.clone()))?;
        versions
            .get(index)
            .ok_or_else(|| CoreError::UnknownItemVersion(item_ref.clone()))
    }

    /// The most recently published version of an item.
    pub fn latest_item(&self, id: &ItemId) -> CoreResult<&Item> {
        self.items
            .get(id)
            .and_then(|v| v.last())
            .ok_or_else(|| CoreError::UnknownItem(id.clone()))
    }

    /// All published versions of an item, oldest first.
    pub fn item_versions(&self, id: &ItemId) -> &[Item] {
        self.items.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Latest version of every item, sorted by id.
    pub fn items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().filter_map(|v| v.last()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    // -----------------------------------------------------------------------
    // Quests
    // -----------------------------------------------------------------------

    /// Add a quest definition. Quest ids must be unique.
    pub fn add_quest(&mut self, quest: Quest) -> CoreResult<()> {
        if self.quests.contains_key(&quest.id) {
            return Err(CoreError::Duplicate {
                kind: "quest",
                id: quest.id.to_string(),
            });
        }
        self.quests.insert(quest.id.clone(), quest);
        Ok(())
    }

    /// Look up a quest.
    pub fn quest(&self, id: &QuestId) -> CoreResult<&Quest> {
        self.quests
            .get(id)
            .ok_or_else(|| CoreError::UnknownQuest(id.clone()))
    }

    /// All quests, sorted by id.
    pub fn quests(&self) -> Vec<&Quest> {
        let mut quests: Vec<&Quest> = self.quests.values().collect();
        quests.sort_by(|a, b| a.id.cmp(&b.id));
        quests
    }

    // -----------------------------------------------------------------------
    // Factions
    // -----------------------------------------------------------------------

    /// Add a faction. Faction ids must be unique.
    pub fn add_faction(&mut self, faction: Faction) -> CoreResult<()> {
        if self.factions.contains_key(&faction.id) {
            return Err(CoreError::Duplicate {
                kind: "faction",
                id: faction.id.to_string(),
            });
        }
        self.factions.insert(faction.id.clone(), faction);
        Ok(())
    }

    /// Look up a faction.
    pub fn faction(&self, id: &FactionId) -> CoreResult<&Faction> {
        self.factions
            .get(id)
            .ok_or_else(|| CoreError::UnknownFaction(id.clone()))
    }

    /// All factions, sorted by id.
    pub fn factions(&self) -> Vec<&Faction> {
        let mut factions: Vec<&Faction> = self.factions.values().collect();
        factions.sort_by(|a, b| a.id.cmp(&b.id));
        factions
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Build a catalog from its file form.
    pub fn from_file(file: CatalogFile) -> CoreResult<Self> {
        let mut catalog = Self::new();
        for item in file.items {
            catalog.publish_item(item);
        }
        for quest in file.quests {
            catalog.add_quest(quest)?;
        }
        for faction in file.factions {
            catalog.add_faction(faction)?;
        }
        Ok(catalog)
    }

    /// Parse a catalog from JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    /// The file form of this catalog, with every item version in order.
    pub fn to_file(&self) -> CatalogFile {
        let mut ids: Vec<&ItemId> = self.items.keys().collect();
        ids.sort();
        CatalogFile {
            items: ids
                .into_iter()
                .flat_map(|id| self.item_versions(id).iter().cloned())
                .collect(),
            quests: self.quests().into_iter().cloned().collect(),
            factions: self.factions().into_iter().cloned().collect(),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Number of distinct item ids.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of quests.
    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    /// Number of factions.
    pub fn faction_count(&self) -> usize {
        self.factions.len()
    }
}
