//! Per-character standing with factions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tb_core::{Catalog, Faction, FactionId, Tier};

use crate::error::{MechError, MechResult};

/// Which way a tier boundary was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Into a higher tier.
    Up,
    /// Into a lower tier.
    Down,
}

/// A crossing from one tier into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChange {
    /// Faction whose tier changed.
    pub faction: FactionId,
    /// Tier label before.
    pub from: String,
    /// Tier label after.
    pub to: String,
    /// Up or down.
    pub direction: Direction,
}

/// The result of a reputation adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationChange {
    /// Faction adjusted.
    pub faction: FactionId,
    /// Requested delta.
    pub delta: i64,
    /// Score before.
    pub previous: i32,
    /// Score after clamping.
    pub score: i32,
    /// Tier before, if the faction has tiers.
    pub previous_tier: Option<String>,
    /// Tier after, if the faction has tiers.
    pub tier: Option<String>,
    /// Set when a tier boundary was crossed.
    pub tier_change: Option<TierChange>,
}

/// Scores by faction. Factions never adjusted sit at their initial score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationLedger {
    scores: BTreeMap<FactionId, i32>,
}

impl ReputationLedger {
    /// Current score, defaulting to the faction's initial score.
    pub fn standing(&self, faction: &Faction) -> i32 {
        self.scores
            .get(&faction.id)
            .copied()
            .map_or_else(|| faction.initial_score(), |s| faction.clamp(i64::from(s)))
    }

    /// Current tier.
    pub fn tier<'f>(&self, faction: &'f Faction) -> Option<&'f Tier> {
        faction.tier_for(self.standing(faction))
    }

    /// Returns true if the current tier is at least `label`.
    ///
    /// Unknown labels are never met.
    pub fn meets(&self, faction: &Faction, label: &str) -> bool {
        let Some(required) = faction.tier_rank(label) else {
            return false;
        };
        faction
            .tier_index(self.standing(faction))
            .is_some_and(|current| current >= required)
    }

    /// Add `delta`, clamping into the faction's bounds.
    ///
    /// The only failure is an unknown faction.
    pub fn adjust(
        &mut self,
        catalog: &Catalog,
        faction_id: &FactionId,
        delta: i64,
    ) -> MechResult<ReputationChange> {
        let faction = catalog
            .faction(faction_id)
            .map_err(|_| MechError::UnknownFaction(faction_id.clone()))?;
        Ok(self.adjust_faction(faction, delta))
    }

    /// Add `delta` for a faction definition already in hand.
    pub fn adjust_faction(&mut self, faction: &Faction, delta: i64) -> ReputationChange {
        let previous = self.standing(faction);
        let score = faction.clamp(i64::from(previous).saturating_add(delta));
        self.scores.insert(faction.id.clone(), score);

        let before = faction.tier_index(previous);
        let after = faction.tier_index(score);
        let label = |i: Option<usize>| i.and_then(|i| faction.tiers.get(i)).map(|t| t.label.clone());
        let previous_tier = label(before);
        let tier = label(after);

        let tier_change = match (before, after, &previous_tier, &tier) {
            (Some(b), Some(a), Some(from), Some(to)) if b != a => Some(TierChange {
                faction: faction.id.clone(),
                from: from.clone(),
                to: to.clone(),
                direction: if a > b { Direction::Up } else { Direction::Down },
            }),
            _ => None,
        };

        ReputationChange {
            faction: faction.id.clone(),
            delta,
            previous,
            score,
            previous_tier,
            tier,
            tier_change,
        }
    }

    /// Factions with a recorded score, in id order.
    pub fn scores(&self) -> impl Iterator<Item = (&FactionId, i32)> {
        self.scores.iter().map(|(id, score)| (id, *score))
    }
}
