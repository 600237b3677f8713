use serde::{Deserialize, Serialize};

use crate::id::FactionId;

/// A named band of reputation starting at `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Lowest score that falls in this tier.
    pub threshold: i32,
    /// Display label (e.g. "Friendly").
    pub label: String,
}

/// A faction characters can gain or lose standing with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    /// Catalog key.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Lowest reachable score.
    pub floor: i32,
    /// Highest reachable score.
    pub ceiling: i32,
    /// Score on first contact.
    #[serde(default)]
    pub initial: i32,
    /// Tiers in ascending threshold order.
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

impl Faction {
    /// Create a faction with bounds and no tiers.
    pub fn new(id: impl Into<FactionId>, name: impl Into<String>, floor: i32, ceiling: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            floor,
            ceiling,
            initial: 0,
            tiers: Vec::new(),
        }
    }

    /// A faction on the common -1000..=1000 scale with
    /// Hostile / Unfriendly / Neutral / Friendly / Allied tiers.
    pub fn standard(id: impl Into<FactionId>, name: impl Into<String>) -> Self {
        Self::new(id, name, -1000, 1000)
            .with_tier(-1000, "Hostile")
            .with_tier(-500, "Unfriendly")
            .with_tier(-100, "Neutral")
            .with_tier(100, "Friendly")
            .with_tier(500, "Allied")
    }

    /// Add a tier, keeping tiers sorted by threshold.
    pub fn with_tier(mut self, threshold: i32, label: impl Into<String>) -> Self {
        self.tiers.push(Tier {
            threshold,
            label: label.into(),
        });
        self.tiers.sort_by_key(|t| t.threshold);
        self
    }

    /// Set the first-contact score.
    pub fn with_initial(mut self, initial: i32) -> Self {
        self.initial = initial;
        self
    }

    /// Clamp an arbitrary score into `[floor, ceiling]`.
    pub fn clamp(&self, score: i64) -> i32 {
        let clamped = score.clamp(i64::from(self.floor), i64::from(self.ceiling));
        // Bounded by two i32 values, so the cast is lossless.
        clamped as i32
    }

    /// The first-contact score, clamped to bounds.
    pub fn initial_score(&self) -> i32 {
        self.clamp(i64::from(self.initial))
    }

    /// Index of the tier a score falls into.
    ///
    /// Scores below the lowest threshold fall into the lowest tier.
    /// Returns `None` only if the faction has no tiers.
    pub fn tier_index(&self, score: i32) -> Option<usize> {
        if self.tiers.is_empty() {
            return None;
        }
        Some(
            self.tiers
                .iter()
                .rposition(|t| score >= t.threshold)
                .unwrap_or(0),
        )
    }

    /// The tier a score falls into.
    pub fn tier_for(&self, score: i32) -> Option<&Tier> {
        self.tier_index(score).and_then(|i| self.tiers.get(i))
    }

    /// Position of a tier label in the ascending order (case-insensitive).
    pub fn tier_rank(&self, label: &str) -> Option<usize> {
        let lower = label.to_lowercase();
        self.tiers.iter().position(|t| t.label.to_lowercase() == lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_stay_sorted() {
        let f = Faction::new("guild", "Guild", -10, 10)
            .with_tier(5, "Friendly")
            .with_tier(-10, "Hostile")
            .with_tier(0, "Neutral");
        let labels: Vec<&str> = f.tiers.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["Hostile", "Neutral", "Friendly"]);
    }

    #[test]
    fn tier_for_score() {
        let f = Faction::standard("ironguard", "Ironguard");
        assert_eq!(f.tier_for(0).unwrap().label, "Neutral");
        assert_eq!(f.tier_for(100).unwrap().label, "Friendly");
        assert_eq!(f.tier_for(99).unwrap().label, "Neutral");
        assert_eq!(f.tier_for(-1000).unwrap().label, "Hostile");
        assert_eq!(f.tier_for(1000).unwrap().label, "Allied");
    }

    #[test]
    fn below_lowest_threshold_is_lowest_tier() {
        let f = Faction::new("guild", "Guild", -100, 100).with_tier(0, "Known");
        assert_eq!(f.tier_for(-50).unwrap().label, "Known");
    }

    #[test]
    fn no_tiers_means_no_tier() {
        let f = Faction::new("guild", "Guild", -100, 100);
        assert!(f.tier_for(0).is_none());
    }

    #[test]
    fn clamp_handles_extremes() {
        let f = Faction::standard("ironguard", "Ironguard");
        assert_eq!(f.clamp(i64::MAX), 1000);
        assert_eq!(f.clamp(i64::MIN), -1000);
        assert_eq!(f.clamp(42), 42);
    }

    #[test]
    fn tier_rank_is_case_insensitive() {
        let f = Faction::standard("ironguard", "Ironguard");
        assert_eq!(f.tier_rank("friendly"), Some(3));
        assert_eq!(f.tier_rank("Exalted"), None);
    }

    #[test]
    fn initial_score_is_clamped() {
        let f = Faction::new("guild", "Guild", -10, 10).with_initial(50);
        assert_eq!(f.initial_score(), 10);
    }

    proptest::proptest! {
        #[test]
        fn clamped_scores_always_have_a_tier(score in proptest::num::i64::ANY) {
            let f = Faction::standard("ironguard", "Ironguard");
            let clamped = f.clamp(score);
            proptest::prop_assert!((-1000..=1000).contains(&clamped));
            proptest::prop_assert!(f.tier_for(clamped).is_some());
        }
    }
}
