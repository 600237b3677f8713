//! Checking item and quest requirements against a character.

use tb_core::{Catalog, Requirements, StatMap, Unmet};

use crate::quest::QuestLog;
use crate::reputation::ReputationLedger;

/// Everything a requirement can look at.
#[derive(Debug, Clone, Copy)]
pub struct Standing<'a> {
    /// Character level.
    pub level: u32,
    /// Derived stats.
    pub stats: &'a StatMap,
    /// Faction standing.
    pub reputation: &'a ReputationLedger,
    /// Quest history.
    pub quests: &'a QuestLog,
    /// Faction and quest definitions.
    pub catalog: &'a Catalog,
}

/// Every requirement the character fails. Empty means all are met.
pub fn unmet(requirements: &Requirements, standing: &Standing<'_>) -> Vec<Unmet> {
    let mut unmet = Vec::new();

    if let Some(required) = requirements.min_level.filter(|&r| standing.level < r) {
        unmet.push(Unmet::Level {
            required,
            actual: standing.level,
        });
    }

    for (&stat, &required) in &requirements.stats {
        let actual = standing.stats.get(&stat).copied().unwrap_or_default();
        if actual < required {
            unmet.push(Unmet::Stat {
                stat,
                required,
                actual,
            });
        }
    }

    for gate in &requirements.reputation {
        let faction = standing.catalog.faction(&gate.faction).ok();
        let met = faction.is_some_and(|f| standing.reputation.meets(f, &gate.tier));
        if !met {
            unmet.push(Unmet::Reputation {
                faction: gate.faction.clone(),
                required: gate.tier.clone(),
                actual: faction
                    .and_then(|f| standing.reputation.tier(f))
                    .map(|t| t.label.clone()),
            });
        }
    }

    for quest in &requirements.completed_quests {
        if !standing.quests.has_completed(quest) {
            unmet.push(Unmet::Quest {
                quest: quest.clone(),
            });
        }
    }

    unmet
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{Faction, Stat};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_faction(Faction::standard("ironguard", "Ironguard"))
            .unwrap();
        catalog
    }

    #[test]
    fn empty_requirements_always_pass() {
        let catalog = catalog();
        let stats = StatMap::new();
        let reputation = ReputationLedger::default();
        let quests = QuestLog::default();
        let standing = Standing {
            level: 1,
            stats: &stats,
            reputation: &reputation,
            quests: &quests,
            catalog: &catalog,
        };
        assert!(unmet(&Requirements::default(), &standing).is_empty());
    }

    #[test]
    fn every_failure_is_listed() {
        let catalog = catalog();
        let stats = StatMap::from([(Stat::Strength, 11)]);
        let reputation = ReputationLedger::default();
        let quests = QuestLog::default();
        let standing = Standing {
            level: 2,
            stats: &stats,
            reputation: &reputation,
            quests: &quests,
            catalog: &catalog,
        };
        let req = Requirements::default()
            .at_level(5)
            .with_stat(Stat::Strength, 14)
            .with_tier("ironguard", "Friendly")
            .with_tier("nobody", "Friendly")
            .after_quest("wolf_hunt");
        let unmet = unmet(&req, &standing);
        assert_eq!(unmet.len(), 5);
        assert_eq!(
            unmet[2],
            Unmet::Reputation {
                faction: "ironguard".into(),
                required: "Friendly".to_string(),
                actual: Some("Neutral".to_string()),
            }
        );
        assert!(matches!(&unmet[3], Unmet::Reputation { actual: None, .. }));
    }

    #[test]
    fn met_requirements_pass() {
        let catalog = catalog();
        let stats = StatMap::from([(Stat::Strength, 14)]);
        let mut reputation = ReputationLedger::default();
        reputation.adjust(&catalog, &"ironguard".into(), 150).unwrap();
        let quests = QuestLog::default();
        let standing = Standing {
            level: 5,
            stats: &stats,
            reputation: &reputation,
            quests: &quests,
            catalog: &catalog,
        };
        let req = Requirements::default()
            .at_level(5)
            .with_stat(Stat::Strength, 14)
            .with_tier("ironguard", "friendly");
        assert!(unmet(&req, &standing).is_empty());
    }
}
