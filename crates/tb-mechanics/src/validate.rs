//! Validation of a catalog against a ruleset.
//!
//! Checks that the ruleset is well-formed and that items, quests and
//! factions reference only things that exist: factions and tiers in gates,
//! quests in prerequisites, items in rewards, objectives in groups, and
//! evaluators for every objective kind.

use std::collections::HashSet;

use tb_core::{Catalog, GroupMode, Item, ObjectiveKind, Quest, Requirements};

use crate::quest::EvaluatorRegistry;
use crate::rules::RuleSet;

/// A warning or error found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// What the issue is about (e.g. "quest 'wolf_hunt'").
    pub subject: String,
    /// A human-readable description of the issue.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        write!(f, "{level}: {}: {}", self.subject, self.message)
    }
}

struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn error(&mut self, subject: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            subject: subject.to_string(),
            message: message.into(),
            is_error: true,
        });
    }

    fn warning(&mut self, subject: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            subject: subject.to_string(),
            message: message.into(),
            is_error: false,
        });
    }
}

/// Validate a ruleset and a catalog together.
///
/// Returns every issue found; an empty list means the pair is usable.
pub fn validate(
    catalog: &Catalog,
    rules: &RuleSet,
    evaluators: &EvaluatorRegistry,
) -> Vec<ValidationIssue> {
    let mut issues = Issues(Vec::new());

    validate_ruleset(rules, &mut issues);
    for faction in catalog.factions() {
        let subject = format!("faction '{}'", faction.id);
        if faction.floor >= faction.ceiling {
            issues.error(
                &subject,
                format!("floor ({}) must be below ceiling ({})", faction.floor, faction.ceiling),
            );
        }
        if !(faction.floor..=faction.ceiling).contains(&faction.initial) {
            issues.warning(
                &subject,
                format!("initial score {} is outside the bounds and will be clamped", faction.initial),
            );
        }
        if faction.tiers.is_empty() {
            issues.warning(&subject, "no tiers defined");
        }
        let mut labels = HashSet::new();
        for tier in &faction.tiers {
            if !labels.insert(tier.label.to_lowercase()) {
                issues.error(&subject, format!("tier '{}' is defined twice", tier.label));
            }
        }
    }
    for item in catalog.items() {
        validate_item(item, catalog, &mut issues);
    }
    for quest in catalog.quests() {
        validate_quest(quest, catalog, evaluators, &mut issues);
    }

    issues.0
}

/// Validate ruleset internal consistency.
fn validate_ruleset(rules: &RuleSet, issues: &mut Issues) {
    let subject = format!("ruleset '{}'", rules.name);

    if rules.level_curve.steps.is_empty() {
        issues.error(&subject, "level curve has no steps");
    }
    for (i, step) in rules.level_curve.steps.iter().enumerate() {
        if *step == 0 {
            issues.error(&subject, format!("leaving level {} costs 0 experience", i + 1));
        }
    }
    if rules.max_level == 0 {
        issues.error(&subject, "max level must be at least 1");
    } else if rules.max_level > rules.level_curve.max_level() {
        issues.warning(
            &subject,
            format!(
                "max level {} is beyond the curve; progression stops at {}",
                rules.max_level,
                rules.effective_max_level()
            ),
        );
    }
    if rules.bag_slots == 0 {
        issues.error(&subject, "bag has no slots");
    }
    if rules.base_health <= 0 {
        issues.error(&subject, "base health must be positive");
    }
    if rules.points_per_level == 0 {
        issues.warning(&subject, "level-ups grant no attribute points");
    }

    for (name, class) in &rules.classes {
        if name.to_lowercase() != *name {
            issues.error(&subject, format!("class key '{name}' must be lowercase"));
        }
        for level in class.levels.keys() {
            if *level < 2 || *level > rules.effective_max_level() {
                issues.warning(
                    &subject,
                    format!("class '{name}' has a bonus for unreachable level {level}"),
                );
            }
        }
    }
}

/// Validate requirements against the catalog.
fn validate_requirements(
    subject: &str,
    requirements: &Requirements,
    catalog: &Catalog,
    issues: &mut Issues,
) {
    for gate in &requirements.reputation {
        match catalog.faction(&gate.faction) {
            Ok(faction) if faction.tier_rank(&gate.tier).is_none() => issues.error(
                subject,
                format!("faction '{}' has no tier '{}'", gate.faction, gate.tier),
            ),
            Ok(_) => {}
            Err(_) => issues.error(subject, format!("unknown faction '{}'", gate.faction)),
        }
    }
    for quest in &requirements.completed_quests {
        if catalog.quest(quest).is_err() {
            issues.error(subject, format!("requires unknown quest '{quest}'"));
        }
    }
    for stat in requirements.stats.keys() {
        if !stat.is_attribute() {
            issues.warning(subject, format!("requirement on derived stat '{stat}'"));
        }
    }
}

fn validate_item(item: &Item, catalog: &Catalog, issues: &mut Issues) {
    let subject = format!("item '{}' v{}", item.id, item.version);

    if !item.stackable && item.max_stack > 1 {
        issues.warning(&subject, "max stack is set but the item is not stackable");
    }
    if item.kind.is_consumable() && item.use_effects.is_empty() {
        issues.warning(&subject, "consumable without use-effects cannot be consumed");
    }
    if item.max_durability == Some(0) {
        issues.error(&subject, "max durability 0 means the item is always broken");
    }
    if item.slot.is_none() && !item.bonuses.is_empty() {
        issues.warning(&subject, "bonuses on an item that cannot be equipped never apply");
    }
    validate_requirements(&subject, &item.requirements, catalog, issues);
}

fn validate_quest(
    quest: &Quest,
    catalog: &Catalog,
    evaluators: &EvaluatorRegistry,
    issues: &mut Issues,
) {
    let subject = format!("quest '{}'", quest.id);

    if quest.objectives.is_empty() {
        issues.warning(&subject, "no objectives; the quest completes as soon as it starts");
    }
    let mut seen = HashSet::new();
    for objective in &quest.objectives {
        if !seen.insert(&objective.id) {
            issues.error(&subject, format!("objective '{}' is defined twice", objective.id));
        }
        if !evaluators.supports(objective.kind.tag()) {
            issues.error(
                &subject,
                format!(
                    "objective '{}' has kind '{}' with no evaluator",
                    objective.id,
                    objective.kind.tag()
                ),
            );
        }
        match &objective.kind {
            ObjectiveKind::Kill { count: 0, .. } => issues.warning(
                &subject,
                format!("objective '{}' asks for 0 kills", objective.id),
            ),
            ObjectiveKind::Possess { item, .. } if catalog.latest_item(item).is_err() => issues
                .error(
                    &subject,
                    format!("objective '{}' asks for unknown item '{item}'", objective.id),
                ),
            _ => {}
        }
    }

    let mut groups = HashSet::new();
    for group in &quest.groups {
        if !groups.insert(&group.id) {
            issues.error(&subject, format!("group '{}' is defined twice", group.id));
        }
        if group.objectives.is_empty() && group.mode == GroupMode::Any {
            issues.error(&subject, format!("group '{}' can never be satisfied", group.id));
        }
        for member in &group.objectives {
            if quest.objective(member).is_none() {
                issues.error(
                    &subject,
                    format!("group '{}' names unknown objective '{member}'", group.id),
                );
            }
        }
    }

    if quest.prerequisites.completed_quests.contains(&quest.id) {
        issues.error(&subject, "requires itself");
    }
    validate_requirements(&subject, &quest.prerequisites, catalog, issues);

    for grant in &quest.reward.items {
        if catalog.latest_item(&grant.item).is_err() {
            issues.error(&subject, format!("rewards unknown item '{}'", grant.item));
        }
        if grant.quantity == 0 {
            issues.warning(&subject, format!("rewards 0 of '{}'", grant.item));
        }
    }
    for grant in &quest.reward.reputation {
        if catalog.faction(&grant.faction).is_err() {
            issues.error(&subject, format!("rewards standing with unknown faction '{}'", grant.faction));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::{EquipSlot, Faction, ItemKind, Objective, ObjectiveGroup, QuestReward, Stat};

    use crate::rules::preset;

    fn errors(issues: &[ValidationIssue]) -> Vec<&ValidationIssue> {
        issues.iter().filter(|i| i.is_error).collect()
    }

    fn clean_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_faction(Faction::standard("ironguard", "Ironguard"))
            .unwrap();
        catalog.publish_item(
            Item::new("sword", "Longsword", ItemKind::Weapon)
                .with_slot(EquipSlot::MainHand)
                .with_bonus(Stat::Damage, 3),
        );
        catalog
            .add_quest(
                Quest::new("wolf_hunt", "Wolf Hunt")
                    .with_objective(Objective::new(
                        "wolves",
                        ObjectiveKind::Kill {
                            target: "wolf".to_string(),
                            count: 5,
                        },
                    ))
                    .with_reward(
                        QuestReward::default()
                            .item("sword", 1)
                            .reputation("ironguard", 50),
                    ),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn standard_rules_with_a_clean_catalog_pass() {
        let issues = validate(&clean_catalog(), &preset::standard(), &EvaluatorRegistry::standard());
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn broken_references_are_errors() {
        let mut catalog = clean_catalog();
        catalog
            .add_quest(
                Quest::new("siege", "The Siege")
                    .with_objective(Objective::new(
                        "escort",
                        ObjectiveKind::Custom {
                            kind: "escort".to_string(),
                            params: serde_json::Value::Null,
                        },
                    ))
                    .with_group(ObjectiveGroup::new("main", GroupMode::All, &["escort", "ghost"]))
                    .with_prerequisites(
                        Requirements::default()
                            .with_tier("ironguard", "Beloved")
                            .after_quest("siege"),
                    )
                    .with_reward(QuestReward::default().item("crown", 1).reputation("cult", 10)),
            )
            .unwrap();

        let issues = validate(&catalog, &preset::standard(), &EvaluatorRegistry::standard());
        let messages: Vec<String> = errors(&issues).iter().map(|i| i.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "objective 'escort' has kind 'escort' with no evaluator",
                "group 'main' names unknown objective 'ghost'",
                "requires itself",
                "faction 'ironguard' has no tier 'Beloved'",
                "rewards unknown item 'crown'",
                "rewards standing with unknown faction 'cult'",
            ]
        );
    }

    #[test]
    fn ruleset_problems_are_reported() {
        let mut rules = preset::standard();
        rules.bag_slots = 0;
        rules.level_curve.steps[3] = 0;
        rules.max_level = 99;
        let issues = validate(&Catalog::new(), &rules, &EvaluatorRegistry::standard());
        let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
        assert!(rendered.contains(&"error: ruleset 'standard': leaving level 4 costs 0 experience".to_string()));
        assert!(rendered.contains(&"error: ruleset 'standard': bag has no slots".to_string()));
        assert!(rendered.iter().any(|r| r.starts_with("warning: ruleset 'standard': max level 99")));
    }

    #[test]
    fn item_warnings() {
        let mut catalog = Catalog::new();
        catalog.publish_item(Item::new("potion", "Empty Flask", ItemKind::Consumable));
        catalog.publish_item(Item::new("shard", "Shard", ItemKind::Misc).with_durability(0));
        let issues = validate(&catalog, &preset::standard(), &EvaluatorRegistry::standard());
        assert_eq!(issues.len(), 2);
        assert_eq!(errors(&issues).len(), 1);
    }
}
