use std::fs;
use std::path::Path;

use tb_core::{
    Catalog, Difficulty, EquipSlot, Faction, GroupMode, Item, ItemEffect, ItemKind, Objective,
    ObjectiveGroup, ObjectiveKind, Quest, QuestId, QuestReward, Rarity, Requirements, Stat,
};
use tb_engine::Intent;
use tb_mechanics::Evidence;
use tb_mechanics::rules::preset;

use super::session::{CharacterSpec, Session, Step};

pub fn run(name: &str) -> Result<(), String> {
    let dir = Path::new(name);

    if dir.exists() {
        return Err(format!("directory '{}' already exists", name));
    }

    fs::create_dir_all(dir).map_err(|e| format!("cannot create directory: {e}"))?;

    let catalog = sample_catalog()?.to_json().map_err(|e| e.to_string())?;
    fs::write(dir.join("catalog.json"), catalog)
        .map_err(|e| format!("cannot write catalog.json: {e}"))?;

    let rules = preset::standard().to_json().map_err(|e| e.to_string())?;
    fs::write(dir.join("rules.json"), rules)
        .map_err(|e| format!("cannot write rules.json: {e}"))?;

    let session = serde_json::to_string_pretty(&sample_session()).map_err(|e| e.to_string())?;
    fs::write(dir.join("session.json"), session)
        .map_err(|e| format!("cannot write session.json: {e}"))?;

    println!("Created campaign '{}' in {}/", name, name);
    println!("  catalog.json  items, quests and factions");
    println!("  rules.json    the standard ruleset");
    println!("  session.json  a scripted session to replay");
    println!();
    println!("Get started:");
    println!("  cd {}", name);
    println!("  tb check            # Validate catalog and rules");
    println!("  tb run              # Replay the session");
    println!("  tb run -f markdown  # Journal as markdown");

    Ok(())
}

fn sample_catalog() -> Result<Catalog, String> {
    let mut catalog = Catalog::new();

    let mut sword = Item::new("longsword", "Longsword", ItemKind::Weapon)
        .with_slot(EquipSlot::MainHand)
        .with_bonus(Stat::Strength, 2)
        .with_bonus(Stat::Damage, 3)
        .with_durability(40);
    sword.description = "Plain steel, well balanced.".to_string();
    sword.value = 1500;
    sword.weight = 3.0;
    catalog.publish_item(sword);

    catalog.publish_item(
        Item::new("leather_cap", "Leather Cap", ItemKind::Armor)
            .with_slot(EquipSlot::Head)
            .with_bonus(Stat::Defense, 1),
    );
    catalog.publish_item(
        Item::new("healing_potion", "Healing Draught", ItemKind::Consumable)
            .stackable(5)
            .with_effect(ItemEffect::Heal { amount: 30 }),
    );
    catalog.publish_item(
        Item::new("wolf_pelt", "Wolf Pelt", ItemKind::Material)
            .stackable(10)
            .with_rarity(Rarity::Common),
    );
    catalog.publish_item(
        Item::new("oath_ring", "Ring of the Iron Oath", ItemKind::Armor)
            .with_slot(EquipSlot::Finger1)
            .with_bonus(Stat::Constitution, 1)
            .with_rarity(Rarity::Rare)
            .with_requirements(Requirements::default().with_tier("ironguard", "Friendly")),
    );

    catalog
        .add_faction(Faction::standard("ironguard", "The Ironguard"))
        .map_err(|e| e.to_string())?;

    let quests = [
        Quest::new("wolf_hunt", "Wolves at the Gate")
            .with_objective(
                Objective::new(
                    "wolves",
                    ObjectiveKind::Kill {
                        target: "wolf".to_string(),
                        count: 3,
                    },
                )
                .describe("Drive off the wolves troubling the caravan"),
            )
            .with_reward(
                QuestReward::default()
                    .experience(1500)
                    .item("wolf_pelt", 3)
                    .reputation("ironguard", 150),
            ),
        Quest::new("iron_oath", "The Iron Oath")
            .with_difficulty(Difficulty::Major)
            .with_prerequisites(Requirements::default().with_tier("ironguard", "Friendly"))
            .with_objective(Objective::new(
                "oath",
                ObjectiveKind::DialogueFlag {
                    flag: "sworn".to_string(),
                },
            ))
            .with_reward(
                QuestReward::default()
                    .experience(500)
                    .item("oath_ring", 1)
                    .reputation("ironguard", 100),
            ),
        Quest::new("bridge_toll", "The Troll Bridge")
            .with_difficulty(Difficulty::Minor)
            .with_objective(Objective::new(
                "bribe",
                ObjectiveKind::Possess {
                    item: "wolf_pelt".into(),
                    quantity: 5,
                },
            ))
            .with_objective(Objective::new("persuade", ObjectiveKind::RollSuccess { dc: 14 }))
            .with_group(
                ObjectiveGroup::new("pay", GroupMode::All, &["bribe"]).labelled("Pay the toll"),
            )
            .with_group(
                ObjectiveGroup::new("talk", GroupMode::All, &["persuade"])
                    .labelled("Talk your way across"),
            )
            .with_reward(QuestReward::default().experience(250)),
    ];
    for quest in quests {
        catalog.add_quest(quest).map_err(|e| e.to_string())?;
    }

    Ok(catalog)
}

fn quest(id: &str) -> QuestId {
    QuestId::new(id)
}

fn sample_session() -> Session {
    Session {
        characters: vec![
            CharacterSpec {
                key: "mira".to_string(),
                name: "Mira".to_string(),
                class: "warrior".to_string(),
            },
            CharacterSpec {
                key: "tomas".to_string(),
                name: "Tomas".to_string(),
                class: "bard".to_string(),
            },
        ],
        steps: vec![
            Step::note("The caravan reaches Ironford at dusk."),
            Step::act(
                "mira",
                Intent::AddItem {
                    item: "longsword".into(),
                    version: None,
                    quantity: 1,
                },
            ),
            Step::act(
                "mira",
                Intent::Equip {
                    entry: "longsword".into(),
                    swap: false,
                },
            ),
            Step::act(
                "mira",
                Intent::AddItem {
                    item: "healing_potion".into(),
                    version: None,
                    quantity: 3,
                },
            ),
            Step::act("mira", Intent::StartQuest { quest: quest("wolf_hunt") }),
            Step::act(
                "mira",
                Intent::StatCheck {
                    stat: Stat::Strength,
                    dc: 12,
                    modifiers: Vec::new(),
                    context: Some("wolf ambush".to_string()),
                    offensive: true,
                },
            ),
            Step::act("mira", Intent::Damage { amount: 25 }),
            Step::act(
                "mira",
                Intent::Consume {
                    entry: "healing_potion".into(),
                    quantity: 1,
                },
            ),
            Step::act(
                "mira",
                Intent::RecordObjective {
                    quest: quest("wolf_hunt"),
                    objective: "wolves".into(),
                    evidence: Evidence::Kills {
                        target: "wolf".to_string(),
                        count: 3,
                    },
                },
            ),
            Step::act("mira", Intent::CompleteQuest { quest: quest("wolf_hunt") }),
            Step::note("Word of the hunt spreads through the garrison."),
            Step::act("tomas", Intent::StartQuest { quest: quest("iron_oath") }),
            Step::act("mira", Intent::StartQuest { quest: quest("iron_oath") }),
            Step::act(
                "mira",
                Intent::RecordObjective {
                    quest: quest("iron_oath"),
                    objective: "oath".into(),
                    evidence: Evidence::Flag {
                        flag: "sworn".to_string(),
                    },
                },
            ),
            Step::act("mira", Intent::CompleteQuest { quest: quest("iron_oath") }),
            Step::act(
                "mira",
                Intent::Equip {
                    entry: "oath_ring".into(),
                    swap: false,
                },
            ),
            Step::act_on(
                "mira",
                "tomas",
                Intent::Transfer {
                    entry: "wolf_pelt".into(),
                    quantity: 2,
                },
            ),
            Step::act("tomas", Intent::StartQuest { quest: quest("bridge_toll") }),
            Step::act(
                "tomas",
                Intent::StatCheck {
                    stat: Stat::Charisma,
                    dc: 14,
                    modifiers: vec![],
                    context: Some("haggle with the troll".to_string()),
                    offensive: false,
                },
            ),
            Step::act(
                "tomas",
                Intent::RecordObjective {
                    quest: quest("bridge_toll"),
                    objective: "persuade".into(),
                    evidence: Evidence::Roll {
                        roll: None,
                        total: 0,
                        critical_success: false,
                        critical_failure: false,
                    },
                },
            ),
            Step::act("tomas", Intent::CompleteQuest { quest: quest("bridge_toll") }),
            Step::act(
                "mira",
                Intent::Degrade {
                    entry: "longsword".into(),
                    amount: 5,
                },
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_mechanics::{EvaluatorRegistry, validate};

    #[test]
    fn sample_catalog_is_valid() {
        let catalog = sample_catalog().unwrap();
        let issues = validate(&catalog, &preset::standard(), &EvaluatorRegistry::standard());
        assert!(issues.iter().all(|i| !i.is_error), "{issues:?}");
        assert_eq!(catalog.quest_count(), 3);
    }

    #[test]
    fn sample_session_round_trips_through_json() {
        let json = serde_json::to_string(&sample_session()).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.characters.len(), 2);
        assert_eq!(back.steps.len(), sample_session().steps.len());
        assert!(matches!(back.steps[0], Step::Note { .. }));
    }
}
