use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use tb_core::{CharacterId, Stat, UserId};
use tb_engine::{
    ActionRequest, Engine, EngineConfig, Journal, MemorySink, MemoryStore, OutcomeEvent,
    TracingSink,
};
use tb_mechanics::{CharacterState, QuestStatus};

use super::session::{Session, Step};
use crate::Format;

/// Everything `tb run --format json` prints.
#[derive(Serialize)]
struct Report<'a> {
    journal: &'a Journal,
    events: &'a [OutcomeEvent],
    characters: &'a [CharacterState],
}

struct Cast {
    ids: HashMap<String, CharacterId>,
    names: HashMap<CharacterId, String>,
}

impl Cast {
    fn id(&self, key: &str) -> Result<CharacterId, String> {
        self.ids
            .get(key)
            .copied()
            .ok_or_else(|| format!("session refers to unknown character '{key}'"))
    }

    fn name(&self, id: CharacterId) -> &str {
        self.names.get(&id).map_or("?", String::as_str)
    }
}

pub fn run(dir: &Path, seed: u64, format: Format) -> Result<(), String> {
    let catalog = super::load_catalog(&dir.join("catalog.json"))?;
    let rules_path = dir.join("rules.json");
    let rules = super::load_rules(rules_path.exists().then_some(rules_path.as_path()))?;
    super::validate_all(&catalog, &rules)?;

    let json = fs::read_to_string(dir.join("session.json"))
        .map_err(|e| format!("cannot read session.json: {e}"))?;
    let session: Session =
        serde_json::from_str(&json).map_err(|e| format!("session.json: {e}"))?;

    tracing::debug!(
        characters = session.characters.len(),
        steps = session.steps.len(),
        seed,
        "replaying session"
    );

    let sink = Arc::new(MemorySink::new());
    let engine = Engine::new(
        Arc::new(catalog),
        Arc::new(rules),
        Arc::new(MemoryStore::new()),
        EngineConfig::default().with_seed(seed),
    )
    .with_sink(Arc::new(TracingSink))
    .with_sink(sink.clone());

    let owner = UserId::new();
    let mut cast = Cast {
        ids: HashMap::new(),
        names: HashMap::new(),
    };
    for spec in &session.characters {
        if cast.ids.contains_key(&spec.key) {
            return Err(format!("character key '{}' is used twice", spec.key));
        }
        let state = engine
            .create_character(owner, &spec.name, &spec.class)
            .map_err(|e| e.to_string())?;
        cast.ids.insert(spec.key.clone(), state.id());
        cast.names.insert(state.id(), spec.name.clone());
    }

    let mut journal = Journal::new();
    for step in &session.steps {
        match step {
            Step::Note { note } => journal.note(note.clone()),
            Step::Action {
                actor,
                target,
                intent,
            } => {
                let actor = cast.id(actor)?;
                let mut request = ActionRequest::new(actor, intent.clone());
                if let Some(target) = target {
                    request = request.with_target(cast.id(target)?);
                }
                match engine.dispatch_with_retry(&request) {
                    Ok(event) => journal.record_outcome(cast.name(actor), &event),
                    Err(err) => {
                        tracing::debug!(
                            actor = cast.name(actor),
                            action = intent.kind(),
                            %err,
                            "step refused"
                        );
                        journal.record_rejection(cast.name(actor), intent.kind(), &err);
                    }
                }
            }
        }
    }

    let mut states: Vec<CharacterState> = engine
        .characters()
        .and_then(|ids| ids.into_iter().map(|id| engine.character(id)).collect())
        .map_err(|e| e.to_string())?;
    states.sort_by(|a, b| a.character.created_at.cmp(&b.character.created_at));

    match format {
        Format::Json => {
            let events = sink.events();
            let report = Report {
                journal: &journal,
                events: &events,
                characters: &states,
            };
            let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        Format::Text => {
            print!("{}", journal.export_text());
            println!();
            print_sheets(&engine, &states)?;
        }
        Format::Markdown => {
            print!("{}", journal.export_markdown());
            println!();
            println!("## Characters");
            println!();
            print_sheets(&engine, &states)?;
        }
    }

    if journal.rejections() > 0 {
        eprintln!(
            "  {} action{} refused",
            journal.rejections(),
            if journal.rejections() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

fn print_sheets(engine: &Engine, states: &[CharacterState]) -> Result<(), String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Name", "Class", "Level", "XP", "Health", "Mana", "STR", "DEX", "CON", "Equipped",
    ]);

    for state in states {
        let derived = engine.derived(state.id()).map_err(|e| e.to_string())?;
        let stat = |s: Stat| derived.get(&s).copied().unwrap_or_default().to_string();
        let equipped: Vec<String> = state
            .inventory
            .equipped()
            .map(|e| {
                let name = e.overrides.name.clone().unwrap_or_else(|| e.item.id.to_string());
                if e.is_broken() {
                    format!("{name} (broken)")
                } else {
                    name
                }
            })
            .collect();
        let c = &state.character;
        table.add_row(vec![
            c.name.clone(),
            c.class.clone(),
            c.level.to_string(),
            c.experience.to_string(),
            c.health.to_string(),
            c.mana.to_string(),
            stat(Stat::Strength),
            stat(Stat::Dexterity),
            stat(Stat::Constitution),
            if equipped.is_empty() {
                "-".to_string()
            } else {
                equipped.join(", ")
            },
        ]);
    }
    println!("{table}");

    for state in states {
        println!();
        println!("  {}", state.character.name.bold());
        let bag = state.inventory.summary();
        if bag.is_empty() {
            println!("    Bag: empty");
        } else {
            let items: Vec<String> = bag.iter().map(|(id, qty)| format!("{id} x{qty}")).collect();
            println!(
                "    Bag ({}/{}): {}",
                state.inventory.bag_count(),
                state.inventory.capacity(),
                items.join(", ")
            );
        }
        for record in state.quests.records() {
            let status = record.status.to_string();
            let status = match record.status {
                QuestStatus::Completed => status.green(),
                QuestStatus::Failed | QuestStatus::Abandoned => status.red(),
                _ => status.yellow(),
            };
            println!("    Quest {} (attempt {}): {status}", record.quest, record.attempt);
        }
        for faction in engine.catalog().factions() {
            let score = state.reputation.standing(faction);
            let tier = state
                .reputation
                .tier(faction)
                .map_or("-", |t| t.label.as_str());
            println!("    {}: {score} ({tier})", faction.name);
        }
    }
    Ok(())
}
