use std::path::Path;

pub fn run(catalog: &Path, rules: Option<&Path>) -> Result<(), String> {
    let loaded = super::load_catalog(catalog)?;
    let ruleset = super::load_rules(rules)?;
    super::validate_all(&loaded, &ruleset)?;

    println!("  All checks passed for '{}'.", catalog.display());
    println!(
        "  {} items, {} quests, {} factions; ruleset '{}' with {} classes",
        loaded.item_count(),
        loaded.quest_count(),
        loaded.faction_count(),
        ruleset.name,
        ruleset.classes.len()
    );

    Ok(())
}
