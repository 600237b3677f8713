pub mod check;
pub mod init;
pub mod roll;
pub mod run;
pub mod session;

use std::fs;
use std::path::Path;

use colored::Colorize;
use tb_core::Catalog;
use tb_mechanics::rules::preset;
use tb_mechanics::{EvaluatorRegistry, RuleSet, ValidationIssue, validate};

/// Read and parse a catalog file.
fn load_catalog(path: &Path) -> Result<Catalog, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Catalog::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// Read a ruleset file, or fall back to the standard ruleset.
fn load_rules(path: Option<&Path>) -> Result<RuleSet, String> {
    let Some(path) = path else {
        return Ok(preset::standard());
    };
    let json = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    RuleSet::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// Validate catalog and rules, printing issues to stderr.
/// Fails if any issue is an error.
fn validate_all(catalog: &Catalog, rules: &RuleSet) -> Result<Vec<ValidationIssue>, String> {
    let issues = validate(catalog, rules, &EvaluatorRegistry::standard());
    for issue in &issues {
        if issue.is_error {
            eprintln!("  {}", issue.to_string().red());
        } else {
            eprintln!("  {}", issue.to_string().yellow());
        }
    }

    let errors = issues.iter().filter(|i| i.is_error).count();
    let warnings = issues.len() - errors;
    if errors > 0 {
        eprintln!(
            "  {} error{}, {} warning{}",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
        return Err("validation failed with errors".into());
    }
    if warnings > 0 {
        eprintln!(
            "  {} warning{}",
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    }
    Ok(issues)
}
