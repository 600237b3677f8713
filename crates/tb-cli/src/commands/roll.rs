use colored::Colorize;
use tb_mechanics::{Outcome, RngSource, RollSpec, check, resolve};

pub fn run(expr: &str, seed: Option<u64>, dc: Option<i64>, context: Option<&str>) -> Result<(), String> {
    let spec = RollSpec::parse(expr).map_err(|e| e.to_string())?;
    let mut source = match seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };
    let roll = resolve(&spec, 0, context, &mut source).map_err(|e| e.to_string())?;

    println!("  {roll}");
    if let Some(dc) = dc {
        let outcome = check(&roll, dc);
        let text = format!("{outcome} vs DC {dc}");
        let text = match outcome {
            Outcome::CriticalSuccess { .. } => text.green().bold(),
            Outcome::Success { .. } => text.green(),
            Outcome::Failure { .. } => text.yellow(),
            Outcome::CriticalFailure { .. } => text.red().bold(),
        };
        println!("  {text}");
    }

    Ok(())
}
