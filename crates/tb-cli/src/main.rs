//! CLI frontend for the Talebound progression and quest engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "tb",
    about = "Talebound: character progression and quest resolution",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output format for `tb run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Plain text journal and sheet tables.
    Text,
    /// Markdown journal and sheet tables.
    Markdown,
    /// One JSON document with journal, events and final states.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a dice expression such as 2d6+1
    Roll {
        /// Dice expression
        expr: String,

        /// RNG seed for a reproducible roll
        #[arg(short, long)]
        seed: Option<u64>,

        /// Difficulty class to check the total against
        #[arg(long)]
        dc: Option<i64>,

        /// Narrative tag recorded with the roll
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Validate a catalog and ruleset
    Check {
        /// Catalog file
        #[arg(short, long, default_value = "catalog.json")]
        catalog: PathBuf,

        /// Ruleset file (default: the standard ruleset)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Create a new campaign directory with a sample catalog and session
    Init {
        /// Name of the campaign to create
        name: String,
    },

    /// Replay a scripted session and print the journal and character sheets
    Run {
        /// Campaign directory (catalog.json, rules.json, session.json)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// RNG seed for deterministic dice
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roll {
            expr,
            seed,
            dc,
            context,
        } => commands::roll::run(&expr, seed, dc, context.as_deref()),
        Commands::Check { catalog, rules } => commands::check::run(&catalog, rules.as_deref()),
        Commands::Init { name } => commands::init::run(&name),
        Commands::Run { dir, seed, format } => commands::run::run(&dir, seed, format),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
