//! Quarry CLI - Render saved visual queries as SQL
//!
//! Usage:
//!   quarry render <query.json> [--driver <driver>] [--quote <quote>]
//!   quarry check <query.json>
//!   quarry new
//!
//! Examples:
//!   quarry render orders.json --driver org.postgresql.Driver --quote '"'
//!   quarry check orders.json

use clap::{Parser, Subcommand};
use quarry::config::Settings;
use quarry::snapshot::{IdentityMode, QueryDocument};
use quarry::Query;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - Turn visual query models into SQL")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a quarry.toml (defaults to $QUARRY_CONFIG, then ./quarry.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a saved query document as SQL
    Render {
        /// Path to the query document (JSON)
        file: PathBuf,

        /// Driver identifier used to pick the dialect
        #[arg(short, long)]
        driver: Option<String>,

        /// Identifier quote string (empty for bare identifiers)
        #[arg(short, long)]
        quote: Option<String>,

        /// Ignore any user-supplied SQL override
        #[arg(long)]
        structural: bool,
    },

    /// Report whether a saved query contains cross joins
    Check {
        /// Path to the query document (JSON)
        file: PathBuf,
    },

    /// Print an empty query document
    New {
        /// Name of the new query
        #[arg(short, long, default_value = "")]
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_level = if cli.verbose {
        "quarry=debug"
    } else {
        settings.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            file,
            driver,
            quote,
            structural,
        } => cmd_render(&settings, file, driver, quote, structural),
        Commands::Check { file } => cmd_check(file),
        Commands::New { name } => cmd_new(name),
    }
}

fn load_query(file: &Path) -> Result<Query, String> {
    let json = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    QueryDocument::from_json(&json)
        .and_then(|doc| doc.into_query(IdentityMode::Preserve))
        .map_err(|e| format!("Error loading '{}': {}", file.display(), e))
}

fn cmd_render(
    settings: &Settings,
    file: PathBuf,
    driver: Option<String>,
    quote: Option<String>,
    structural: bool,
) -> ExitCode {
    let mut query = match load_query(&file) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut source = match settings.generation.to_source() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(driver) = driver {
        source = source.with_driver(driver);
    }
    if let Some(quote) = quote {
        source = source.with_quote(quote);
    }
    query.set_data_source(Some(Arc::new(source)));

    let sql = if structural {
        query.generate_structural()
    } else {
        query.generate()
    };
    if sql.is_empty() {
        eprintln!("Nothing selected in '{}'", file.display());
        return ExitCode::FAILURE;
    }
    println!("{}", sql);
    ExitCode::SUCCESS
}

fn cmd_check(file: PathBuf) -> ExitCode {
    let query = match load_query(&file) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if query.contains_cross_joins() {
        println!("{}: contains cross joins", file.display());
        return ExitCode::FAILURE;
    }
    println!("OK: {} has no cross joins", file.display());
    ExitCode::SUCCESS
}

fn cmd_new(name: String) -> ExitCode {
    let document = QueryDocument::from_query(&Query::new(name));
    match document.to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}
