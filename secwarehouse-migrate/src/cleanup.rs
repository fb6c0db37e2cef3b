//! SEC warehouse schema cleanup CLI
//!
//! Drops every view and table in a schema. This is a full wipe, independent
//! of migration tracking - use with caution.

use anyhow::Context;
use clap::Parser;
use secwarehouse::{cleanup_schema, connect, WarehouseConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "secwarehouse-cleanup")]
#[command(about = "Drop all objects in a SEC warehouse schema")]
#[command(version)]
struct Cli {
    /// Path to JSON config file (default: config/snowflake.json; SNOWFLAKE_*
    /// environment variables override file values)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target schema (default: sec_raw, unless the config names one)
    #[arg(long)]
    schema: Option<String>,

    /// List the objects that would be dropped without dropping them
    #[arg(long)]
    dry_run: bool,

    /// Skip the interactive confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = WarehouseConfig::load(cli.config.as_deref())
        .context("failed to load warehouse configuration")?;
    if let Some(schema) = &cli.schema {
        config.schema = schema.clone();
    }

    if !cli.dry_run && !cli.yes {
        let prompt = format!(
            "WARNING: This will delete ALL objects in schema {}. Continue?",
            config.schema
        );
        if !confirm(&prompt)? {
            log::info!("Aborted.");
            return Ok(());
        }
    }

    let session = connect(&config).context("failed to connect to Snowflake")?;
    let report = cleanup_schema(&session, &config.schema, cli.dry_run)?;

    if report.executed {
        println!(
            "Cleanup complete: {} views and {} tables processed, {} drop(s) failed",
            report.views.len(),
            report.tables.len(),
            report.drop_errors
        );
    } else {
        println!(
            "Dry run: would drop {} view(s) and {} table(s) from {}",
            report.views.len(),
            report.tables.len(),
            config.schema
        );
    }

    Ok(())
}

/// Ask for confirmation; only a literal `yes` proceeds.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} (yes/no): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}
