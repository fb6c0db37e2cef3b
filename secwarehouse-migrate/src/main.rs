//! SEC warehouse migration CLI
//!
//! Applies pending SQL migrations to the Snowflake schema in timestamp
//! order, tracks them in `schema_migrations`, and rolls single migrations
//! back by dropping the objects their DDL creates.

use anyhow::Context;
use clap::Parser;
use secwarehouse::migration::{Migrator, RollbackTarget, SqlTrackingStore};
use secwarehouse::{connect, WarehouseConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "secwarehouse-migrate")]
#[command(about = "Deploy SEC warehouse schema migrations to Snowflake")]
#[command(version)]
struct Cli {
    /// Directory containing migration files
    #[arg(long, default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Path to JSON config file (default: config/snowflake.json; SNOWFLAKE_*
    /// environment variables override file values)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target schema (default: sec_raw, unless the config names one)
    #[arg(long)]
    schema: Option<String>,

    /// Compute and print planned work without executing any SQL
    #[arg(long)]
    dry_run: bool,

    /// Apply only the single next pending migration
    #[arg(long, conflicts_with_all = ["rollback_one", "rollback"])]
    migrate_one: bool,

    /// Roll back the most recently applied migration
    #[arg(long, conflicts_with = "rollback")]
    rollback_one: bool,

    /// Roll back one named migration (e.g. 202512221000__create_submissions.sql)
    #[arg(long, value_name = "NAME")]
    rollback: Option<String>,

    /// Skip interactive confirmation prompts
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
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let mut config = WarehouseConfig::load(cli.config.as_deref())
        .context("failed to load warehouse configuration")?;
    if let Some(schema) = &cli.schema {
        config.schema = schema.clone();
    }

    let session = connect(&config).context("failed to connect to Snowflake")?;
    let migrator = Migrator::new(&cli.migrations_dir, &config.schema);
    let store = SqlTrackingStore::new(&session, &config.schema);

    if cli.rollback_one || cli.rollback.is_some() {
        let (target, describe) = match &cli.rollback {
            Some(name) => (
                RollbackTarget::Named(name.as_str()),
                format!("migration '{name}'"),
            ),
            None => (RollbackTarget::Latest, "the most recent migration".to_string()),
        };

        if !cli.dry_run && !cli.yes {
            let prompt = format!(
                "WARNING: This will drop the objects created by {describe} \
                 in schema {}. Continue?",
                config.schema
            );
            if !confirm(&prompt)? {
                log::info!("Aborted.");
                return Ok(0);
            }
        }

        let plan = migrator.rollback(&session, &store, target, cli.dry_run)?;

        if plan.executed {
            println!(
                "Rolled back {} ({} objects dropped, {} failed)",
                plan.migration,
                plan.drops.len() - plan.drop_errors,
                plan.drop_errors
            );
        } else {
            println!("Would roll back {}:", plan.migration);
            for object in &plan.drops {
                println!("  DROP {} IF EXISTS {}", object.kind, object.name);
            }
        }
        return Ok(0);
    }

    let summary = migrator.apply_all(&session, &store, cli.dry_run, cli.migrate_one)?;

    if cli.dry_run {
        println!(
            "Dry run: {} migration(s) would be applied, {} already up to date",
            summary.applied, summary.skipped
        );
        return Ok(0);
    }

    println!(
        "Applied {} migration(s), {} skipped, {} failed",
        summary.applied, summary.skipped, summary.failed
    );

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

/// Ask for confirmation; only a literal `yes` proceeds.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} (yes/no): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}
