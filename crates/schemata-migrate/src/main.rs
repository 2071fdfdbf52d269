//! schemata CLI
//!
//! Compares entity descriptors with a database and prints or applies the
//! migration SQL.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use schemata_migrate::prelude::*;

/// Schema comparison and migration generation for entity-mapped databases.
#[derive(Parser)]
#[command(name = "schemata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Entity descriptor file (JSON).
    #[arg(short, long, env = "SCHEMATA_ENTITIES")]
    entities: Option<PathBuf>,

    /// Target dialect: mysql, postgres or sqlite.
    #[arg(long, default_value = "sqlite")]
    dialect: DialectKind,

    /// Live schema snapshot (JSON) to compare against instead of the database.
    #[arg(short, long)]
    live: Option<PathBuf>,

    /// Keep live tables no entity declares instead of dropping them.
    #[arg(long)]
    keep_orphans: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL bringing the database in line with the entities.
    Plan {
        /// Print the rollback SQL instead.
        #[arg(short, long)]
        rollback: bool,

        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Exit with an error when the database is out of date.
    Check,

    /// Apply the plan and record it in the history table (SQLite only).
    Apply {
        /// Name recorded for this run.
        #[arg(short, long)]
        name: String,
    },

    /// List executed migrations.
    History,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Plan { rollback, json } => {
            let plan = plan(&cli).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else if plan.is_empty() {
                info!("Schema is up to date.");
            } else if *rollback {
                println!("{}", plan.down_sql());
            } else {
                println!("{}", plan.up_sql());
            }
        }

        Commands::Check => {
            let plan = plan(&cli).await?;
            if !plan.is_empty() {
                for entry in &plan.entries {
                    println!(" [{:?}] {}", entry.operation, entry.table);
                }
                bail!("{} table(s) out of date", plan.entries.len());
            }
            info!("Schema is up to date.");
        }

        Commands::Apply { name } => {
            if cli.dialect != DialectKind::Sqlite || cli.live.is_some() {
                bail!("apply only runs against a SQLite database");
            }
            let plan = plan(&cli).await?;
            let executor = PlanExecutor::new(connect(&cli.database).await?);
            executor.init().await?;
            if plan.is_empty() {
                info!("Schema is up to date, nothing to apply.");
            } else if executor.apply(name, &plan).await? {
                info!("Applied {} change(s) as '{name}'.", plan.entries.len());
            }
        }

        Commands::History => {
            let history = MigrationHistory::new(connect(&cli.database).await?);
            history.ensure_table().await?;
            let executed = history.executed().await?;

            if executed.is_empty() {
                info!("No migrations have been executed yet.");
            } else {
                println!("\nExecuted migrations:");
                println!("{:-<60}", "");
                for migration in &executed {
                    println!(
                        " [X] {} ({}, {} ms)",
                        migration.name,
                        migration.executed_at.format("%Y-%m-%d %H:%M:%S"),
                        migration.running_time
                    );
                }
                println!();
            }
        }
    }

    Ok(())
}

async fn connect(database: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database)
        .await
        .with_context(|| format!("connecting to {database}"))?;
    Ok(pool)
}

async fn plan(cli: &Cli) -> anyhow::Result<MigrationPlan> {
    let entities = cli
        .entities
        .as_deref()
        .context("an entity descriptor file is required (--entities or SCHEMATA_ENTITIES)")?;
    let (registry, morph_map) = load_entities(entities)?;

    let live = match &cli.live {
        Some(path) => load_live(path)?,
        None if cli.dialect == DialectKind::Sqlite => {
            SqliteIntrospector::new(connect(&cli.database).await?)
                .snapshot()
                .await?
        }
        None => bail!("reading a live {} database requires --live <snapshot.json>", cli.dialect),
    };

    let mut options = ComparatorOptions::new();
    if cli.keep_orphans {
        options = options.keep_orphaned_tables();
    }
    Ok(build_plan(&registry, morph_map, cli.dialect, &live, options)?)
}
