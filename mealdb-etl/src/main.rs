//! mealdb - recipe ETL command line
//!
//! Subcommands:
//! - `db init` / `db stats` / `db delete <id>`
//! - `etl full` / `etl incremental` / `etl search <term>`
//! - `dashboard`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mealdb_common::config::{load_config, ConfigOverrides, StorageEngine, TomlConfig};
use mealdb_etl::fetcher::{MealDbClient, SearchType};
use mealdb_etl::models::RunStatus;
use mealdb_etl::{build_router, shutdown_signal, AppState, Pipeline, Repository, RunOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default draw count for `etl incremental`
const DEFAULT_INCREMENTAL_COUNT: usize = 5;

/// Recent runs shown by `db stats`
const STATS_LOG_LIMIT: i64 = 5;

/// Command-line arguments for mealdb
#[derive(Parser, Debug)]
#[command(name = "mealdb")]
#[command(about = "Recipe ETL: TheMealDB into SQLite or MySQL")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("MEALDB_GIT_HASH"), ")"))]
struct Args {
    /// Config file (default: ./mealdb.toml, then the user config dir)
    #[arg(long, global = true, env = "MEALDB_CONFIG")]
    config: Option<PathBuf>,

    /// Storage engine: sqlite or mysql
    #[arg(long, global = true)]
    engine: Option<StorageEngine>,

    /// SQLite database file
    #[arg(long, global = true)]
    sqlite_path: Option<PathBuf>,

    /// Default random draw count for full loads
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Pipeline runs
    Etl {
        #[command(subcommand)]
        command: EtlCommand,
    },
    /// Serve the web dashboard
    Dashboard {
        /// Listen address
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// Create the schema
    Init,
    /// Show entity counts and recent runs
    Stats,
    /// Delete one meal and its ingredient lines
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum EtlCommand {
    /// Reference data plus random meals, upserting every one
    Full {
        /// Number of random meals (default: configured batch size)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Random meals, skipping those already stored
    Incremental {
        #[arg(long, default_value_t = DEFAULT_INCREMENTAL_COUNT)]
        count: usize,
    },
    /// Search and load matching meals
    Search {
        term: String,
        /// name, letter, category, area or ingredient
        #[arg(long = "type", default_value = "name")]
        search_type: SearchType,
        /// Skip meals already stored
        #[arg(long)]
        incremental: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&ConfigOverrides {
        config_path: args.config.clone(),
        engine: args.engine,
        sqlite_path: args.sqlite_path.clone(),
        batch_size: args.batch_size,
        log_level: args.log_level.clone(),
        dashboard_bind: match &args.command {
            Command::Dashboard { bind } => bind.clone(),
            _ => None,
        },
    })
    .context("Failed to load configuration")?;

    // Initialize tracing: RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "mealdb {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("MEALDB_GIT_HASH"),
        env!("MEALDB_BUILD_TIMESTAMP")
    );

    let repository = Repository::open(&config.database)
        .await
        .context("Failed to open database")?;

    let result = run_command(args.command, &config, repository.clone()).await;

    repository.close().await;
    result
}

async fn run_command(command: Command, config: &TomlConfig, repository: Repository) -> Result<()> {
    match command {
        Command::Db { command } => match command {
            DbCommand::Init => {
                println!(
                    "Database schema initialized ({})",
                    config.database.display_target()
                );
                for table in repository.schema_summary().await? {
                    println!("  {:<12} {} columns", table.name, table.columns.len());
                }
            }
            DbCommand::Stats => print_stats(&repository).await?,
            DbCommand::Delete { id } => {
                if repository.delete_meal(&id).await? {
                    println!("Deleted meal {}", id);
                } else {
                    bail!("Meal {} not found", id);
                }
            }
        },

        Command::Etl { command } => {
            let source = MealDbClient::new(&config.api)?;
            let pipeline = Pipeline::new(Arc::new(source), repository);

            let outcome = match command {
                EtlCommand::Full { count } => {
                    let count = count.unwrap_or(config.etl.batch_size);
                    println!("Running full load with {} meals...", count);
                    pipeline.run_full_load(count).await?
                }
                EtlCommand::Incremental { count } => {
                    println!("Running incremental load with {} meals...", count);
                    pipeline.run_incremental(count).await?
                }
                EtlCommand::Search {
                    term,
                    search_type,
                    incremental,
                } => {
                    println!("Searching meals by {}: {}", search_type, term);
                    if incremental {
                        pipeline.run_incremental_search(&term, search_type).await?
                    } else {
                        pipeline.run_search(&term, search_type).await?
                    }
                }
            };

            print_outcome(&outcome);
            if outcome.status == RunStatus::Failure {
                bail!("Run failed: {}", outcome.stats.error_summary().unwrap_or_default());
            }
        }

        Command::Dashboard { .. } => {
            let source = MealDbClient::new(&config.api)?;
            let pipeline = Pipeline::new(Arc::new(source), repository);
            let app = build_router(AppState::new(pipeline));

            let listener = tokio::net::TcpListener::bind(&config.dashboard.bind)
                .await
                .with_context(|| format!("Failed to bind {}", config.dashboard.bind))?;
            info!("Listening on http://{}", config.dashboard.bind);
            info!("Health check: http://{}/health", config.dashboard.bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Dashboard shutdown complete");
        }
    }

    Ok(())
}

async fn print_stats(repository: &Repository) -> Result<()> {
    let counts = repository.get_stats().await?;

    println!("{}", "=".repeat(40));
    println!("DATABASE STATISTICS");
    println!("{}", "=".repeat(40));
    println!("Meals:       {}", counts.meals);
    println!("Ingredients: {}", counts.ingredients);
    println!("Categories:  {}", counts.categories);
    println!("Areas:       {}", counts.areas);
    println!("ETL runs:    {}", counts.etl_logs);
    println!("{}", "=".repeat(40));

    let logs = repository.recent_logs(STATS_LOG_LIMIT).await?;
    if !logs.is_empty() {
        println!("\nRecent ETL operations:");
        println!("{}", "-".repeat(40));
        for log in logs {
            println!(
                "[{}] {} - {} records - {:.2}s - {}",
                log.entry.status,
                log.entry.operation,
                log.entry.records_processed,
                log.entry.execution_time,
                log.created_at
            );
        }
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!(
        "{} {} in {:.2}s (log #{})",
        outcome.operation, outcome.status, outcome.elapsed_secs, outcome.log_id
    );
    println!("  {}", outcome.stats.display_string());
    if outcome.stats.categories_synced > 0 || outcome.stats.areas_synced > 0 {
        println!(
            "  reference data: {} categories, {} areas",
            outcome.stats.categories_synced, outcome.stats.areas_synced
        );
    }
    if let Some(summary) = outcome.stats.error_summary() {
        println!("  errors: {}", summary);
    }
}
