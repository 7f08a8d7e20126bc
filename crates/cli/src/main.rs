//! `incident-desk` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`         start the REST API server.
//! - `migrate`       run pending database migrations.
//! - `check-payload` validate an incident payload JSON file offline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use db::{IncidentStore, MySqlIncidentStore};
use engine::{IncidentCreator, IncidentPayload, WorkflowConfig};

#[derive(Parser)]
#[command(
    name = "incident-desk",
    about = "Fire/EMS incident management backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
        max_connections: u32,
        /// Upper bound for one incident creation transaction.
        #[arg(long, env = "TRANSACTION_TIMEOUT_MS", default_value_t = 10_000)]
        transaction_timeout_ms: u64,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate an incident payload JSON file without touching the database.
    CheckPayload {
        /// Path to the payload JSON file.
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database_url, max_connections, transaction_timeout_ms } => {
            info!("Starting API server on {bind}");
            let pool = db::pool::create_pool(&database_url, max_connections)
                .await
                .context("failed to connect to database")?;

            let store: Arc<dyn IncidentStore> = Arc::new(MySqlIncidentStore::new(pool));
            let config = WorkflowConfig {
                transaction_timeout: Duration::from_millis(transaction_timeout_ms),
                ..WorkflowConfig::default()
            };
            let creator = IncidentCreator::new(Arc::clone(&store), config);

            api::serve(&bind, api::AppState::new(store, creator))
                .await
                .context("API server failed")?;
        }
        Command::Migrate { database_url } => {
            info!("Running migrations");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::CheckPayload { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read file {}", path.display()))?;
            let payload: IncidentPayload =
                serde_json::from_str(&content).context("invalid JSON")?;

            match payload.validate() {
                Ok(valid) => {
                    println!(
                        "Payload is valid: {} / {} priority, {} crew member(s)",
                        valid.incident.incident_type,
                        valid.incident.priority,
                        valid.crew.len()
                    );
                }
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
