//! `dossier` binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and either serves the HTTP API or runs a one-shot
//! maintenance command.
//!
//! ```text
//! dossier serve
//! dossier inspect 6f1c...        # reconciled documents vs. cached aggregate
//! dossier sync-all               # recompute every driver's aggregate
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dossier_core::engine::VerificationEngine;
use dossier_server::{ServerConfig, expand_tilde, load_config};
use dossier_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Dossier driver document verification")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print a driver's reconciled documents and aggregate as JSON.
  Inspect { driver_id: Uuid },
  /// Recompute and persist the aggregate of every driver.
  SyncAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config).context("failed to load configuration")?;
  let engine = Arc::new(open_engine(&server_cfg).await?);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(engine, &server_cfg).await,
    Command::Inspect { driver_id } => {
      let inspection = engine
        .inspect(driver_id)
        .await
        .with_context(|| format!("failed to inspect driver {driver_id}"))?;
      println!("{}", serde_json::to_string_pretty(&inspection)?);
      Ok(())
    }
    Command::SyncAll => {
      let report = engine.resync_all().await.context("fleet resync failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      if !report.failed.is_empty() {
        anyhow::bail!("{} driver(s) failed to sync", report.failed.len());
      }
      Ok(())
    }
  }
}

async fn open_engine(cfg: &ServerConfig) -> anyhow::Result<VerificationEngine<SqliteStore>> {
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok(VerificationEngine::new(Arc::new(store), cfg.engine.clone()))
}

async fn serve(
  engine: Arc<VerificationEngine<SqliteStore>>,
  cfg: &ServerConfig,
) -> anyhow::Result<()> {
  let app = dossier_server::app(engine);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}
