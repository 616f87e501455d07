//! jobboard server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and either serves the HTTP API or runs one
//! saved-search notification batch.
//!
//! ```text
//! jobboard serve
//! jobboard notify --dry-run
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use jobboard_core::notify::{LogNotifier, NotifyOptions, process_all_notifications};
use jobboard_server::{ServerConfig, expand_tilde};
use jobboard_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Job board matching server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,
  /// Notify recruiters about new candidates for every enabled saved search.
  Notify {
    /// Report what would be sent without recording or sending anything.
    #[arg(long)]
    dry_run: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);
  let notifier = Arc::new(LogNotifier);

  match cli.command {
    Command::Serve => {
      let app = jobboard_server::router(store, notifier);
      let address = server_cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Notify { dry_run } => {
      let options = NotifyOptions { now: Utc::now(), dry_run };
      let reports = process_all_notifications(&*store, &*notifier, options)
        .await
        .context("notification run failed")?;

      let created: usize = reports.iter().map(|r| r.created).sum();
      let failed: usize = reports.iter().map(|r| r.failed).sum();
      let pending: usize = reports.iter().map(|r| r.candidates.len()).sum();
      if dry_run {
        tracing::info!(searches = reports.len(), would_notify = pending, "dry run complete");
      } else {
        tracing::info!(searches = reports.len(), created, failed, "notification run complete");
      }
    }
  }

  Ok(())
}
