//! `fse` server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP. The `ingest` subcommand converts
//! HL7 files from disk into the same store without starting a listener.
//!
//! ```text
//! fse --config config.toml serve
//! fse ingest lab/*.hl7
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fse_core::{
  memory::MemoryStore,
  store::{ObservationStore, SubjectStore},
};
use fse_ingest::ingest;
use fse_store_sqlite::SqliteStore;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "HL7 v2 to subject/observation converter")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Keep everything in memory instead of opening `store_path`.
  #[arg(long)]
  in_memory: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Ingest HL7 message files and print one JSON outcome per file.
  Ingest {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let command = cli.command.unwrap_or(Command::Serve);

  if cli.in_memory {
    tracing::warn!("using an in-memory store; nothing will be kept");
    return run(command, &cfg, MemoryStore::new()).await;
  }

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  run(command, &cfg, store).await
}

async fn run<S>(
  command: Command,
  cfg: &ServerConfig,
  store: S,
) -> anyhow::Result<()>
where
  S: SubjectStore + ObservationStore + 'static,
{
  match command {
    Command::Serve => serve(cfg, store).await,
    Command::Ingest { files } => ingest_files(cfg, &store, &files).await,
  }
}

async fn serve<S>(cfg: &ServerConfig, store: S) -> anyhow::Result<()>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let app = fse_api::api_router(Arc::new(store), cfg.ingest)
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn ingest_files<S>(
  cfg: &ServerConfig,
  store: &S,
  files: &[PathBuf],
) -> anyhow::Result<()>
where
  S: SubjectStore + ObservationStore,
{
  let mut failed = 0usize;
  for path in files {
    let text = tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read {path:?}"))?;
    let outcome = ingest(&text, &cfg.ingest, store).await;
    if !outcome.is_success() {
      failed += 1;
    }
    println!(
      "{}",
      json!({ "file": path.display().to_string(), "outcome": outcome })
    );
  }

  if failed > 0 {
    anyhow::bail!("{failed} of {} messages failed to ingest", files.len());
  }
  Ok(())
}
