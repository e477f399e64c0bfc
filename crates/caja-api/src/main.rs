//! Caja Menor ledger server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), connects the
//! record-store, object-store, and mail clients, and serves the ledger JSON
//! API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use caja_api::{AppState, ServerConfig};
use caja_attach::{AttachmentManager, GatewayObjectStore, KeyResolver};
use caja_notify::{HtmlSnapshotRenderer, HttpAttachmentFetcher, MailApiDispatcher};
use caja_store_airtable::{AirtableLedger, RecordsClient};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Caja Menor ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CAJA").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Record store.
  let records = RecordsClient::new(server_cfg.records.clone())
    .context("failed to build record store client")?;
  let ledger = Arc::new(AirtableLedger::new(records, server_cfg.tables.clone()));

  // Object store and attachment cleanup.
  let objects = Arc::new(
    GatewayObjectStore::new(server_cfg.storage.clone())
      .context("failed to build object store client")?,
  );
  let attachments = Arc::new(AttachmentManager::new(
    Arc::clone(&objects),
    KeyResolver::new(server_cfg.storage.bucket.clone()),
    server_cfg.storage_prefix.clone(),
  ));

  // Outbound side effects.
  let dispatcher = Arc::new(
    MailApiDispatcher::new(server_cfg.mail.clone())
      .context("failed to build mail client")?,
  );
  let fetcher = Arc::new(
    HttpAttachmentFetcher::new().context("failed to build attachment fetcher")?,
  );

  // Orchestrators.
  let consolidator = Arc::new(caja_api::consolidate::Consolidator::new(
    Arc::clone(&ledger),
    Arc::clone(&objects),
    Arc::new(HtmlSnapshotRenderer),
    dispatcher,
    fetcher,
    server_cfg.default_recipients.clone(),
    &server_cfg.storage_prefix,
  ));
  let cascade = Arc::new(caja_api::cascade::CascadeDeleter::new(
    Arc::clone(&ledger),
    Arc::clone(&attachments),
  ));

  // Build application state.
  let state = AppState {
    ledger,
    attachments,
    consolidator,
    cascade,
    limiter: Arc::new(caja_api::limit::RateLimiter::from_config(
      &server_cfg.rate_limit,
    )),
  };

  let app = caja_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
