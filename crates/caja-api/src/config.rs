//! Runtime server configuration, deserialised from `config.toml` with
//! `CAJA_`-prefixed environment overrides.

use caja_attach::GatewayConfig;
use caja_notify::MailConfig;
use caja_store_airtable::{LedgerTables, RecordsConfig};
use serde::Deserialize;

use crate::limit::RateLimitConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,

  /// Record store connection (API root, base id, bearer token).
  pub records: RecordsConfig,
  /// Table names in the hosted base.
  pub tables:  LedgerTables,

  /// Object-store gateway connection.
  pub storage: GatewayConfig,
  /// Logical key prefix owned by this subsystem. Attachment deletions are
  /// refused outside it, and consolidation snapshots are stored under it.
  #[serde(default = "default_storage_prefix")]
  pub storage_prefix: String,

  /// Mail API connection.
  pub mail: MailConfig,
  /// Recipients used when a consolidation request supplies none.
  pub default_recipients: Vec<String>,

  pub rate_limit: RateLimitConfig,
}

fn default_storage_prefix() -> String { "caja_menor/".to_string() }
