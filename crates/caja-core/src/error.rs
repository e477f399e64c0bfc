//! Error types for `caja-core`.
//!
//! The variants mirror how failures propagate: `Config` and `Render` abort
//! before any side effect, `NotFound` maps to a non-retryable 404, and
//! `Upstream` covers every remote-store failure status. Best-effort failures
//! (attachment cleanup, snapshot upload, attachment fetches) are not errors
//! at this level at all — they are accumulated into operation summaries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(String),

  #[error("{table} record not found: {id}")]
  NotFound { table: String, id: String },

  #[error("{service} request failed: {message}")]
  Upstream { service: String, message: String },

  #[error("could not decode {what}: {message}")]
  Decode { what: String, message: String },

  #[error("snapshot rendering failed: {0}")]
  Render(String),
}

impl Error {
  pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
    Self::NotFound { table: table.into(), id: id.into() }
  }

  pub fn upstream(
    service: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Upstream { service: service.into(), message: message.into() }
  }

  pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Decode { what: what.into(), message: message.into() }
  }

  /// Whether this error is a stale-id lookup, as opposed to a store fault.
  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
