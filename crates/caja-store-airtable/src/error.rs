//! Error type for `caja-store-airtable`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(String),

  #[error("http transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("record store returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("{table} record not found: {id}")]
  RecordNotFound { table: String, id: String },

  #[error("could not decode {what}: {message}")]
  Decode { what: String, message: String },
}

impl Error {
  pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Decode { what: what.into(), message: message.into() }
  }
}

/// Map into the core taxonomy: stale ids stay `NotFound` (404-equivalent,
/// never retried), everything else is an upstream record-store failure.
impl From<Error> for caja_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Config(msg) => caja_core::Error::Config(msg),
      Error::RecordNotFound { table, id } => {
        caja_core::Error::not_found(table, id)
      }
      Error::Decode { what, message } => caja_core::Error::decode(what, message),
      other => caja_core::Error::upstream("record store", other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
