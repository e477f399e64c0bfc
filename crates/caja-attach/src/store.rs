//! [`GatewayObjectStore`] — put/delete-by-key against an S3-compatible HTTP
//! gateway.

use std::time::Duration;

use caja_core::{
  Error, Result,
  external::{DeleteOutcome, ObjectStore},
};
use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the object-store gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  /// Authenticated API endpoint, e.g. `https://storage.example.com`.
  pub endpoint:   String,
  /// Public root that issued object URLs hang off, path-style.
  pub public_url: String,
  pub bucket:     String,
  pub token:      String,
}

/// Async client for the object-store gateway.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Every call
/// carries the client-level timeout.
#[derive(Clone)]
pub struct GatewayObjectStore {
  http:   reqwest::Client,
  config: GatewayConfig,
}

impl GatewayObjectStore {
  pub fn new(config: GatewayConfig) -> Result<Self> {
    if config.token.is_empty() {
      return Err(Error::Config("object store token is empty".to_string()));
    }
    if config.bucket.is_empty() {
      return Err(Error::Config("object store bucket is empty".to_string()));
    }
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| Error::upstream("object store", e.to_string()))?;
    Ok(Self { http, config })
  }

  /// `{root}/{bucket}/{key}`, with each key segment percent-encoded.
  fn object_url(&self, root: &str, key: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(root)
      .map_err(|e| Error::Config(format!("bad object store url {root:?}: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|_| Error::Config(format!("object store url {root:?} cannot be a base")))?
      .push(&self.config.bucket)
      .extend(key.split('/'));
    Ok(url)
  }
}

impl ObjectStore for GatewayObjectStore {
  async fn put(
    &self,
    key: &str,
    bytes: Vec<u8>,
    content_type: &str,
  ) -> Result<String> {
    let resp = self
      .http
      .put(self.object_url(&self.config.endpoint, key)?)
      .bearer_auth(&self.config.token)
      .header(reqwest::header::CONTENT_TYPE, content_type)
      .body(bytes)
      .send()
      .await
      .map_err(|e| Error::upstream("object store", e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::upstream(
        "object store",
        format!("put {key:?} returned {status}"),
      ));
    }
    Ok(self.object_url(&self.config.public_url, key)?.to_string())
  }

  async fn delete(&self, key: &str) -> Result<DeleteOutcome> {
    let resp = self
      .http
      .delete(self.object_url(&self.config.endpoint, key)?)
      .bearer_auth(&self.config.token)
      .send()
      .await
      .map_err(|e| Error::upstream("object store", e.to_string()))?;

    // 204 is the gateway's "object removed"; a 404 means it was already
    // gone, which deletion callers treat as success-equivalent.
    Ok(match resp.status().as_u16() {
      200 | 204 => DeleteOutcome::Removed,
      404 => DeleteOutcome::Missing,
      other => DeleteOutcome::Unexpected(other),
    })
  }
}
