//! [`HttpAttachmentFetcher`] — pulls attachment bytes for inclusion in a
//! notification.

use std::time::Duration;

use caja_core::{
  Error, Result,
  external::AttachmentFetcher,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GET-by-URL fetcher. Works against both object-store URLs and the record
/// store's native attachment hosting. Cheap to clone.
#[derive(Clone)]
pub struct HttpAttachmentFetcher {
  http: reqwest::Client,
}

impl HttpAttachmentFetcher {
  pub fn new() -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| Error::upstream("attachment fetch", e.to_string()))?;
    Ok(Self { http })
  }
}

impl AttachmentFetcher for HttpAttachmentFetcher {
  async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    let resp = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| Error::upstream("attachment fetch", e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::upstream(
        "attachment fetch",
        format!("GET {url} returned {status}"),
      ));
    }
    let bytes = resp
      .bytes()
      .await
      .map_err(|e| Error::upstream("attachment fetch", e.to_string()))?;
    Ok(bytes.to_vec())
  }
}
