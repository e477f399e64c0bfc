//! [`KeyResolver`] — derives an object-store key from a previously issued
//! object-store URL.
//!
//! Three URL shapes have historically pointed at the bucket:
//!
//! 1. virtual-hosted with region — `https://{bucket}.s3.{region}.amazonaws.com/{key}`
//! 2. virtual-hosted without region — `https://{bucket}.s3.amazonaws.com/{key}`
//! 3. path-style — `https://s3[.{region}].amazonaws.com/{bucket}/{key}`
//!
//! The matchers are tried in that order. "No match" is an expected, common
//! outcome — record-store-native attachment URLs land here — so the result
//! is an `Option`, never an error. Resolved keys are percent-decoded to
//! recover spaces and unicode.

use percent_encoding::percent_decode_str;
use url::Url;

/// Resolves URLs for one configured bucket. URLs pointing at any other host
/// or bucket are "not ours".
#[derive(Debug, Clone)]
pub struct KeyResolver {
  bucket: String,
}

impl KeyResolver {
  pub fn new(bucket: impl Into<String>) -> Self {
    Self { bucket: bucket.into() }
  }

  /// `Some(key)` when `url` addresses this bucket through any supported
  /// shape; `None` otherwise. Never panics on malformed input.
  pub fn resolve(&self, url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
      return None;
    }
    let host = parsed.host_str()?;
    let path = parsed.path().strip_prefix('/')?;

    self
      .virtual_hosted(host, path)
      .or_else(|| self.path_style(host, path))
  }

  /// Shapes 1 and 2: the bucket is the leading host label.
  fn virtual_hosted(&self, host: &str, path: &str) -> Option<String> {
    let service = host.strip_prefix(&self.bucket)?.strip_prefix('.')?;
    if !is_storage_host(service) {
      return None;
    }
    decode_key(path)
  }

  /// Shape 3: the bucket is the leading path segment.
  fn path_style(&self, host: &str, path: &str) -> Option<String> {
    if !is_storage_host(host) {
      return None;
    }
    let key = path.strip_prefix(&self.bucket)?.strip_prefix('/')?;
    decode_key(key)
  }
}

/// `s3.amazonaws.com`, with or without an interior region label.
fn is_storage_host(host: &str) -> bool {
  let Some(rest) = host.strip_prefix("s3") else {
    return false;
  };
  match rest.strip_prefix('.') {
    Some("amazonaws.com") => true,
    Some(regional) => regional
      .strip_suffix(".amazonaws.com")
      .is_some_and(|region| !region.is_empty() && !region.contains('.')),
    None => false,
  }
}

fn decode_key(encoded: &str) -> Option<String> {
  if encoded.is_empty() {
    return None;
  }
  percent_decode_str(encoded)
    .decode_utf8()
    .ok()
    .map(|key| key.into_owned())
}
