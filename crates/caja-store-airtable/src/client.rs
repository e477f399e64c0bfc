//! [`RecordsClient`] — the wire-level client for the hosted tabular API.
//!
//! Rows are `{id, createdTime, fields}` envelopes; fields are addressed by
//! human-readable name, so the JSON payloads here are plain maps. Writes of
//! `null` clear a field. Batch endpoints accept at most
//! [`DESTROY_BATCH_LIMIT`] records per call.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{Error, Result};

/// The API accepts at most this many records per create or destroy call.
pub const DESTROY_BATCH_LIMIT: usize = 10;

/// Rows fetched per query page.
const PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the record store.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
  /// API root, e.g. `https://api.airtable.com/v0`.
  pub api_url: String,
  /// The base (database) identifier.
  pub base_id: String,
  /// Bearer token.
  pub token:   String,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One stored row as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
  pub id:     String,
  #[serde(default)]
  pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
  records: Vec<RawRecord>,
  /// Opaque continuation token; present while more pages remain.
  offset:  Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
  Ascending,
  Descending,
}

impl SortDirection {
  fn as_param(self) -> &'static str {
    match self {
      Self::Ascending => "asc",
      Self::Descending => "desc",
    }
  }
}

/// Parameters for [`RecordsClient::query`].
#[derive(Debug, Clone, Default)]
pub struct Query {
  pub filter_formula: Option<String>,
  pub sort:           Option<(String, SortDirection)>,
  pub max_records:    Option<u32>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the record store.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Every
/// request carries the client-level timeout; no call blocks indefinitely.
#[derive(Clone)]
pub struct RecordsClient {
  http:   reqwest::Client,
  config: RecordsConfig,
}

impl RecordsClient {
  pub fn new(config: RecordsConfig) -> Result<Self> {
    if config.token.is_empty() {
      return Err(Error::Config("record store token is empty".to_string()));
    }
    if config.base_id.is_empty() {
      return Err(Error::Config("record store base id is empty".to_string()));
    }
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    Ok(Self { http, config })
  }

  /// URL for a table, with the table name percent-encoded as a path segment.
  fn table_url(&self, table: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(&self.config.api_url)
      .map_err(|e| Error::Config(format!("bad api_url: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|_| Error::Config("api_url cannot be a base".to_string()))?
      .push(&self.config.base_id)
      .push(table);
    Ok(url)
  }

  fn record_url(&self, table: &str, id: &str) -> Result<reqwest::Url> {
    let mut url = self.table_url(table)?;
    url
      .path_segments_mut()
      .map_err(|_| Error::Config("api_url cannot be a base".to_string()))?
      .push(id);
    Ok(url)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.bearer_auth(&self.config.token)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// `GET /{base}/{table}/{id}`. Returns `None` on 404.
  pub async fn find(&self, table: &str, id: &str) -> Result<Option<RawRecord>> {
    let resp = self
      .auth(self.http.get(self.record_url(table, id)?))
      .send()
      .await?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let resp = check(resp).await?;
    Ok(Some(resp.json().await?))
  }

  /// `GET /{base}/{table}` with formula/sort params, following the opaque
  /// `offset` token until the result set is exhausted.
  pub async fn query(&self, table: &str, query: &Query) -> Result<Vec<RawRecord>> {
    let url = self.table_url(table)?;

    let mut params: Vec<(String, String)> =
      vec![("pageSize".to_string(), PAGE_SIZE.to_string())];
    if let Some(formula) = &query.filter_formula {
      params.push(("filterByFormula".to_string(), formula.clone()));
    }
    if let Some((field, direction)) = &query.sort {
      params.push(("sort[0][field]".to_string(), field.clone()));
      params
        .push(("sort[0][direction]".to_string(), direction.as_param().to_string()));
    }
    if let Some(max) = query.max_records {
      params.push(("maxRecords".to_string(), max.to_string()));
    }

    let mut records = Vec::new();
    let mut offset: Option<String> = None;
    loop {
      let mut req = self.auth(self.http.get(url.clone())).query(&params);
      if let Some(token) = &offset {
        req = req.query(&[("offset", token)]);
      }
      let resp = check(req.send().await?).await?;
      let page: RecordsPage = resp.json().await?;
      records.extend(page.records);
      match page.offset {
        Some(token) => offset = Some(token),
        None => break,
      }
    }
    Ok(records)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// `POST /{base}/{table}` with a single `fields` map.
  pub async fn create(
    &self,
    table: &str,
    fields: Map<String, Value>,
  ) -> Result<RawRecord> {
    let resp = self
      .auth(self.http.post(self.table_url(table)?))
      .json(&json!({ "fields": fields, "typecast": true }))
      .send()
      .await?;
    Ok(check(resp).await?.json().await?)
  }

  /// Batch create, split into store-sized chunks. Returns rows in input
  /// order.
  pub async fn create_batch(
    &self,
    table: &str,
    fields: Vec<Map<String, Value>>,
  ) -> Result<Vec<RawRecord>> {
    let mut out = Vec::with_capacity(fields.len());
    for chunk in fields.chunks(DESTROY_BATCH_LIMIT) {
      let records: Vec<Value> =
        chunk.iter().map(|f| json!({ "fields": f })).collect();
      let resp = self
        .auth(self.http.post(self.table_url(table)?))
        .json(&json!({ "records": records, "typecast": true }))
        .send()
        .await?;
      let page: RecordsPage = check(resp).await?.json().await?;
      out.extend(page.records);
    }
    Ok(out)
  }

  /// `PATCH /{base}/{table}/{id}`. A stale id surfaces as
  /// [`Error::RecordNotFound`].
  pub async fn update(
    &self,
    table: &str,
    id: &str,
    fields: Map<String, Value>,
  ) -> Result<RawRecord> {
    let resp = self
      .auth(self.http.patch(self.record_url(table, id)?))
      .json(&json!({ "fields": fields, "typecast": true }))
      .send()
      .await?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Err(Error::RecordNotFound {
        table: table.to_string(),
        id:    id.to_string(),
      });
    }
    Ok(check(resp).await?.json().await?)
  }

  /// Destroy rows, batching per the store's limit. A stale id surfaces as
  /// [`Error::RecordNotFound`].
  pub async fn destroy(&self, table: &str, ids: &[String]) -> Result<()> {
    for chunk in ids.chunks(DESTROY_BATCH_LIMIT) {
      let resp = if let [id] = chunk {
        self
          .auth(self.http.delete(self.record_url(table, id)?))
          .send()
          .await?
      } else {
        let params: Vec<(&str, &str)> =
          chunk.iter().map(|id| ("records[]", id.as_str())).collect();
        self
          .auth(self.http.delete(self.table_url(table)?))
          .query(&params)
          .send()
          .await?
      };

      if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::RecordNotFound {
          table: table.to_string(),
          id:    chunk.join(","),
        });
      }
      check(resp).await?;
    }
    Ok(())
  }
}

/// Turn a non-success response into [`Error::Status`], keeping the body for
/// the caller's log line.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Status { status: status.as_u16(), body })
}
