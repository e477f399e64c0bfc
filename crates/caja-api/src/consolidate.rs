//! The consolidation orchestrator: snapshot, notification, then — and only
//! then — persistence of the consolidation date.
//!
//! The whole sequence is a best-effort saga across three systems with no
//! shared transaction. Rendering and dispatch are the only fatal steps; a
//! failed snapshot upload or attachment fetch degrades the result and is
//! reported through `warnings`. Persisting last means a dispatch failure
//! leaves the advance Open and the operation safely retryable — the
//! opposite order could consolidate an advance nobody was told about.

use std::{sync::Arc, time::Duration};

use caja_core::{
  Result,
  advance::{Advance, AdvancePatch},
  aggregate::{self, ConsolidationAggregate},
  external::{
    AttachmentFetcher, MailAttachment, NotificationDispatcher, ObjectStore,
    OutboundMessage, SnapshotData, SnapshotRenderer,
  },
  store::LedgerStore,
};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet, time::timeout};

/// Concurrent attachment fetches per consolidation; keeps the fan-out
/// inside third-party rate limits.
const FETCH_WORKERS: usize = 4;
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConsolidationOutcome {
  pub advance:   Advance,
  pub aggregate: ConsolidationAggregate,
  /// Best-effort sub-steps that failed (snapshot upload, single fetches).
  pub warnings:  Vec<String>,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Consolidator<L, O, R, D, F> {
  ledger:             Arc<L>,
  objects:            Arc<O>,
  renderer:           Arc<R>,
  dispatcher:         Arc<D>,
  fetcher:            Arc<F>,
  default_recipients: Vec<String>,
  /// Key prefix for stored snapshot documents, inside the guarded prefix.
  snapshot_prefix:    String,
}

impl<L, O, R, D, F> Consolidator<L, O, R, D, F>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  pub fn new(
    ledger: Arc<L>,
    objects: Arc<O>,
    renderer: Arc<R>,
    dispatcher: Arc<D>,
    fetcher: Arc<F>,
    default_recipients: Vec<String>,
    storage_prefix: &str,
  ) -> Self {
    Self {
      ledger,
      objects,
      renderer,
      dispatcher,
      fetcher,
      default_recipients,
      snapshot_prefix: format!(
        "{}consolidaciones",
        ensure_trailing_slash(storage_prefix)
      ),
    }
  }

  /// Run the Open → Consolidated transition for `advance`, which the caller
  /// has already verified is Open. Two racing calls can both get here; the
  /// last persist wins and a duplicate notification is an accepted outcome.
  pub async fn run(
    &self,
    advance: Advance,
    recipients: Option<Vec<String>>,
    today: NaiveDate,
  ) -> Result<ConsolidationOutcome> {
    let items = self.ledger.items_for_advance(&advance.id).await?;
    let agg = aggregate::aggregate(&advance, &items);
    let data = SnapshotData { advance, items, aggregate: agg };

    // 1. Render. Fatal on failure: there is nothing to notify about.
    let document = self.renderer.render(&data)?;

    let mut warnings = Vec::new();

    // 2. Store the snapshot. Best-effort: the mail still carries the
    //    rendered bytes, the row just ends up without a document URL.
    let snapshot_key = format!("{}/{}", self.snapshot_prefix, document.file_name);
    let snapshot_url = match self
      .objects
      .put(&snapshot_key, document.bytes.clone(), &document.content_type)
      .await
    {
      Ok(url) => Some(url),
      Err(e) => {
        tracing::warn!(key = %snapshot_key, error = %e, "snapshot upload failed");
        warnings.push(format!("snapshot upload failed: {e}"));
        None
      }
    };

    // 3. Fetch every referenced attachment, best-effort per URL.
    let mut attachments = vec![MailAttachment {
      name:         document.file_name.clone(),
      content_type: document.content_type.clone(),
      bytes:        document.bytes,
    }];
    attachments
      .extend(self.fetch_attachments(attachment_sources(&data), &mut warnings).await);

    // 4. One notification carrying the summary and everything fetched.
    //    Fatal on failure: the advance stays Open and the caller retries.
    let message = OutboundMessage {
      subject: format!(
        "Consolidación Caja Menor — {}",
        data.advance.beneficiary
      ),
      html_body: caja_notify::render::summary_html(&data),
      recipients: recipients
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| self.default_recipients.clone()),
      attachments,
    };
    self.dispatcher.send(&message).await?;

    // 5. Persist the consolidation date only now.
    let patch = AdvancePatch {
      consolidated_on: Some(today),
      snapshot_url,
      ..AdvancePatch::default()
    };
    let updated = self.ledger.update_advance(&data.advance.id, patch).await?;

    tracing::info!(
      advance = %updated.id,
      items = agg.items_count,
      warnings = warnings.len(),
      "advance consolidated"
    );
    Ok(ConsolidationOutcome { advance: updated, aggregate: agg, warnings })
  }

  /// Fetch attachment bytes concurrently under a worker bound, collecting
  /// every outcome rather than failing fast.
  async fn fetch_attachments(
    &self,
    sources: Vec<(String, String)>,
    warnings: &mut Vec<String>,
  ) -> Vec<MailAttachment> {
    let semaphore = Arc::new(Semaphore::new(FETCH_WORKERS));
    let mut tasks = JoinSet::new();

    for (position, (name, url)) in sources.into_iter().enumerate() {
      let fetcher = Arc::clone(&self.fetcher);
      let semaphore = Arc::clone(&semaphore);
      tasks.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
          Ok(permit) => permit,
          Err(_) => return (position, name, url, Err("worker pool closed".to_string())),
        };
        let outcome = match timeout(FETCH_TIMEOUT, fetcher.fetch(&url)).await {
          Ok(Ok(bytes)) => Ok(bytes),
          Ok(Err(e)) => Err(e.to_string()),
          Err(_) => Err("timed out".to_string()),
        };
        (position, name, url, outcome)
      });
    }

    let mut fetched: Vec<(usize, MailAttachment)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok((position, name, _url, Ok(bytes))) => {
          let content_type = content_type_for(&name).to_string();
          fetched.push((position, MailAttachment { name, content_type, bytes }));
        }
        Ok((_, _, url, Err(message))) => {
          tracing::warn!(url, message, "attachment fetch failed; omitting from notification");
          warnings.push(format!("could not fetch {url}: {message}"));
        }
        Err(e) => warnings.push(format!("attachment fetch task failed: {e}")),
      }
    }

    fetched.sort_by_key(|(position, _)| *position);
    fetched.into_iter().map(|(_, attachment)| attachment).collect()
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The attachment URLs a consolidation references: the advance's supporting
/// document plus every item's proof of payment.
fn attachment_sources(data: &SnapshotData) -> Vec<(String, String)> {
  let mut sources = Vec::new();
  if let Some(url) = &data.advance.attachment_url {
    sources.push((file_name_from_url(url, "anticipo"), url.clone()));
  }
  for (index, item) in data.items.iter().enumerate() {
    if let Some(url) = &item.attachment_url {
      let fallback = format!("gasto-{}", index + 1);
      sources.push((file_name_from_url(url, &fallback), url.clone()));
    }
  }
  sources
}

fn file_name_from_url(url: &str, fallback: &str) -> String {
  url
    .split(['?', '#'])
    .next()
    .and_then(|path| path.rsplit('/').next())
    .filter(|segment| !segment.is_empty() && !segment.contains(':'))
    .map(str::to_string)
    .unwrap_or_else(|| fallback.to_string())
}

fn content_type_for(name: &str) -> &'static str {
  match name.rsplit('.').next() {
    Some("pdf") => "application/pdf",
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("html") => "text/html; charset=utf-8",
    _ => "application/octet-stream",
  }
}

fn ensure_trailing_slash(prefix: &str) -> String {
  if prefix.ends_with('/') {
    prefix.to_string()
  } else {
    format!("{prefix}/")
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
