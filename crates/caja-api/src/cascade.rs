//! The cascade deletion orchestrator: items, their attachments, the
//! advance's own attachments, then the advance row — in that order, so a
//! mid-cascade failure always leaves the advance row behind as the marker
//! of incomplete cleanup. Nothing rolls back; neither store offers
//! compensation.

use std::sync::Arc;

use caja_attach::AttachmentManager;
use caja_core::{
  Error, RecordId, Result,
  external::ObjectStore,
  store::LedgerStore,
};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

/// Concurrent attachment deletions per cascade. Attachment deletions are
/// never batched — each needs its own key resolution and failure isolation.
const CLEANUP_WORKERS: usize = 4;

/// What one cascade actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
  pub items_deleted:       usize,
  pub attachments_deleted: usize,
  pub attachments_failed:  usize,
}

pub struct CascadeDeleter<L, O> {
  ledger:      Arc<L>,
  attachments: Arc<AttachmentManager<O>>,
}

impl<L, O> CascadeDeleter<L, O>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
{
  pub fn new(ledger: Arc<L>, attachments: Arc<AttachmentManager<O>>) -> Self {
    Self { ledger, attachments }
  }

  /// Delete an advance and everything it owns.
  ///
  /// Attachment failures are accumulated, never fatal. A row-deletion
  /// failure aborts before the advance row is touched: the advance row is
  /// never absent while item rows remain.
  pub async fn run(&self, id: &RecordId) -> Result<CascadeSummary> {
    let advance = self
      .ledger
      .get_advance(id)
      .await?
      .ok_or_else(|| Error::not_found("advance", id.as_str()))?;

    // The Items table's own link field is authoritative; the advance's
    // cached link list can be stale.
    let items = self.ledger.items_for_advance(id).await?;

    let mut summary = CascadeSummary::default();

    // Item attachments first, concurrently, each outcome isolated.
    let item_urls: Vec<String> =
      items.iter().filter_map(|i| i.attachment_url.clone()).collect();
    let (deleted, failed) = self.release_all(item_urls).await;
    summary.attachments_deleted += deleted;
    summary.attachments_failed += failed;

    // Item rows as one batched call. On failure the advance row survives.
    let item_ids: Vec<RecordId> = items.into_iter().map(|i| i.id).collect();
    self.ledger.delete_item_rows(&item_ids).await?;
    summary.items_deleted = item_ids.len();

    // The advance's own objects: supporting document and any stored
    // consolidation snapshot.
    for url in [&advance.attachment_url, &advance.snapshot_url] {
      match self.attachments.release(url.as_deref()).await {
        outcome if outcome.failed() => summary.attachments_failed += 1,
        caja_attach::ReleaseOutcome::Released => summary.attachments_deleted += 1,
        _ => {}
      }
    }

    // The advance row last.
    self.ledger.delete_advance_row(id).await?;

    tracing::info!(
      advance = %id,
      items = summary.items_deleted,
      attachments = summary.attachments_deleted,
      failed = summary.attachments_failed,
      "advance cascade deleted"
    );
    Ok(summary)
  }

  /// Release a set of attachment URLs under a worker bound, collecting all
  /// outcomes. Returns `(deleted, failed)`.
  async fn release_all(&self, urls: Vec<String>) -> (usize, usize) {
    let semaphore = Arc::new(Semaphore::new(CLEANUP_WORKERS));
    let mut tasks = JoinSet::new();

    for url in urls {
      let attachments = Arc::clone(&self.attachments);
      let semaphore = Arc::clone(&semaphore);
      tasks.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
          Ok(permit) => permit,
          Err(_) => return caja_attach::ReleaseOutcome::Failed,
        };
        attachments.release(Some(&url)).await
      });
    }

    let (mut deleted, mut failed) = (0, 0);
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok(caja_attach::ReleaseOutcome::Released) => deleted += 1,
        Ok(caja_attach::ReleaseOutcome::Failed) | Err(_) => failed += 1,
        Ok(caja_attach::ReleaseOutcome::Skipped) => {}
      }
    }
    (deleted, failed)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::testutil::harness;

  #[tokio::test]
  async fn cascade_deletes_items_attachments_and_the_advance() {
    let h = harness();
    let adv_url = h.objects.seed("caja_menor/anticipo.pdf", b"soporte");
    let advance = h.ledger.seed_advance("2025-03-01", 100_000, Some(&adv_url));
    let first = h.objects.seed("caja_menor/recibo-1.pdf", b"uno");
    let second = h.objects.seed("caja_menor/recibo-2.pdf", b"dos");
    h.ledger.seed_item(&advance.id, "2025-03-05", 30_000, Some(&first));
    h.ledger.seed_item(&advance.id, "2025-03-10", 50_000, Some(&second));
    h.ledger.seed_item(&advance.id, "2025-03-12", 5_000, None);

    let summary = h.state.cascade.run(&advance.id).await.unwrap();

    assert_eq!(summary.items_deleted, 3);
    assert_eq!(summary.attachments_deleted, 3);
    assert_eq!(summary.attachments_failed, 0);
    assert_eq!(h.ledger.item_count(), 0);
    assert!(h.ledger.advance(&advance.id).is_none());
    assert!(!h.objects.contains("caja_menor/anticipo.pdf"));
    assert!(!h.objects.contains("caja_menor/recibo-1.pdf"));
    assert!(!h.objects.contains("caja_menor/recibo-2.pdf"));
  }

  #[tokio::test]
  async fn row_deletion_failure_leaves_the_advance_as_a_marker() {
    let h = harness();
    let advance = h.ledger.seed_advance("2025-03-01", 100_000, None);
    h.ledger.seed_item(&advance.id, "2025-03-05", 30_000, None);
    h.ledger.fail_item_deletes.store(true, Ordering::SeqCst);

    let result = h.state.cascade.run(&advance.id).await;

    assert!(result.is_err());
    assert!(
      h.ledger.advance(&advance.id).is_some(),
      "the advance row must survive while items remain"
    );
    assert_eq!(h.ledger.item_count(), 1);
  }

  #[tokio::test]
  async fn attachment_failures_are_counted_but_never_fatal() {
    let h = harness();
    let advance = h.ledger.seed_advance("2025-03-01", 100_000, None);
    let url = h.objects.seed("caja_menor/recibo.pdf", b"pdf");
    h.ledger.seed_item(&advance.id, "2025-03-05", 30_000, Some(&url));
    h.objects.fail_deletes.store(true, Ordering::SeqCst);

    let summary = h.state.cascade.run(&advance.id).await.unwrap();

    assert_eq!(summary.items_deleted, 1);
    assert_eq!(summary.attachments_deleted, 0);
    assert_eq!(summary.attachments_failed, 1);
    assert!(h.ledger.advance(&advance.id).is_none(), "cascade still completes");
  }

  #[tokio::test]
  async fn unlinked_items_are_found_through_the_items_table() {
    let h = harness();
    let advance = h.ledger.seed_advance("2025-03-01", 100_000, None);
    let item = h.ledger.seed_item(&advance.id, "2025-03-05", 30_000, None);
    // Simulate link-field drift: the advance forgets the item, but the
    // item's own link field still names the advance.
    h.ledger
      .advances
      .lock()
      .unwrap()
      .get_mut(&advance.id)
      .unwrap()
      .item_ids
      .clear();
    assert!(h.ledger.item_count() == 1 && h.ledger.advance(&advance.id).is_some());

    let summary = h.state.cascade.run(&advance.id).await.unwrap();

    assert_eq!(summary.items_deleted, 1);
    assert!(h.ledger.items.lock().unwrap().get(&item.id).is_none());
  }

  #[tokio::test]
  async fn unknown_advance_is_not_found() {
    let h = harness();
    let result = h.state.cascade.run(&RecordId::from("recNope")).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
  }
}
