//! [`AttachmentManager`] — best-effort deletion of replaced or orphaned
//! attachment objects.
//!
//! Cleanup never blocks the surrounding ledger write: a financial-record
//! update must not fail because a storage delete did. Failures are logged
//! with the resolved key and reported to the caller as a count, so orphaned
//! objects can be reconciled later.

use std::sync::Arc;

use caja_core::external::{DeleteOutcome, ObjectStore};

use crate::resolve::KeyResolver;

/// Outcome of one release attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
  /// Nothing to do: no previous URL, a record-store-native URL, or a key
  /// outside the guarded prefix.
  Skipped,
  /// The object is gone — removed now, or already absent.
  Released,
  /// The store refused or could not be reached. The orphaned object stays.
  Failed,
}

impl ReleaseOutcome {
  pub fn failed(&self) -> bool { matches!(self, Self::Failed) }
}

/// Deletes previously stored attachment objects once the owning record field
/// stops referencing them.
pub struct AttachmentManager<S> {
  store:        Arc<S>,
  resolver:     KeyResolver,
  /// Only keys under this logical prefix may be deleted. A malformed or
  /// spoofed URL resolving elsewhere in the bucket is skipped, not deleted.
  guard_prefix: String,
}

impl<S: ObjectStore> AttachmentManager<S> {
  pub fn new(
    store: Arc<S>,
    resolver: KeyResolver,
    guard_prefix: impl Into<String>,
  ) -> Self {
    Self { store, resolver, guard_prefix: guard_prefix.into() }
  }

  /// Release the object behind `old_url`, if there is one and it is ours.
  ///
  /// Idempotent: an already-deleted object reports [`ReleaseOutcome::Released`].
  pub async fn release(&self, old_url: Option<&str>) -> ReleaseOutcome {
    let Some(url) = old_url else {
      return ReleaseOutcome::Skipped;
    };
    let Some(key) = self.resolver.resolve(url) else {
      tracing::debug!(url, "attachment is hosted by the record store; skipping");
      return ReleaseOutcome::Skipped;
    };
    if !key.starts_with(&self.guard_prefix) {
      tracing::warn!(
        key,
        prefix = %self.guard_prefix,
        "resolved key falls outside the guarded prefix; refusing to delete"
      );
      return ReleaseOutcome::Skipped;
    }

    match self.store.delete(&key).await {
      Ok(DeleteOutcome::Removed) => {
        tracing::info!(key, "released replaced attachment");
        ReleaseOutcome::Released
      }
      Ok(DeleteOutcome::Missing) => {
        tracing::info!(key, "attachment already gone");
        ReleaseOutcome::Released
      }
      Ok(DeleteOutcome::Unexpected(status)) => {
        tracing::warn!(key, status, "attachment delete returned unexpected status");
        ReleaseOutcome::Failed
      }
      Err(e) => {
        tracing::warn!(key, error = %e, "attachment delete failed");
        ReleaseOutcome::Failed
      }
    }
  }
}
