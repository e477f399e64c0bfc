//! Contracts for the external collaborators the orchestrators drive: the
//! object store, the snapshot renderer, the notification dispatcher, and the
//! attachment fetcher.
//!
//! None of these systems shares a transaction with the record store — or
//! with each other. The orchestrators treat each call as an independently
//! failing step.

use std::future::Future;

use crate::{
  Result,
  advance::Advance,
  aggregate::ConsolidationAggregate,
  item::Item,
};

// ─── Object store ────────────────────────────────────────────────────────────

/// Outcome of a delete-by-key call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  /// The store confirmed the object is gone.
  Removed,
  /// The object was already absent. Success-equivalent: deletions must be
  /// idempotent because best-effort cleanup may run twice.
  Missing,
  /// Any other store response, carrying the status code for the audit log.
  Unexpected(u16),
}

impl DeleteOutcome {
  pub fn is_gone(&self) -> bool {
    matches!(self, Self::Removed | Self::Missing)
  }
}

/// Put/delete-by-key access to the attachment bucket.
pub trait ObjectStore: Send + Sync {
  /// Store `bytes` under `key` and return the object's public URL.
  fn put<'a>(
    &'a self,
    key: &'a str,
    bytes: Vec<u8>,
    content_type: &'a str,
  ) -> impl Future<Output = Result<String>> + Send + 'a;

  /// Delete the object at `key`.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<DeleteOutcome>> + Send + 'a;
}

// ─── Snapshot renderer ───────────────────────────────────────────────────────

/// Everything the consolidation document shows.
#[derive(Debug, Clone)]
pub struct SnapshotData {
  pub advance:   Advance,
  pub items:     Vec<Item>,
  pub aggregate: ConsolidationAggregate,
}

/// A rendered consolidation document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Vec<u8>,
}

/// Turns a [`SnapshotData`] into a document — a pure transformation with no
/// side effects beyond producing bytes. A failure here is fatal to the
/// consolidation transition: there is nothing to notify about.
pub trait SnapshotRenderer: Send + Sync {
  fn render(&self, data: &SnapshotData) -> Result<RenderedDocument>;
}

// ─── Notification dispatcher ─────────────────────────────────────────────────

/// A named file carried by an outbound notification.
#[derive(Debug, Clone)]
pub struct MailAttachment {
  pub name:         String,
  pub content_type: String,
  pub bytes:        Vec<u8>,
}

/// One notification: human-readable summary plus attachments.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
  pub subject:     String,
  pub html_body:   String,
  pub recipients:  Vec<String>,
  pub attachments: Vec<MailAttachment>,
}

/// Delivers one message to its recipient list. A dispatch failure is fatal
/// to the consolidation transition, which is what keeps the advance Open and
/// the operation retryable.
pub trait NotificationDispatcher: Send + Sync {
  fn send<'a>(
    &'a self,
    message: &'a OutboundMessage,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

// ─── Attachment fetcher ──────────────────────────────────────────────────────

/// Fetches the bytes behind an attachment URL for inclusion in a
/// notification. Callers treat each fetch as best-effort.
pub trait AttachmentFetcher: Send + Sync {
  fn fetch<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Vec<u8>>> + Send + 'a;
}
