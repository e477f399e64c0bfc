//! The [`LedgerStore`] trait and supporting types.
//!
//! The trait is implemented by record-store backends (e.g.
//! `caja-store-airtable`). Higher layers (`caja-api`) depend on this
//! abstraction, not on any concrete backend.

use std::{fmt, future::Future};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  advance::{Advance, AdvancePatch, NewAdvance},
  item::{Item, ItemPatch, NewItem},
};

// ─── Record identity ─────────────────────────────────────────────────────────

/// An opaque row id assigned by the record store (e.g. `recA1b2C3d4E5f6g7`).
/// Never synthesised client-side.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RecordId {
  fn from(s: &str) -> Self { Self(s.to_string()) }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// A disbursement-date window for advance listings and the legalization
/// report. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Period {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

impl Period {
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from.is_none_or(|from| date >= from)
      && self.to.is_none_or(|to| date <= to)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the two-table petty-cash ledger.
///
/// Single-row writes are assumed atomic at the store; nothing spanning
/// multiple rows or tables is. Callers that need multi-row sequences
/// (consolidation, cascade deletion) own their failure handling.
///
/// Errors follow the core taxonomy: a stale id on update/delete surfaces as
/// [`Error::NotFound`](crate::Error::NotFound) and is never retried; every
/// other store failure surfaces as `Upstream`.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  // ── Advances ──────────────────────────────────────────────────────────

  /// Create an advance row. The store assigns the id.
  fn create_advance(
    &self,
    new: NewAdvance,
  ) -> impl Future<Output = Result<Advance>> + Send + '_;

  /// Retrieve an advance by id. Returns `None` if not found.
  fn get_advance<'a>(
    &'a self,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<Option<Advance>>> + Send + 'a;

  /// List advances whose disbursement date falls in `period`,
  /// newest-disbursement first.
  fn list_advances(
    &self,
    period: Period,
  ) -> impl Future<Output = Result<Vec<Advance>>> + Send + '_;

  /// Apply `patch` to an advance row and return the updated row.
  fn update_advance<'a>(
    &'a self,
    id: &'a RecordId,
    patch: AdvancePatch,
  ) -> impl Future<Output = Result<Advance>> + Send + 'a;

  /// Delete the advance row only. Dependent items and attachments are the
  /// cascade orchestrator's responsibility, not the store's.
  fn delete_advance_row<'a>(
    &'a self,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  // ── Items ─────────────────────────────────────────────────────────────

  /// Create one or more item rows, splitting into store-sized batches as
  /// needed. Returns the stored rows in input order.
  fn create_items(
    &self,
    new: Vec<NewItem>,
  ) -> impl Future<Output = Result<Vec<Item>>> + Send + '_;

  /// Retrieve an item by id. Returns `None` if not found.
  fn get_item<'a>(
    &'a self,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<Option<Item>>> + Send + 'a;

  /// Apply `patch` to an item row and return the updated row.
  fn update_item<'a>(
    &'a self,
    id: &'a RecordId,
    patch: ItemPatch,
  ) -> impl Future<Output = Result<Item>> + Send + 'a;

  /// Delete item rows, batching per the store's destroy limit.
  fn delete_item_rows<'a>(
    &'a self,
    ids: &'a [RecordId],
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Enumerate the items linked to an advance by querying the Items table's
  /// own link field, newest-expense first.
  ///
  /// This is the authoritative item set. The advance's cached link-field
  /// snapshot can drift (an item created before being linked), so callers
  /// must not rely on it alone.
  fn items_for_advance<'a>(
    &'a self,
    advance_id: &'a RecordId,
  ) -> impl Future<Output = Result<Vec<Item>>> + Send + 'a;
}
