//! Advance — a petty-cash disbursement, the parent ledger row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{nullable, store::RecordId};

/// The lifecycle state of an advance, derived from the presence of a
/// consolidation date. Never stored as its own source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceStatus {
  Open,
  Consolidated,
}

/// A petty-cash disbursement to a beneficiary. Owns zero-or-more items via
/// the link field; the link snapshot here is a convenience copy, not the
/// authoritative item set (see
/// [`LedgerStore::items_for_advance`](crate::store::LedgerStore::items_for_advance)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advance {
  pub id:              RecordId,
  /// Disbursement date.
  pub date:            NaiveDate,
  pub beneficiary:     String,
  /// Counterparty tax id (NIT or CC).
  pub tax_id:          String,
  pub concept:         String,
  /// Disbursed amount. Business expectation: covers the linked items' total;
  /// violations surface as negative `remaining`, never as rejected writes.
  pub amount:          Decimal,
  pub registered_by:   String,
  /// Presence defines the lifecycle state: `None` while Open.
  pub consolidated_on: Option<NaiveDate>,
  /// URL of the rendered consolidation document, once one exists.
  pub snapshot_url:    Option<String>,
  /// Object-store URL of the last uploaded supporting document.
  pub attachment_url:  Option<String>,
  /// Link-field snapshot of owned item row ids. May drift; never trusted as
  /// the full item set.
  pub item_ids:        Vec<RecordId>,
}

impl Advance {
  pub fn status(&self) -> AdvanceStatus {
    if self.consolidated_on.is_none() {
      AdvanceStatus::Open
    } else {
      AdvanceStatus::Consolidated
    }
  }

  pub fn is_open(&self) -> bool { self.consolidated_on.is_none() }
}

/// Input to [`LedgerStore::create_advance`](crate::store::LedgerStore::create_advance).
/// The id is always assigned by the store; it is not accepted from callers.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdvance {
  pub date:           NaiveDate,
  pub beneficiary:    String,
  pub tax_id:         String,
  pub concept:        String,
  pub amount:         Decimal,
  pub registered_by:  String,
  pub attachment_url: Option<String>,
}

/// A partial update to an advance row. Absent fields are left untouched;
/// `attachment_url` distinguishes "absent" from an explicit `null` (which
/// clears the field and orphans the previous object).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvancePatch {
  pub date:            Option<NaiveDate>,
  pub beneficiary:     Option<String>,
  pub tax_id:          Option<String>,
  pub concept:         Option<String>,
  pub amount:          Option<Decimal>,
  pub registered_by:   Option<String>,
  /// Set by the consolidation orchestrator only after a successful dispatch.
  pub consolidated_on: Option<NaiveDate>,
  pub snapshot_url:    Option<String>,
  #[serde(default, deserialize_with = "nullable::explicit")]
  pub attachment_url:  Option<Option<String>>,
}

impl AdvancePatch {
  pub fn is_empty(&self) -> bool {
    self.date.is_none()
      && self.beneficiary.is_none()
      && self.tax_id.is_none()
      && self.concept.is_none()
      && self.amount.is_none()
      && self.registered_by.is_none()
      && self.consolidated_on.is_none()
      && self.snapshot_url.is_none()
      && self.attachment_url.is_none()
  }
}
