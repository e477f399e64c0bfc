//! Item — a single expense charged against an advance.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{nullable, store::RecordId};

/// An expense line. Created independently or in a batch under an advance,
/// mutated when its proof-of-payment attachment is replaced, destroyed
/// individually or by the cascade when its advance is destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub id:             RecordId,
  /// Expense date.
  pub date:           NaiveDate,
  pub beneficiary:    String,
  pub tax_id:         String,
  pub concept:        String,
  pub cost_center:    String,
  pub amount:         Decimal,
  pub registered_by:  String,
  /// Link back to the owning advance. The store models this as a list.
  pub advance_ids:    Vec<RecordId>,
  /// Object-store URL of the proof-of-payment document.
  pub attachment_url: Option<String>,
}

impl Item {
  /// The owning advance, when linked. An unlinked item is a drift case the
  /// cascade queries around.
  pub fn advance_id(&self) -> Option<&RecordId> { self.advance_ids.first() }
}

/// Input to [`LedgerStore::create_items`](crate::store::LedgerStore::create_items).
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
  pub date:           NaiveDate,
  pub beneficiary:    String,
  pub tax_id:         String,
  pub concept:        String,
  pub cost_center:    String,
  pub amount:         Decimal,
  pub registered_by:  String,
  pub advance_id:     RecordId,
  pub attachment_url: Option<String>,
}

/// A partial update to an item row. `attachment_url` distinguishes "absent"
/// from an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
  pub date:           Option<NaiveDate>,
  pub beneficiary:    Option<String>,
  pub tax_id:         Option<String>,
  pub concept:        Option<String>,
  pub cost_center:    Option<String>,
  pub amount:         Option<Decimal>,
  pub registered_by:  Option<String>,
  #[serde(default, deserialize_with = "nullable::explicit")]
  pub attachment_url: Option<Option<String>>,
}
