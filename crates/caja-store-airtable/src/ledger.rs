//! [`AirtableLedger`] — the hosted-record-store implementation of
//! [`LedgerStore`].

use caja_core::{
  RecordId,
  advance::{Advance, AdvancePatch, NewAdvance},
  item::{Item, ItemPatch, NewItem},
  store::{LedgerStore, Period},
};
use serde::Deserialize;

use crate::{
  Error, Query, RecordsClient, SortDirection,
  encode::{
    advance_fields, advance_from_record, advance_patch_to_fields, item_fields,
    item_from_record, item_patch_to_fields, linked_to_formula,
    new_advance_to_fields, new_item_to_fields, period_formula,
  },
};

/// Table names in the hosted base.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerTables {
  pub advances: String,
  pub items:    String,
}

/// The two-table petty-cash ledger over a [`RecordsClient`].
///
/// Cheap to clone. Row-not-found maps to the core `NotFound`; every other
/// store failure maps to `Upstream`, with no automatic retry — the store
/// offers no compensating-transaction primitive to retry into.
#[derive(Clone)]
pub struct AirtableLedger {
  client: RecordsClient,
  tables: LedgerTables,
}

impl AirtableLedger {
  pub fn new(client: RecordsClient, tables: LedgerTables) -> Self {
    Self { client, tables }
  }

  fn advance_missing(&self, id: &RecordId) -> caja_core::Error {
    caja_core::Error::not_found(self.tables.advances.clone(), id.as_str())
  }

  fn item_missing(&self, id: &RecordId) -> caja_core::Error {
    caja_core::Error::not_found(self.tables.items.clone(), id.as_str())
  }
}

impl LedgerStore for AirtableLedger {
  // ── Advances ──────────────────────────────────────────────────────────

  async fn create_advance(&self, new: NewAdvance) -> caja_core::Result<Advance> {
    let rec = self
      .client
      .create(&self.tables.advances, new_advance_to_fields(&new))
      .await
      .map_err(caja_core::Error::from)?;
    Ok(advance_from_record(&rec)?)
  }

  async fn get_advance(&self, id: &RecordId) -> caja_core::Result<Option<Advance>> {
    match self.client.find(&self.tables.advances, id.as_str()).await {
      Ok(Some(rec)) => Ok(Some(advance_from_record(&rec)?)),
      Ok(None) => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn list_advances(&self, period: Period) -> caja_core::Result<Vec<Advance>> {
    let query = Query {
      filter_formula: period_formula(advance_fields::DATE, period),
      sort: Some((advance_fields::DATE.to_string(), SortDirection::Descending)),
      max_records: None,
    };
    let records = self
      .client
      .query(&self.tables.advances, &query)
      .await
      .map_err(caja_core::Error::from)?;
    records
      .iter()
      .map(|r| advance_from_record(r).map_err(Into::into))
      .collect()
  }

  async fn update_advance(
    &self,
    id: &RecordId,
    patch: AdvancePatch,
  ) -> caja_core::Result<Advance> {
    let rec = self
      .client
      .update(
        &self.tables.advances,
        id.as_str(),
        advance_patch_to_fields(&patch),
      )
      .await
      .map_err(|e| match e {
        Error::RecordNotFound { .. } => self.advance_missing(id),
        other => other.into(),
      })?;
    Ok(advance_from_record(&rec)?)
  }

  async fn delete_advance_row(&self, id: &RecordId) -> caja_core::Result<()> {
    self
      .client
      .destroy(&self.tables.advances, &[id.as_str().to_string()])
      .await
      .map_err(|e| match e {
        Error::RecordNotFound { .. } => self.advance_missing(id),
        other => other.into(),
      })
  }

  // ── Items ─────────────────────────────────────────────────────────────

  async fn create_items(&self, new: Vec<NewItem>) -> caja_core::Result<Vec<Item>> {
    let fields = new.iter().map(new_item_to_fields).collect();
    let records = self
      .client
      .create_batch(&self.tables.items, fields)
      .await
      .map_err(caja_core::Error::from)?;
    records
      .iter()
      .map(|r| item_from_record(r).map_err(Into::into))
      .collect()
  }

  async fn get_item(&self, id: &RecordId) -> caja_core::Result<Option<Item>> {
    match self.client.find(&self.tables.items, id.as_str()).await {
      Ok(Some(rec)) => Ok(Some(item_from_record(&rec)?)),
      Ok(None) => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn update_item(
    &self,
    id: &RecordId,
    patch: ItemPatch,
  ) -> caja_core::Result<Item> {
    let rec = self
      .client
      .update(&self.tables.items, id.as_str(), item_patch_to_fields(&patch))
      .await
      .map_err(|e| match e {
        Error::RecordNotFound { .. } => self.item_missing(id),
        other => other.into(),
      })?;
    Ok(item_from_record(&rec)?)
  }

  async fn delete_item_rows(&self, ids: &[RecordId]) -> caja_core::Result<()> {
    if ids.is_empty() {
      return Ok(());
    }
    let ids: Vec<String> =
      ids.iter().map(|id| id.as_str().to_string()).collect();
    self
      .client
      .destroy(&self.tables.items, &ids)
      .await
      .map_err(caja_core::Error::from)
  }

  async fn items_for_advance(
    &self,
    advance_id: &RecordId,
  ) -> caja_core::Result<Vec<Item>> {
    let query = Query {
      filter_formula: Some(linked_to_formula(item_fields::ADVANCE, advance_id)),
      sort: Some((item_fields::DATE.to_string(), SortDirection::Descending)),
      max_records: None,
    };
    let records = self
      .client
      .query(&self.tables.items, &query)
      .await
      .map_err(caja_core::Error::from)?;
    records
      .iter()
      .map(|r| item_from_record(r).map_err(Into::into))
      .collect()
  }
}
