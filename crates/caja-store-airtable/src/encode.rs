//! Mapping between the Rust domain types and the record store's named-field
//! JSON maps, plus the `filterByFormula` builders.
//!
//! Field names follow the hosted base exactly, accents and all. Writing
//! `null` for a field clears it. `Estado Caja Menor` is a display field kept
//! in step with the lifecycle; `Fecha Consolidacion` stays the authoritative
//! state marker.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use caja_core::{
  RecordId,
  advance::{Advance, AdvancePatch, NewAdvance},
  item::{Item, ItemPatch, NewItem},
  store::Period,
};

use crate::{Error, RawRecord, Result};

// ─── Field names ─────────────────────────────────────────────────────────────

pub mod advance_fields {
  pub const DATE: &str = "Fecha Anticipo";
  pub const BENEFICIARY: &str = "Beneficiario";
  pub const TAX_ID: &str = "Nit-CC";
  pub const CONCEPT: &str = "Concepto Caja Menor";
  pub const AMOUNT: &str = "Valor Caja Menor";
  pub const REGISTERED_BY: &str = "Realiza Registro";
  pub const CONSOLIDATED_ON: &str = "Fecha Consolidacion";
  pub const SNAPSHOT_URL: &str = "Documento Consiliacion";
  pub const STATUS: &str = "Estado Caja Menor";
  pub const ITEMS: &str = "Items";
  pub const ATTACHMENT_URL: &str = "URL S3";

  pub const STATUS_OPEN: &str = "Abierta";
  pub const STATUS_CONSOLIDATED: &str = "Consolidada";
}

pub mod item_fields {
  pub const DATE: &str = "Fecha";
  pub const BENEFICIARY: &str = "Beneficiario";
  pub const TAX_ID: &str = "Nit/CC";
  pub const CONCEPT: &str = "Concepto";
  pub const COST_CENTER: &str = "Centro Costo";
  pub const AMOUNT: &str = "Valor";
  pub const REGISTERED_BY: &str = "Realiza Registro";
  pub const ADVANCE: &str = "Caja Menor";
  /// The store's native attachment field. Read-only fallback for rows that
  /// predate object-store uploads.
  pub const RECEIPT: &str = "Comprobante";
  pub const ATTACHMENT_URL: &str = "URL S3";
}

// ─── Field readers ───────────────────────────────────────────────────────────

fn req_str(fields: &Map<String, Value>, name: &str) -> Result<String> {
  match fields.get(name) {
    Some(Value::String(s)) => Ok(s.clone()),
    Some(other) => Err(Error::decode(name, format!("expected string, got {other}"))),
    None => Err(Error::decode(name, "field is missing")),
  }
}

fn opt_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
  match fields.get(name) {
    Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
    _ => None,
  }
}

fn parse_date(name: &str, s: &str) -> Result<NaiveDate> {
  // Date fields come back as `YYYY-MM-DD`; datetime-typed fields as RFC 3339.
  s.parse::<NaiveDate>()
    .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
    .map_err(|e| Error::decode(name, format!("bad date {s:?}: {e}")))
}

fn req_date(fields: &Map<String, Value>, name: &str) -> Result<NaiveDate> {
  parse_date(name, &req_str(fields, name)?)
}

fn opt_date(fields: &Map<String, Value>, name: &str) -> Result<Option<NaiveDate>> {
  opt_str(fields, name)
    .map(|s| parse_date(name, &s))
    .transpose()
}

fn req_decimal(fields: &Map<String, Value>, name: &str) -> Result<Decimal> {
  match fields.get(name) {
    Some(v @ Value::Number(_)) => serde_json::from_value(v.clone())
      .map_err(|e| Error::decode(name, e.to_string())),
    Some(other) => Err(Error::decode(name, format!("expected number, got {other}"))),
    None => Err(Error::decode(name, "field is missing")),
  }
}

fn links(fields: &Map<String, Value>, name: &str) -> Vec<RecordId> {
  match fields.get(name) {
    Some(Value::Array(ids)) => ids
      .iter()
      .filter_map(|v| v.as_str())
      .map(RecordId::from)
      .collect(),
    _ => Vec::new(),
  }
}

/// First URL inside a native attachment field (`[{url, filename, …}]`).
fn native_attachment_url(
  fields: &Map<String, Value>,
  name: &str,
) -> Option<String> {
  fields
    .get(name)?
    .as_array()?
    .first()?
    .get("url")?
    .as_str()
    .map(str::to_string)
}

// ─── Advance mapping ─────────────────────────────────────────────────────────

pub fn advance_from_record(rec: &RawRecord) -> Result<Advance> {
  use advance_fields as f;
  Ok(Advance {
    id:              RecordId::new(rec.id.clone()),
    date:            req_date(&rec.fields, f::DATE)?,
    beneficiary:     req_str(&rec.fields, f::BENEFICIARY)?,
    tax_id:          req_str(&rec.fields, f::TAX_ID)?,
    concept:         req_str(&rec.fields, f::CONCEPT)?,
    amount:          req_decimal(&rec.fields, f::AMOUNT)?,
    registered_by:   req_str(&rec.fields, f::REGISTERED_BY)?,
    consolidated_on: opt_date(&rec.fields, f::CONSOLIDATED_ON)?,
    snapshot_url:    opt_str(&rec.fields, f::SNAPSHOT_URL),
    attachment_url:  opt_str(&rec.fields, f::ATTACHMENT_URL),
    item_ids:        links(&rec.fields, f::ITEMS),
  })
}

pub fn new_advance_to_fields(new: &NewAdvance) -> Map<String, Value> {
  use advance_fields as f;
  let mut fields = Map::new();
  fields.insert(f::DATE.into(), json!(new.date.to_string()));
  fields.insert(f::BENEFICIARY.into(), json!(new.beneficiary));
  fields.insert(f::TAX_ID.into(), json!(new.tax_id));
  fields.insert(f::CONCEPT.into(), json!(new.concept));
  fields.insert(f::AMOUNT.into(), json!(new.amount));
  fields.insert(f::REGISTERED_BY.into(), json!(new.registered_by));
  fields.insert(f::STATUS.into(), json!(f::STATUS_OPEN));
  if let Some(url) = &new.attachment_url {
    fields.insert(f::ATTACHMENT_URL.into(), json!(url));
  }
  fields
}

pub fn advance_patch_to_fields(patch: &AdvancePatch) -> Map<String, Value> {
  use advance_fields as f;
  let mut fields = Map::new();
  if let Some(date) = patch.date {
    fields.insert(f::DATE.into(), json!(date.to_string()));
  }
  if let Some(v) = &patch.beneficiary {
    fields.insert(f::BENEFICIARY.into(), json!(v));
  }
  if let Some(v) = &patch.tax_id {
    fields.insert(f::TAX_ID.into(), json!(v));
  }
  if let Some(v) = &patch.concept {
    fields.insert(f::CONCEPT.into(), json!(v));
  }
  if let Some(v) = patch.amount {
    fields.insert(f::AMOUNT.into(), json!(v));
  }
  if let Some(v) = &patch.registered_by {
    fields.insert(f::REGISTERED_BY.into(), json!(v));
  }
  if let Some(date) = patch.consolidated_on {
    fields.insert(f::CONSOLIDATED_ON.into(), json!(date.to_string()));
    fields.insert(f::STATUS.into(), json!(f::STATUS_CONSOLIDATED));
  }
  if let Some(url) = &patch.snapshot_url {
    fields.insert(f::SNAPSHOT_URL.into(), json!(url));
  }
  if let Some(url) = &patch.attachment_url {
    // `Some(None)` writes null, which clears the field.
    fields.insert(f::ATTACHMENT_URL.into(), json!(url));
  }
  fields
}

// ─── Item mapping ────────────────────────────────────────────────────────────

pub fn item_from_record(rec: &RawRecord) -> Result<Item> {
  use item_fields as f;
  Ok(Item {
    id:             RecordId::new(rec.id.clone()),
    date:           req_date(&rec.fields, f::DATE)?,
    beneficiary:    req_str(&rec.fields, f::BENEFICIARY)?,
    tax_id:         req_str(&rec.fields, f::TAX_ID)?,
    concept:        req_str(&rec.fields, f::CONCEPT)?,
    cost_center:    req_str(&rec.fields, f::COST_CENTER)?,
    amount:         req_decimal(&rec.fields, f::AMOUNT)?,
    registered_by:  req_str(&rec.fields, f::REGISTERED_BY)?,
    advance_ids:    links(&rec.fields, f::ADVANCE),
    attachment_url: opt_str(&rec.fields, f::ATTACHMENT_URL)
      .or_else(|| native_attachment_url(&rec.fields, f::RECEIPT)),
  })
}

pub fn new_item_to_fields(new: &NewItem) -> Map<String, Value> {
  use item_fields as f;
  let mut fields = Map::new();
  fields.insert(f::DATE.into(), json!(new.date.to_string()));
  fields.insert(f::BENEFICIARY.into(), json!(new.beneficiary));
  fields.insert(f::TAX_ID.into(), json!(new.tax_id));
  fields.insert(f::CONCEPT.into(), json!(new.concept));
  fields.insert(f::COST_CENTER.into(), json!(new.cost_center));
  fields.insert(f::AMOUNT.into(), json!(new.amount));
  fields.insert(f::REGISTERED_BY.into(), json!(new.registered_by));
  fields.insert(f::ADVANCE.into(), json!([new.advance_id.as_str()]));
  if let Some(url) = &new.attachment_url {
    fields.insert(f::ATTACHMENT_URL.into(), json!(url));
  }
  fields
}

pub fn item_patch_to_fields(patch: &ItemPatch) -> Map<String, Value> {
  use item_fields as f;
  let mut fields = Map::new();
  if let Some(date) = patch.date {
    fields.insert(f::DATE.into(), json!(date.to_string()));
  }
  if let Some(v) = &patch.beneficiary {
    fields.insert(f::BENEFICIARY.into(), json!(v));
  }
  if let Some(v) = &patch.tax_id {
    fields.insert(f::TAX_ID.into(), json!(v));
  }
  if let Some(v) = &patch.concept {
    fields.insert(f::CONCEPT.into(), json!(v));
  }
  if let Some(v) = &patch.cost_center {
    fields.insert(f::COST_CENTER.into(), json!(v));
  }
  if let Some(v) = patch.amount {
    fields.insert(f::AMOUNT.into(), json!(v));
  }
  if let Some(v) = &patch.registered_by {
    fields.insert(f::REGISTERED_BY.into(), json!(v));
  }
  if let Some(url) = &patch.attachment_url {
    fields.insert(f::ATTACHMENT_URL.into(), json!(url));
  }
  fields
}

// ─── Formula builders ────────────────────────────────────────────────────────

/// Quote a value as a formula string literal.
fn quote(s: &str) -> String {
  format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Match rows whose link field contains `id`. Link fields render as arrays,
/// so the match goes through `ARRAYJOIN`.
pub fn linked_to_formula(link_field: &str, id: &RecordId) -> String {
  format!("SEARCH({}, ARRAYJOIN({{{link_field}}}))", quote(id.as_str()))
}

/// Match rows whose date field falls inside `period`. `None` when the period
/// is unbounded on both sides (no formula needed).
pub fn period_formula(date_field: &str, period: Period) -> Option<String> {
  let after = period
    .from
    .map(|from| format!("NOT(IS_BEFORE({{{date_field}}}, {}))", quote(&from.to_string())));
  let before = period
    .to
    .map(|to| format!("NOT(IS_AFTER({{{date_field}}}, {}))", quote(&to.to_string())));

  match (after, before) {
    (Some(a), Some(b)) => Some(format!("AND({a}, {b})")),
    (Some(a), None) => Some(a),
    (None, Some(b)) => Some(b),
    (None, None) => None,
  }
}
