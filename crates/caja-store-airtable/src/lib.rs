//! Airtable-style record-store backend for the Caja Menor ledger.
//!
//! The hosted tabular API addresses rows by opaque id and fields by
//! human-readable field name. [`RecordsClient`] speaks the wire protocol
//! (bearer token, `filterByFormula` queries, opaque `offset` paging, batch
//! destroy); [`AirtableLedger`] layers the two-table ledger semantics on top
//! of it.

mod client;
mod encode;
mod ledger;

pub mod error;

pub use client::{Query, RawRecord, RecordsClient, RecordsConfig, SortDirection};
pub use error::{Error, Result};
pub use ledger::{AirtableLedger, LedgerTables};
