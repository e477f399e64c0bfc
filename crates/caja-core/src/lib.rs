//! Domain types, error taxonomy, and collaborator contracts for the Caja
//! Menor ledger.
//!
//! Everything network-facing lives in the backend crates; this one holds the
//! pure model the rest of the workspace builds on.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod advance;
pub mod aggregate;
pub mod error;
pub mod external;
pub mod item;
pub mod nullable;
pub mod store;

pub use error::{Error, Result};
pub use store::RecordId;
