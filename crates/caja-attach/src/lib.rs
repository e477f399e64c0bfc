//! Attachment plumbing for the Caja Menor ledger: resolving object-store
//! URLs back to keys, the object-store gateway client, and the best-effort
//! cleanup that keeps the bucket in step with the ledger rows.

pub mod cleanup;
pub mod resolve;
pub mod store;

pub use cleanup::{AttachmentManager, ReleaseOutcome};
pub use resolve::KeyResolver;
pub use store::{GatewayConfig, GatewayObjectStore};
