//! Outbound side effects for consolidation: the rendered snapshot document,
//! the mail-API dispatcher, and the attachment fetcher.

pub mod fetch;
pub mod mail;
pub mod render;

pub use fetch::HttpAttachmentFetcher;
pub use mail::{MailApiDispatcher, MailConfig};
pub use render::HtmlSnapshotRenderer;
