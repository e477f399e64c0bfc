//! JSON REST API for the Caja Menor ledger.
//!
//! Exposes an axum [`Router`] over any [`LedgerStore`] and the collaborator
//! contracts from `caja-core`. The two multi-step workflows — consolidation
//! and cascade deletion — live here as orchestrators the handlers drive.

pub mod advances;
pub mod cascade;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod items;
pub mod limit;
pub mod reports;

#[cfg(test)]
mod testutil;

pub use config::ServerConfig;
pub use error::ApiError;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use caja_attach::AttachmentManager;
use caja_core::{
  external::{
    AttachmentFetcher, NotificationDispatcher, ObjectStore, SnapshotRenderer,
  },
  store::LedgerStore,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use cascade::CascadeDeleter;
use consolidate::Consolidator;
use limit::RateLimiter;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<L, O, R, D, F> {
  pub ledger:       Arc<L>,
  pub attachments:  Arc<AttachmentManager<O>>,
  pub consolidator: Arc<Consolidator<L, O, R, D, F>>,
  pub cascade:      Arc<CascadeDeleter<L, O>>,
  pub limiter:      Arc<RateLimiter>,
}

impl<L, O, R, D, F> Clone for AppState<L, O, R, D, F> {
  fn clone(&self) -> Self {
    Self {
      ledger:       Arc::clone(&self.ledger),
      attachments:  Arc::clone(&self.attachments),
      consolidator: Arc::clone(&self.consolidator),
      cascade:      Arc::clone(&self.cascade),
      limiter:      Arc::clone(&self.limiter),
    }
  }
}

// ─── Response envelope ───────────────────────────────────────────────────────

/// The envelope for write endpoints: the mutation succeeded, and any
/// best-effort sub-steps that failed are listed as warnings.
#[derive(Debug, Serialize)]
pub struct WriteResponse<T> {
  pub success:  bool,
  pub record:   T,
  pub warnings: Vec<String>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the ledger API.
pub fn router<L, O, R, D, F>(state: AppState<L, O, R, D, F>) -> Router
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  Router::new()
    .route(
      "/advances",
      get(advances::list::<L, O, R, D, F>).post(advances::create::<L, O, R, D, F>),
    )
    .route(
      "/advances/{id}",
      get(advances::get_one::<L, O, R, D, F>)
        .patch(advances::update::<L, O, R, D, F>)
        .delete(advances::destroy::<L, O, R, D, F>),
    )
    .route(
      "/advances/{id}/consolidate",
      post(advances::consolidate::<L, O, R, D, F>),
    )
    .route("/items", post(items::create::<L, O, R, D, F>))
    .route(
      "/items/{id}",
      axum::routing::patch(items::update::<L, O, R, D, F>)
        .delete(items::destroy::<L, O, R, D, F>),
    )
    .route("/reports/legalization", get(reports::legalization::<L, O, R, D, F>))
    .layer(axum::middleware::from_fn_with_state(
      Arc::clone(&state.limiter),
      limit::middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
