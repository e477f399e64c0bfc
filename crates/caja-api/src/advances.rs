//! Handlers for `/advances` endpoints.
//!
//! | Method   | Path                          | Notes |
//! |----------|-------------------------------|-------|
//! | `GET`    | `/advances`                   | Optional `?from=&to=` window |
//! | `POST`   | `/advances`                   | Body: a new advance |
//! | `GET`    | `/advances/{id}`              | Row + status + aggregate + signals |
//! | `PATCH`  | `/advances/{id}`              | Releases a replaced attachment |
//! | `DELETE` | `/advances/{id}`              | Cascade deletion |
//! | `POST`   | `/advances/{id}/consolidate`  | Open → Consolidated |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use caja_core::{
  RecordId,
  advance::{Advance, AdvancePatch, AdvanceStatus, NewAdvance},
  aggregate::{self, AdvanceSignals, ConsolidationAggregate},
  external::{
    AttachmentFetcher, NotificationDispatcher, ObjectStore, SnapshotRenderer,
  },
  store::{LedgerStore, Period},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  AppState, WriteResponse,
  cascade::CascadeSummary,
  consolidate::ConsolidationOutcome,
  error::ApiError,
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// An advance with its lifecycle state, computed figures, and advisory
/// signals.
#[derive(Debug, Serialize)]
pub struct AdvanceDetail {
  pub advance:   Advance,
  pub status:    AdvanceStatus,
  pub aggregate: ConsolidationAggregate,
  pub signals:   AdvanceSignals,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /advances[?from=&to=]`
pub async fn list<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Query(period): Query<Period>,
) -> Result<Json<Vec<Advance>>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  Ok(Json(state.ledger.list_advances(period).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /advances`
pub async fn create<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Json(body): Json<NewAdvance>,
) -> Result<impl IntoResponse, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let advance = state.ledger.create_advance(body).await?;
  Ok((
    StatusCode::CREATED,
    Json(WriteResponse { success: true, record: advance, warnings: Vec::new() }),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /advances/{id}`
pub async fn get_one<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
) -> Result<Json<AdvanceDetail>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let id = RecordId::new(id);
  let advance = state
    .ledger
    .get_advance(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("advance {id} not found")))?;
  let items = state.ledger.items_for_advance(&id).await?;

  let agg = aggregate::aggregate(&advance, &items);
  let signals =
    aggregate::signals(&advance, &items, &agg, Utc::now().date_naive());
  let status = advance.status();
  Ok(Json(AdvanceDetail { advance, status, aggregate: agg, signals }))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /advances/{id}`
///
/// When the patch replaces or clears the attachment URL, the previously
/// stored object is released after the row write succeeds. A failed release
/// becomes a warning, never the operation's failure.
pub async fn update<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
  Json(patch): Json<AdvancePatch>,
) -> Result<Json<WriteResponse<Advance>>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let id = RecordId::new(id);
  let existing = state
    .ledger
    .get_advance(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("advance {id} not found")))?;

  let replaced_url = replaced_attachment(
    existing.attachment_url.as_deref(),
    patch.attachment_url.as_ref(),
  );

  let updated = state.ledger.update_advance(&id, patch).await?;

  let mut warnings = Vec::new();
  if state.attachments.release(replaced_url.as_deref()).await.failed() {
    warnings.push(format!(
      "previous attachment was not deleted and remains orphaned: {}",
      replaced_url.unwrap_or_default()
    ));
  }
  Ok(Json(WriteResponse { success: true, record: updated, warnings }))
}

/// The old URL to release: only when the patch touches the field and the
/// value actually changes.
pub(crate) fn replaced_attachment(
  old: Option<&str>,
  patched: Option<&Option<String>>,
) -> Option<String> {
  match (old, patched) {
    (Some(old), Some(new_value)) if new_value.as_deref() != Some(old) => {
      Some(old.to_string())
    }
    _ => None,
  }
}

// ─── Cascade delete ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CascadeResponse {
  pub success:  bool,
  #[serde(flatten)]
  pub summary:  CascadeSummary,
  pub warnings: Vec<String>,
}

/// `DELETE /advances/{id}`
pub async fn destroy<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
) -> Result<Json<CascadeResponse>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let summary = state.cascade.run(&RecordId::new(id)).await?;

  let warnings = if summary.attachments_failed > 0 {
    vec![format!(
      "{} attachment deletions failed; the objects remain for reconciliation",
      summary.attachments_failed
    )]
  } else {
    Vec::new()
  };
  Ok(Json(CascadeResponse { success: true, summary, warnings }))
}

// ─── Consolidate ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ConsolidateBody {
  /// Overrides the configured default recipients when non-empty.
  #[serde(default)]
  pub recipients: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ConsolidateResponse {
  pub success: bool,
  #[serde(flatten)]
  pub outcome: ConsolidationOutcome,
}

/// `POST /advances/{id}/consolidate`
pub async fn consolidate<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
  body: Option<Json<ConsolidateBody>>,
) -> Result<Json<ConsolidateResponse>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let id = RecordId::new(id);
  let advance = state
    .ledger
    .get_advance(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("advance {id} not found")))?;
  if !advance.is_open() {
    return Err(ApiError::Conflict(format!("advance {id} is already consolidated")));
  }

  let recipients = body.and_then(|Json(b)| b.recipients);
  let outcome = state
    .consolidator
    .run(advance, recipients, Utc::now().date_naive())
    .await?;
  Ok(Json(ConsolidateResponse { success: true, outcome }))
}
