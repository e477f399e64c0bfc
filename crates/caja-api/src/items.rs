//! Handlers for `/items` endpoints.
//!
//! | Method   | Path          | Notes |
//! |----------|---------------|-------|
//! | `POST`   | `/items`      | One item or an array; store batch limits respected |
//! | `PATCH`  | `/items/{id}` | Releases a replaced attachment |
//! | `DELETE` | `/items/{id}` | Releases the attachment, then the row |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use caja_core::{
  RecordId,
  external::{
    AttachmentFetcher, NotificationDispatcher, ObjectStore, SnapshotRenderer,
  },
  item::{Item, ItemPatch, NewItem},
  store::LedgerStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, WriteResponse, advances::replaced_attachment, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

/// One expense or a batch registered in a single request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateItemsBody {
  Many(Vec<NewItem>),
  One(Box<NewItem>),
}

/// `POST /items`
pub async fn create<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Json(body): Json<CreateItemsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let new = match body {
    CreateItemsBody::Many(items) => items,
    CreateItemsBody::One(item) => vec![*item],
  };
  if new.is_empty() {
    return Err(ApiError::BadRequest("no items to create".to_string()));
  }

  let items = state.ledger.create_items(new).await?;
  Ok((
    StatusCode::CREATED,
    Json(WriteResponse { success: true, record: items, warnings: Vec::new() }),
  ))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /items/{id}` — releases the previous proof-of-payment object when
/// the attachment URL is replaced or cleared.
pub async fn update<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
  Json(patch): Json<ItemPatch>,
) -> Result<Json<WriteResponse<Item>>, ApiError>
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
    .get_item(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("item {id} not found")))?;

  let replaced_url = replaced_attachment(
    existing.attachment_url.as_deref(),
    patch.attachment_url.as_ref(),
  );

  let updated = state.ledger.update_item(&id, patch).await?;

  let mut warnings = Vec::new();
  if state.attachments.release(replaced_url.as_deref()).await.failed() {
    warnings.push(format!(
      "previous attachment was not deleted and remains orphaned: {}",
      replaced_url.unwrap_or_default()
    ));
  }
  Ok(Json(WriteResponse { success: true, record: updated, warnings }))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
  pub success:  bool,
  pub warnings: Vec<String>,
}

/// `DELETE /items/{id}` — attachment cleanup first, row second. A failed
/// cleanup is a warning; the row is deleted regardless.
pub async fn destroy<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let id = RecordId::new(id);
  let item = state
    .ledger
    .get_item(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("item {id} not found")))?;

  let mut warnings = Vec::new();
  if state.attachments.release(item.attachment_url.as_deref()).await.failed() {
    warnings.push(format!(
      "attachment was not deleted and remains orphaned: {}",
      item.attachment_url.unwrap_or_default()
    ));
  }

  state.ledger.delete_item_rows(std::slice::from_ref(&id)).await?;
  Ok(Json(DeleteResponse { success: true, warnings }))
}
