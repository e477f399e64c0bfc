//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Status mapping follows the error taxonomy: stale ids are 404 and never
//! retried, upstream store failures are 502 with no automatic retry, and
//! everything that indicates a broken deployment is 500. Best-effort
//! failures never reach this type — they travel in response `warnings`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("rate limit exceeded")]
  RateLimited,

  #[error("upstream failure: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<caja_core::Error> for ApiError {
  fn from(e: caja_core::Error) -> Self {
    match &e {
      caja_core::Error::NotFound { .. } => Self::NotFound(e.to_string()),
      caja_core::Error::Upstream { .. } => Self::Upstream(e.to_string()),
      caja_core::Error::Config(_)
      | caja_core::Error::Decode { .. }
      | caja_core::Error::Render(_) => Self::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::RateLimited => {
        (StatusCode::TOO_MANY_REQUESTS, self.to_string())
      }
      ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "success": false, "error": message }))).into_response()
  }
}
