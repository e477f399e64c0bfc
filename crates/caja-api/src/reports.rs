//! The legalization report: per-advance aggregates and the batch rollup for
//! a disbursement-date window.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use caja_core::{
  Error,
  aggregate::{self, LegalizationRollup},
  external::{
    AttachmentFetcher, NotificationDispatcher, ObjectStore, SnapshotRenderer,
  },
  store::{LedgerStore, Period},
};
use chrono::Utc;
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{AppState, advances::AdvanceDetail, error::ApiError};

/// Concurrent item-set queries per report.
const REPORT_WORKERS: usize = 4;

#[derive(Debug, Serialize)]
pub struct LegalizationReport {
  pub advances: Vec<AdvanceDetail>,
  pub rollup:   LegalizationRollup,
}

/// `GET /reports/legalization?from=&to=`
pub async fn legalization<L, O, R, D, F>(
  State(state): State<AppState<L, O, R, D, F>>,
  Query(period): Query<Period>,
) -> Result<Json<LegalizationReport>, ApiError>
where
  L: LedgerStore + 'static,
  O: ObjectStore + 'static,
  R: SnapshotRenderer + 'static,
  D: NotificationDispatcher + 'static,
  F: AttachmentFetcher + 'static,
{
  let advances = state.ledger.list_advances(period).await?;

  let semaphore = Arc::new(Semaphore::new(REPORT_WORKERS));
  let mut tasks = JoinSet::new();
  for (position, advance) in advances.into_iter().enumerate() {
    let ledger = Arc::clone(&state.ledger);
    let semaphore = Arc::clone(&semaphore);
    tasks.spawn(async move {
      let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
          return (
            position,
            advance,
            Err(Error::upstream("record store", "worker pool closed")),
          );
        }
      };
      let items = ledger.items_for_advance(&advance.id).await;
      (position, advance, items)
    });
  }

  let today = Utc::now().date_naive();
  let mut rows = Vec::new();
  while let Some(joined) = tasks.join_next().await {
    let (position, advance, items) =
      joined.map_err(|e| ApiError::Internal(e.to_string()))?;
    let items = items?;

    let agg = aggregate::aggregate(&advance, &items);
    let signals = aggregate::signals(&advance, &items, &agg, today);
    let status = advance.status();
    rows.push((position, AdvanceDetail { advance, status, aggregate: agg, signals }));
  }
  rows.sort_by_key(|(position, _)| *position);

  let advances: Vec<AdvanceDetail> =
    rows.into_iter().map(|(_, detail)| detail).collect();
  let rollup = aggregate::rollup(advances.iter().map(|d| &d.aggregate));
  Ok(Json(LegalizationReport { advances, rollup }))
}
