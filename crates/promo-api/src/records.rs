//! Handlers for `/records` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records?date=YYYY-MM-DD` | Active records on one day |
//! | `GET`  | `/records/deleted` | Every soft-deleted record |
//! | `POST` | `/records/{date}/{key}/delete` | Soft delete |
//! | `POST` | `/records/{date}/{key}/restore` | Deleted → active |
//! | `POST` | `/records/{date}/{key}/archive` | One-way |
//!
//! The lifecycle endpoints answer `{"changed": bool}`; `false` means the
//! record was absent or already in a state the transition does not apply to.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use promo_core::{
  record::{PromoRecord, parse_date},
  slot::SlotStore,
};
use serde::{Deserialize, Serialize};

use crate::{SharedRegistry, error::ApiError};

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub date: String,
}

/// `GET /records?date=YYYY-MM-DD`
pub async fn by_date<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<PromoRecord>>, ApiError> {
  let date = parse_date(&params.date)?;
  let registry = registry.lock().await;
  Ok(Json(registry.records_for_date(date).into_iter().cloned().collect()))
}

/// `GET /records/deleted`
pub async fn deleted<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
) -> Json<Vec<PromoRecord>> {
  let registry = registry.lock().await;
  Json(registry.deleted_records().into_iter().cloned().collect())
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Changed {
  pub changed: bool,
}

/// `POST /records/{date}/{key}/delete`
pub async fn mark_deleted<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((date, key)): Path<(String, String)>,
) -> Result<Json<Changed>, ApiError> {
  let date = parse_date(&date)?;
  let changed = registry.lock().await.mark_deleted(date, &key).await;
  Ok(Json(Changed { changed }))
}

/// `POST /records/{date}/{key}/restore`
pub async fn restore<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((date, key)): Path<(String, String)>,
) -> Result<Json<Changed>, ApiError> {
  let date = parse_date(&date)?;
  let changed = registry.lock().await.restore(date, &key).await;
  Ok(Json(Changed { changed }))
}

/// `POST /records/{date}/{key}/archive`
pub async fn archive<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((date, key)): Path<(String, String)>,
) -> Result<Json<Changed>, ApiError> {
  let date = parse_date(&date)?;
  let changed = registry.lock().await.archive(date, &key).await;
  Ok(Json(Changed { changed }))
}
