//! Handlers for `/months` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/months/{year}/{month}` | Active records; `month` is 1–12 |
//! | `GET`  | `/months/{year}/{month}/missing` | Days with no active record |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::NaiveDate;
use promo_core::{record::PromoRecord, slot::SlotStore};

use crate::{SharedRegistry, error::ApiError};

/// `GET /months/{year}/{month}`
pub async fn records<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<PromoRecord>>, ApiError> {
  let registry = registry.lock().await;
  let records = registry.records_for_month(year, month)?;
  Ok(Json(records.into_iter().cloned().collect()))
}

/// `GET /months/{year}/{month}/missing`
pub async fn missing<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
  Ok(Json(registry.lock().await.days_without_promos(year, month)?))
}
