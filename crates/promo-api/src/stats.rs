//! Handlers for statistics endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stats` | Counts by status and source |
//! | `GET`  | `/stats/advanced` | Adds backup and operation bookkeeping |
//! | `GET`  | `/monthly` | Per-month totals, newest first |

use axum::{Json, extract::State};
use promo_core::{
  registry::{AdvancedStats, MonthSummary, RegistryStats},
  slot::SlotStore,
};

use crate::SharedRegistry;

/// `GET /stats`
pub async fn basic<S: SlotStore>(State(registry): State<SharedRegistry<S>>) -> Json<RegistryStats> {
  Json(registry.lock().await.stats())
}

/// `GET /stats/advanced`
pub async fn advanced<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
) -> Json<AdvancedStats> {
  Json(registry.lock().await.advanced_stats())
}

/// `GET /monthly`
pub async fn monthly<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
) -> Json<Vec<MonthSummary>> {
  Json(registry.lock().await.monthly_summary())
}
