//! Handlers for mutating and administrative endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/sync` | Body: array of `{date, issueKey, issueSummary}` |
//! | `POST`   | `/manual` | Body: `{"date":"YYYY-MM-DD","description":"..."}` |
//! | `DELETE` | `/manual/{date}/{key}` | Manual records only |
//! | `POST`   | `/backup` | Manual backup |
//! | `GET`    | `/export` | Download as an attachment |
//! | `POST`   | `/import` | Body: a previously exported document |
//! | `POST`   | `/cleanup` | Optional `?months=N` (default 12) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use promo_core::{
  record::{PromoRecord, RawObservedPromo, parse_date},
  registry::{BackupInfo, SyncReport},
  slot::SlotStore,
};
use serde::{Deserialize, Serialize};

use crate::{SharedRegistry, error::ApiError, records::Changed};

// ─── Sync ────────────────────────────────────────────────────────────────────

/// `POST /sync`
///
/// Malformed entries are counted in `skipped` rather than failing the batch.
pub async fn sync<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Json(batch): Json<Vec<RawObservedPromo>>,
) -> Json<SyncReport> {
  Json(registry.lock().await.sync_raw(batch).await)
}

// ─── Manual records ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ManualBody {
  pub date:        String,
  pub description: String,
}

/// `POST /manual`
pub async fn add_manual<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Json(body): Json<ManualBody>,
) -> Result<impl IntoResponse, ApiError> {
  let date = parse_date(&body.date)?;
  let description = body.description.trim();
  if description.is_empty() {
    return Err(ApiError::BadRequest("description must not be empty".into()));
  }

  let mut registry = registry.lock().await;
  let key = registry.add_manual_promo(date, description).await;
  let record: PromoRecord = registry
    .document()
    .get(&key)
    .cloned()
    .ok_or_else(|| ApiError::NotFound(format!("record {key} vanished after insert")))?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `DELETE /manual/{date}/{key}`
pub async fn remove_manual<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Path((date, key)): Path<(String, String)>,
) -> Result<Json<Changed>, ApiError> {
  let date = parse_date(&date)?;
  let changed = registry.lock().await.remove_manual(date, &key).await;
  Ok(Json(Changed { changed }))
}

// ─── Backup / export / import ────────────────────────────────────────────────

/// `POST /backup`
pub async fn backup<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
) -> Result<impl IntoResponse, ApiError> {
  let info: BackupInfo = registry.lock().await.manual_backup().await?;
  Ok((StatusCode::CREATED, Json(info)))
}

/// `GET /export`
pub async fn export<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
) -> Result<impl IntoResponse, ApiError> {
  let body = registry.lock().await.export()?;
  let filename = format!("promo-registry-backup-{}.json", Utc::now().format("%Y-%m-%d"));
  Ok((
    [
      (header::CONTENT_TYPE, "application/json".to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    body,
  ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Imported {
  pub imported: usize,
}

/// `POST /import`
pub async fn import<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  body: String,
) -> Result<Json<Imported>, ApiError> {
  let imported = registry.lock().await.import(&body).await?;
  Ok(Json(Imported { imported }))
}

// ─── Cleanup ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
  pub months: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Cleaned {
  pub removed: usize,
}

/// `POST /cleanup[?months=N]`
pub async fn cleanup<S: SlotStore>(
  State(registry): State<SharedRegistry<S>>,
  Query(params): Query<CleanupParams>,
) -> Json<Cleaned> {
  let months = params.months.unwrap_or(12);
  let removed = registry.lock().await.cleanup_old_records(months).await;
  Json(Cleaned { removed })
}
