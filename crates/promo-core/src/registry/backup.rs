//! Backup scheduling.
//!
//! A backup is a full snapshot written to the backup slot. Automatic backups
//! fire on every N-th operation or once the interval has elapsed since the
//! last backup; manual ones fire on request. Restoring from a backup is an
//! explicit import, never automatic (except the read fallback in
//! [`RecordStore::load`](crate::persist::RecordStore::load)).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Registry;
use crate::{
  Result,
  clock::Clock,
  document::{BackupKind, BackupSnapshot},
  slot::SlotStore,
};

/// Summary of a backup that was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
  pub created_at: DateTime<Utc>,
  pub kind:       BackupKind,
  pub records:    usize,
}

impl<S: SlotStore, C: Clock> Registry<S, C> {
  /// Take an automatic backup if the operation count or the elapsed time
  /// says one is due. Failures are logged, not returned.
  pub async fn maybe_auto_backup(&mut self) -> Option<BackupInfo> {
    let now = self.clock.now();
    let every = self.config.backup_every_operations;
    let ops = self.doc.total_operations;
    let by_count = every > 0 && ops > 0 && ops % every == 0;
    if !by_count && !self.interval_elapsed(now) {
      return None;
    }
    self.auto_backup(now).await
  }

  /// Take a backup on request, then persist the updated backup history.
  ///
  /// The save counts as an operation but skips the automatic check, so a
  /// manual backup that lands on a count boundary is not followed by an
  /// `auto` snapshot overwriting it.
  pub async fn manual_backup(&mut self) -> Result<BackupInfo> {
    let now = self.clock.now();
    let info = self.create_backup(BackupKind::Manual, now).await?;
    self.store.save(&mut self.doc).await;
    Ok(info)
  }

  /// At start-up only elapsed time counts; the operation count was already
  /// acted on when it was reached.
  pub(super) async fn startup_backup_check(&mut self) {
    let now = self.clock.now();
    if self.interval_elapsed(now) {
      self.auto_backup(now).await;
    }
  }

  fn interval_elapsed(&self, now: DateTime<Utc>) -> bool {
    now - self.doc.last_backup > self.config.backup_interval()
  }

  async fn auto_backup(&mut self, now: DateTime<Utc>) -> Option<BackupInfo> {
    match self.create_backup(BackupKind::Auto, now).await {
      Ok(info) => {
        // Record the new history without counting an operation.
        self.store.write(&self.doc).await;
        Some(info)
      }
      Err(e) => {
        tracing::warn!(error = %e, "automatic backup failed");
        None
      }
    }
  }

  async fn create_backup(&mut self, kind: BackupKind, now: DateTime<Utc>) -> Result<BackupInfo> {
    let snapshot = BackupSnapshot {
      document:          &self.doc,
      backup_created_at: now,
      backup_type:       kind,
    };
    self.store.write_backup(&snapshot).await?;

    for record in self.doc.records.values_mut() {
      record.metadata.backup_count += 1;
    }
    self.doc.push_backup(now, self.config.backup_history_cap);

    let info = BackupInfo { created_at: now, kind, records: self.doc.records.len() };
    tracing::info!(?kind, records = info.records, "backup written");
    Ok(info)
  }
}
