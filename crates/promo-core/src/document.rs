//! The persisted root object and the envelopes it travels in.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{PromoRecord, RecordKey, RecordSource, RecordStatus};

/// Schema version stamped on every document this crate writes.
pub const CURRENT_VERSION: &str = "2.0.0";

/// Version assumed for documents that carry no `version` field.
pub const LEGACY_VERSION: &str = "1.0.0";

// ─── Document ────────────────────────────────────────────────────────────────

/// The whole registry: every record ever known plus bookkeeping.
///
/// On disk `records` is a JSON array; in memory it is indexed by identity
/// pair, which makes duplicates unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
  #[serde(with = "records_list")]
  pub records:          BTreeMap<RecordKey, PromoRecord>,
  pub last_sync:        DateTime<Utc>,
  pub last_backup:      DateTime<Utc>,
  pub version:          String,
  /// Incremented on every persisted mutation; drives count-based backups.
  pub total_operations: u64,
  /// Most recent backup timestamps, oldest first.
  pub backup_history:   VecDeque<DateTime<Utc>>,
}

impl RegistryDocument {
  /// An empty document for a first run.
  pub fn new(now: DateTime<Utc>) -> Self {
    Self {
      records:          BTreeMap::new(),
      last_sync:        now,
      last_backup:      now,
      version:          CURRENT_VERSION.to_owned(),
      total_operations: 0,
      backup_history:   VecDeque::new(),
    }
  }

  pub fn get(&self, key: &RecordKey) -> Option<&PromoRecord> { self.records.get(key) }

  pub fn count_status(&self, status: RecordStatus) -> usize {
    self.records.values().filter(|r| r.status == status).count()
  }

  pub fn count_source(&self, source: RecordSource) -> usize {
    self.records.values().filter(|r| r.source == source).count()
  }

  /// Append a backup timestamp, evicting the oldest entries beyond `cap`.
  pub fn push_backup(&mut self, at: DateTime<Utc>, cap: usize) {
    self.last_backup = at;
    self.backup_history.push_back(at);
    while self.backup_history.len() > cap {
      self.backup_history.pop_front();
    }
  }
}

/// Serialises the record map as a plain array and folds an array back into
/// the map. Legacy documents may repeat an identity pair; the most recently
/// modified row wins.
mod records_list {
  use std::collections::BTreeMap;

  use serde::{Deserialize as _, Deserializer, Serializer};

  use crate::record::{PromoRecord, RecordKey};

  pub fn serialize<S: Serializer>(
    records: &BTreeMap<RecordKey, PromoRecord>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    s.collect_seq(records.values())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<BTreeMap<RecordKey, PromoRecord>, D::Error> {
    let rows = Vec::<PromoRecord>::deserialize(d)?;
    let mut records = BTreeMap::new();
    for row in rows {
      let key = row.key();
      match records.get(&key) {
        Some(kept) if kept_is_newer(kept, &row) => {
          tracing::warn!(%key, "dropping stale duplicate record");
        }
        Some(_) => {
          tracing::warn!(%key, "replacing stale duplicate record");
          records.insert(key, row);
        }
        None => {
          records.insert(key, row);
        }
      }
    }
    Ok(records)
  }

  fn kept_is_newer(kept: &PromoRecord, incoming: &PromoRecord) -> bool {
    kept.last_modified >= incoming.last_modified
  }
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// How a backup was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
  Manual,
  Auto,
}

/// A full document snapshot as written to the backup slot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot<'a> {
  #[serde(flatten)]
  pub document:          &'a RegistryDocument,
  pub backup_created_at: DateTime<Utc>,
  pub backup_type:       BackupKind,
}

/// A full document as handed out for download.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope<'a> {
  #[serde(flatten)]
  pub document:    &'a RegistryDocument,
  pub exported_at: DateTime<Utc>,
  pub export_type: &'static str,
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeDelta, TimeZone as _};

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap() }

  #[test]
  fn backup_history_evicts_oldest_first() {
    let mut doc = RegistryDocument::new(t0());
    for i in 0..12 {
      doc.push_backup(t0() + TimeDelta::minutes(i), 10);
    }
    assert_eq!(doc.backup_history.len(), 10);
    assert_eq!(doc.backup_history.front(), Some(&(t0() + TimeDelta::minutes(2))));
    assert_eq!(doc.last_backup, t0() + TimeDelta::minutes(11));
  }

  #[test]
  fn duplicate_rows_collapse_to_newest() {
    let date = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
    let old = PromoRecord::new(
      RecordKey::new(date, "ABC-1"),
      "old title".into(),
      RecordSource::Jira,
      None,
      t0(),
    );
    let mut new = old.clone();
    new.issue_summary = "new title".into();
    new.last_modified = t0() + TimeDelta::hours(1);

    let mut doc = RegistryDocument::new(t0());
    doc.records.insert(old.key(), old.clone());
    let mut json = serde_json::to_value(&doc).unwrap();
    json["records"] = serde_json::json!([new, old]);

    let decoded: RegistryDocument = serde_json::from_value(json).unwrap();
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decoded.records.values().next().unwrap().issue_summary, "new title");
  }

  #[test]
  fn snapshot_flattens_document_fields() {
    let doc = RegistryDocument::new(t0());
    let snapshot = BackupSnapshot {
      document:          &doc,
      backup_created_at: t0(),
      backup_type:       BackupKind::Manual,
    };
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["version"], CURRENT_VERSION);
    assert_eq!(json["backupType"], "manual");
    assert!(json["records"].as_array().unwrap().is_empty());
  }
}
