//! Schema migration for persisted registry documents.
//!
//! Migration runs on the raw JSON value, before typed decoding, so a legacy
//! document that lacks fields the typed schema requires can still be read.
//! Each step is keyed on the document's major version and only fills in what
//! is absent, which makes the whole pass idempotent.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::{
  Error, Result,
  clock::format_timestamp,
  document::{CURRENT_VERSION, LEGACY_VERSION, RegistryDocument},
};

/// Major version of [`CURRENT_VERSION`].
const CURRENT_MAJOR: u32 = 2;

/// Upgrade `raw` to the current schema and decode it.
///
/// `now` supplies the value for timestamps that must be invented
/// (`lastBackup`, or `registeredAt` on a record that never had one).
pub fn migrate(raw: Value, now: DateTime<Utc>) -> Result<RegistryDocument> {
  let upgraded = migrate_value(raw, now)?;
  Ok(serde_json::from_value(upgraded)?)
}

/// The raw half of [`migrate`]: returns the upgraded JSON without decoding.
pub fn migrate_value(raw: Value, now: DateTime<Utc>) -> Result<Value> {
  let Value::Object(mut doc) = raw else {
    return Err(Error::MalformedDocument("top level is not an object".into()));
  };

  let version = doc
    .get("version")
    .and_then(Value::as_str)
    .unwrap_or(LEGACY_VERSION)
    .to_owned();
  let major = major_version(&version)?;

  if major < 2 {
    tracing::info!(from = %version, to = CURRENT_VERSION, "migrating legacy registry document");
    upgrade_v1(&mut doc, now)?;
  } else if major > CURRENT_MAJOR {
    tracing::warn!(
      found = %version,
      supported = CURRENT_VERSION,
      "registry document is newer than this build; unknown fields will be dropped"
    );
  }

  doc.insert("version".into(), Value::String(CURRENT_VERSION.into()));
  Ok(Value::Object(doc))
}

fn major_version(version: &str) -> Result<u32> {
  version
    .split('.')
    .next()
    .and_then(|major| major.trim().parse().ok())
    .ok_or_else(|| Error::UnsupportedVersion(version.to_owned()))
}

/// 1.x → 2.x: bookkeeping fields and per-record audit metadata.
fn upgrade_v1(doc: &mut Map<String, Value>, now: DateTime<Utc>) -> Result<()> {
  let now_str = Value::String(format_timestamp(now));

  fill(doc, "lastSync", now_str.clone());
  fill(doc, "lastBackup", now_str.clone());
  fill(doc, "totalOperations", json!(0));
  fill(doc, "backupHistory", json!([]));
  fill(doc, "records", json!([]));

  let Some(records) = doc.get_mut("records").and_then(Value::as_array_mut) else {
    return Err(Error::MalformedDocument("records is not an array".into()));
  };

  let mut upgraded = 0usize;
  for record in records.iter_mut() {
    let Value::Object(record) = record else {
      return Err(Error::MalformedDocument("record is not an object".into()));
    };
    fill(record, "registeredAt", now_str.clone());
    let registered = record.get("registeredAt").cloned().unwrap_or_else(|| now_str.clone());
    fill(record, "lastModified", registered);
    fill(record, "source", json!("jira"));
    fill(record, "status", json!("active"));
    fill(record, "metadata", json!({ "backupCount": 0, "syncHistory": [] }));
    upgraded += 1;
  }

  tracing::info!(records = upgraded, "legacy records upgraded");
  Ok(())
}

/// Insert `value` under `key` unless a non-null value is already there.
fn fill(map: &mut Map<String, Value>, key: &str, value: Value) {
  match map.get(key) {
    Some(existing) if !existing.is_null() => {}
    _ => {
      map.insert(key.to_owned(), value);
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeDelta, TimeZone as _};

  use super::*;
  use crate::record::{RecordKey, RecordStatus, SyncEntry};

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap() }

  fn legacy() -> Value {
    json!({
      "records": [
        {
          "date": "2025-07-23",
          "issueKey": "ABC-1",
          "issueSummary": "Promo A 23 DE JULIO",
          "registeredAt": "2025-07-01T09:00:00.000Z",
          "source": "jira",
          "status": "deleted"
        },
        {
          "date": "2025-07-24",
          "issueKey": "MANUAL-1720000000000",
          "issueSummary": "Special offer",
          "registeredAt": "2025-07-02T09:00:00.000Z",
          "lastModified": "2025-07-03T09:00:00.000Z",
          "source": "manual",
          "status": "active",
          "metadata": { "syncHistory": ["2025-07-02T09:00:00.000Z"] }
        }
      ],
      "lastSync": "2025-07-05T00:00:00.000Z"
    })
  }

  #[test]
  fn legacy_document_gains_defaults() {
    let doc = migrate(legacy(), now()).unwrap();

    assert_eq!(doc.version, CURRENT_VERSION);
    assert_eq!(doc.total_operations, 0);
    assert_eq!(doc.last_backup, now());
    assert!(doc.backup_history.is_empty());
    assert_eq!(doc.last_sync, Utc.with_ymd_and_hms(2025, 7, 5, 0, 0, 0).unwrap());

    let date = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
    let a = doc.get(&RecordKey::new(date, "ABC-1")).unwrap();
    assert_eq!(a.status, RecordStatus::Deleted);
    assert_eq!(a.last_modified, a.registered_at);
    assert_eq!(a.metadata.backup_count, 0);
    assert!(a.metadata.sync_history.is_empty());
  }

  #[test]
  fn existing_record_metadata_is_kept() {
    let doc = migrate(legacy(), now()).unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
    let manual = doc.get(&RecordKey::new(date, "MANUAL-1720000000000")).unwrap();
    assert_eq!(
      manual.metadata.sync_history,
      vec![SyncEntry::Synced(Utc.with_ymd_and_hms(2025, 7, 2, 9, 0, 0).unwrap())]
    );
    assert_eq!(manual.last_modified, Utc.with_ymd_and_hms(2025, 7, 3, 9, 0, 0).unwrap());
  }

  #[test]
  fn migration_is_idempotent() {
    let once = migrate(legacy(), now()).unwrap();
    let reencoded = serde_json::to_value(&once).unwrap();
    let twice = migrate(reencoded, now() + TimeDelta::days(3)).unwrap();
    assert_eq!(once, twice);
  }

  #[test]
  fn current_document_only_gets_version_stamp() {
    let current = RegistryDocument::new(now());
    let raw = serde_json::to_value(&current).unwrap();
    assert_eq!(migrate_value(raw.clone(), now()).unwrap(), raw);
  }

  #[test]
  fn newer_major_is_accepted_and_restamped() {
    let mut raw = serde_json::to_value(RegistryDocument::new(now())).unwrap();
    raw["version"] = json!("3.1.0");
    raw["someFutureField"] = json!(true);
    let doc = migrate(raw, now()).unwrap();
    assert_eq!(doc.version, CURRENT_VERSION);
  }

  #[test]
  fn rejects_non_objects_and_garbage_versions() {
    assert!(matches!(migrate(json!([1, 2]), now()), Err(Error::MalformedDocument(_))));
    let raw = json!({ "version": "banana", "records": [] });
    assert!(matches!(migrate(raw, now()), Err(Error::UnsupportedVersion(_))));
  }

  #[test]
  fn legacy_records_must_be_an_array() {
    let raw = json!({ "records": { "not": "a list" } });
    assert!(matches!(migrate(raw, now()), Err(Error::MalformedDocument(_))));
  }
}
