//! Promotion records, the unit of the registry.
//!
//! A record is one promotion on one calendar day, identified by the pair
//! `(date, issueKey)`. Records are never duplicated: every write path looks
//! the pair up first and updates in place.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, clock::format_timestamp};

/// The canonical on-disk and on-wire calendar date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date. Timestamps are rejected: a date
/// carrying a time of day or an offset is ambiguous about which day it means.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
    .map_err(|_| Error::InvalidDate(s.to_owned()))
}

// ─── Provenance & status ─────────────────────────────────────────────────────

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
  /// Observed in the ticket tracker; subject to reconciliation.
  Jira,
  /// Entered by a user; reconciliation never touches it.
  Manual,
}

/// Lifecycle state of a record.
///
/// `Active ⇄ Deleted`, and `Active | Deleted → Archived` (one-way).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
  Active,
  Deleted,
  Archived,
}

impl RecordStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The identity pair of a record. Orders by date first, so a map keyed by
/// `RecordKey` can answer day and month queries with a range scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
  pub date:      NaiveDate,
  pub issue_key: String,
}

impl RecordKey {
  pub fn new(date: NaiveDate, issue_key: impl Into<String>) -> Self {
    Self { date, issue_key: issue_key.into() }
  }
}

impl fmt::Display for RecordKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.date.format(DATE_FORMAT), self.issue_key)
  }
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

/// One entry of a record's append-only `syncHistory`.
///
/// Persisted as a string: a bare timestamp for an upsert, otherwise
/// `<event>:<timestamp>`. Strings that match neither shape are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SyncEntry {
  Synced(DateTime<Utc>),
  Deleted(DateTime<Utc>),
  Restored(DateTime<Utc>),
  /// Restored implicitly because the promotion was observed again.
  Revived(DateTime<Utc>),
  Archived(DateTime<Utc>),
  Other(String),
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

impl From<String> for SyncEntry {
  fn from(raw: String) -> Self {
    let tagged: [(&str, fn(DateTime<Utc>) -> SyncEntry); 4] = [
      ("deleted:", SyncEntry::Deleted),
      ("restored:", SyncEntry::Restored),
      ("revived:", SyncEntry::Revived),
      ("archived:", SyncEntry::Archived),
    ];
    for (prefix, variant) in tagged {
      if let Some(at) = raw.strip_prefix(prefix).and_then(parse_ts) {
        return variant(at);
      }
    }
    match parse_ts(&raw) {
      Some(at) => Self::Synced(at),
      None => Self::Other(raw),
    }
  }
}

impl From<SyncEntry> for String {
  fn from(entry: SyncEntry) -> Self {
    match entry {
      SyncEntry::Synced(at) => format_timestamp(at),
      SyncEntry::Deleted(at) => format!("deleted:{}", format_timestamp(at)),
      SyncEntry::Restored(at) => format!("restored:{}", format_timestamp(at)),
      SyncEntry::Revived(at) => format!("revived:{}", format_timestamp(at)),
      SyncEntry::Archived(at) => format!("archived:{}", format_timestamp(at)),
      SyncEntry::Other(raw) => raw,
    }
  }
}

/// Audit metadata carried by every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_jira_url: Option<String>,
  /// Backups taken while this record existed.
  #[serde(default)]
  pub backup_count:      u32,
  #[serde(default)]
  pub sync_history:      Vec<SyncEntry>,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One observed or manually-declared promotion on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoRecord {
  #[serde(with = "calendar_date")]
  pub date:          NaiveDate,
  pub issue_key:     String,
  pub issue_summary: String,
  pub source:        RecordSource,
  pub status:        RecordStatus,
  pub registered_at: DateTime<Utc>,
  pub last_modified: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deleted_at:    Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub restored_at:   Option<DateTime<Utc>>,
  #[serde(default)]
  pub metadata:      RecordMetadata,
}

impl PromoRecord {
  /// A freshly registered, active record.
  pub fn new(
    key: RecordKey,
    issue_summary: String,
    source: RecordSource,
    original_jira_url: Option<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      date: key.date,
      issue_key: key.issue_key,
      issue_summary,
      source,
      status: RecordStatus::Active,
      registered_at: now,
      last_modified: now,
      deleted_at: None,
      restored_at: None,
      metadata: RecordMetadata {
        original_jira_url,
        backup_count: 0,
        sync_history: vec![SyncEntry::Synced(now)],
      },
    }
  }

  pub fn key(&self) -> RecordKey { RecordKey::new(self.date, self.issue_key.clone()) }

  pub fn is_active(&self) -> bool { self.status.is_active() }
}

/// Serde adapter pinning `NaiveDate` to `YYYY-MM-DD`.
mod calendar_date {
  use chrono::NaiveDate;
  use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

  use super::DATE_FORMAT;

  pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(D::Error::custom)
  }
}

// ─── Observations ────────────────────────────────────────────────────────────

/// One promotion observed in the ticket tracker, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedPromo {
  #[serde(with = "calendar_date")]
  pub date:          NaiveDate,
  pub issue_key:     String,
  pub issue_summary: String,
}

impl ObservedPromo {
  pub fn new(date: NaiveDate, issue_key: impl Into<String>, issue_summary: impl Into<String>) -> Self {
    Self {
      date,
      issue_key: issue_key.into(),
      issue_summary: issue_summary.into(),
    }
  }
}

/// An observation as received over the wire, before validation. Every field
/// is optional so one bad tuple can be rejected without failing the batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservedPromo {
  pub date:          Option<String>,
  pub issue_key:     Option<String>,
  pub issue_summary: Option<String>,
}

impl TryFrom<RawObservedPromo> for ObservedPromo {
  type Error = Error;

  fn try_from(raw: RawObservedPromo) -> Result<Self> {
    let date = raw
      .date
      .as_deref()
      .ok_or_else(|| Error::InvalidObservation("missing date".into()))
      .and_then(parse_date)?;
    let issue_key = raw
      .issue_key
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| Error::InvalidObservation("missing issueKey".into()))?;
    let issue_summary = raw
      .issue_summary
      .ok_or_else(|| Error::InvalidObservation(format!("missing issueSummary for {issue_key}")))?;
    Ok(Self { date, issue_key, issue_summary })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn at(h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 7, 23, h, 0, 0).unwrap() }

  #[test]
  fn sync_entry_strings_roundtrip_by_kind() {
    let raw = "deleted:2025-07-23T10:00:00.000Z".to_string();
    let entry = SyncEntry::from(raw.clone());
    assert_eq!(entry, SyncEntry::Deleted(at(10)));
    assert_eq!(String::from(entry), raw);

    assert_eq!(SyncEntry::from("2025-07-23T10:00:00Z".to_string()), SyncEntry::Synced(at(10)));
    assert_eq!(
      SyncEntry::from("revived:2025-07-23T11:00:00.000Z".to_string()),
      SyncEntry::Revived(at(11))
    );
  }

  #[test]
  fn unknown_sync_entry_is_preserved() {
    let entry = SyncEntry::from("imported-by-hand".to_string());
    assert_eq!(entry, SyncEntry::Other("imported-by-hand".into()));
    assert_eq!(String::from(entry), "imported-by-hand");
  }

  #[test]
  fn record_serializes_camel_case_with_plain_date() {
    let date = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
    let record = PromoRecord::new(
      RecordKey::new(date, "ABC-1"),
      "Promo A".into(),
      RecordSource::Jira,
      None,
      at(9),
    );
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["date"], "2025-07-23");
    assert_eq!(json["issueKey"], "ABC-1");
    assert_eq!(json["status"], "active");
    assert_eq!(json["source"], "jira");
    assert!(json.get("deletedAt").is_none());
    assert_eq!(json["metadata"]["syncHistory"][0], "2025-07-23T09:00:00.000Z");
  }

  #[test]
  fn keys_order_by_date_then_issue() {
    let d1 = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
    assert!(RecordKey::new(d1, "ZZZ-9") < RecordKey::new(d2, "AAA-1"));
    assert!(RecordKey::new(d1, "AAA-1") < RecordKey::new(d1, "AAA-2"));
  }

  #[test]
  fn raw_observation_requires_every_field() {
    let ok = RawObservedPromo {
      date:          Some("2025-07-23".into()),
      issue_key:     Some("ABC-1".into()),
      issue_summary: Some("Promo".into()),
    };
    assert!(ObservedPromo::try_from(ok.clone()).is_ok());

    let no_key = RawObservedPromo { issue_key: Some("  ".into()), ..ok.clone() };
    assert!(matches!(ObservedPromo::try_from(no_key), Err(Error::InvalidObservation(_))));

    let bad_date = RawObservedPromo { date: Some("2025-07-23T03:00:00.000Z".into()), ..ok };
    assert!(matches!(ObservedPromo::try_from(bad_date), Err(Error::InvalidDate(_))));
  }
}
