//! Read-only queries and statistics over the in-memory document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use serde::Serialize;

use super::Registry;
use crate::{
  Error, Result,
  record::{PromoRecord, RecordKey, RecordSource, RecordStatus},
};

// ─── Result types ────────────────────────────────────────────────────────────

/// Counts by status and by source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
  pub total_records:    usize,
  pub active_records:   usize,
  pub deleted_records:  usize,
  pub archived_records: usize,
  pub manual_records:   usize,
  pub jira_records:     usize,
  pub last_sync:        DateTime<Utc>,
}

/// [`RegistryStats`] plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStats {
  #[serde(flatten)]
  pub stats:              RegistryStats,
  pub last_backup:        DateTime<Utc>,
  pub total_operations:   u64,
  /// Earliest `registeredAt` across all records.
  pub oldest_record:      Option<DateTime<Utc>>,
  /// Latest `registeredAt` across all records.
  pub newest_record:      Option<DateTime<Utc>>,
  pub backup_history_len: usize,
  pub backup_history:     Vec<DateTime<Utc>>,
}

/// Active promotions in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
  /// `YYYY-MM`.
  pub period:        String,
  pub total:         usize,
  pub jira:          usize,
  pub manual:        usize,
  /// `total` divided by the number of days in the month.
  pub daily_average: f64,
}

// ─── Calendar helpers ────────────────────────────────────────────────────────

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
  NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::InvalidMonth { year, month })
}

fn days_in_month(first: NaiveDate) -> u32 {
  first
    .iter_days()
    .take_while(|d| d.month() == first.month())
    .count() as u32
}

// ─── Queries ─────────────────────────────────────────────────────────────────

impl<S, C> Registry<S, C> {
  /// Active records on `date`.
  pub fn records_for_date(&self, date: NaiveDate) -> Vec<&PromoRecord> {
    self
      .doc
      .records
      .range(RecordKey::new(date, String::new())..)
      .take_while(|(key, _)| key.date == date)
      .map(|(_, record)| record)
      .filter(|record| record.is_active())
      .collect()
  }

  /// Active records in the given month (`month` is `1..=12`).
  pub fn records_for_month(&self, year: i32, month: u32) -> Result<Vec<&PromoRecord>> {
    let first = first_of_month(year, month)?;
    Ok(
      self
        .doc
        .records
        .range(RecordKey::new(first, String::new())..)
        .take_while(|(key, _)| key.date.year() == year && key.date.month() == month)
        .map(|(_, record)| record)
        .filter(|record| record.is_active())
        .collect(),
    )
  }

  /// Every day of the month with no active record.
  pub fn days_without_promos(&self, year: i32, month: u32) -> Result<Vec<NaiveDate>> {
    let first = first_of_month(year, month)?;
    let covered: BTreeSet<NaiveDate> = self
      .records_for_month(year, month)?
      .into_iter()
      .map(|record| record.date)
      .collect();
    Ok(
      first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter(|d| !covered.contains(d))
        .collect(),
    )
  }

  /// Every record currently in `deleted` status, for auditing.
  pub fn deleted_records(&self) -> Vec<&PromoRecord> {
    self
      .doc
      .records
      .values()
      .filter(|r| r.status == RecordStatus::Deleted)
      .collect()
  }

  pub fn stats(&self) -> RegistryStats {
    RegistryStats {
      total_records:    self.doc.records.len(),
      active_records:   self.doc.count_status(RecordStatus::Active),
      deleted_records:  self.doc.count_status(RecordStatus::Deleted),
      archived_records: self.doc.count_status(RecordStatus::Archived),
      manual_records:   self.doc.count_source(RecordSource::Manual),
      jira_records:     self.doc.count_source(RecordSource::Jira),
      last_sync:        self.doc.last_sync,
    }
  }

  pub fn advanced_stats(&self) -> AdvancedStats {
    let registered = self.doc.records.values().map(|r| r.registered_at);
    AdvancedStats {
      stats:              self.stats(),
      last_backup:        self.doc.last_backup,
      total_operations:   self.doc.total_operations,
      oldest_record:      registered.clone().min(),
      newest_record:      registered.max(),
      backup_history_len: self.doc.backup_history.len(),
      backup_history:     self.doc.backup_history.iter().copied().collect(),
    }
  }

  /// Per-month totals over active records, newest month first.
  pub fn monthly_summary(&self) -> Vec<MonthSummary> {
    let mut months: BTreeMap<(i32, u32), (usize, usize)> = BTreeMap::new();
    for record in self.doc.records.values().filter(|r| r.is_active()) {
      let entry = months.entry((record.date.year(), record.date.month())).or_default();
      match record.source {
        RecordSource::Jira => entry.0 += 1,
        RecordSource::Manual => entry.1 += 1,
      }
    }

    months
      .into_iter()
      .rev()
      .filter_map(|((year, month), (jira, manual))| {
        let first = first_of_month(year, month).ok()?;
        let total = jira + manual;
        Some(MonthSummary {
          period: format!("{year:04}-{month:02}"),
          total,
          jira,
          manual,
          daily_average: total as f64 / f64::from(days_in_month(first)),
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn days_in_month_handles_leap_years() {
    let feb_2024 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let feb_2025 = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let dec_2025 = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
    assert_eq!(days_in_month(feb_2024), 29);
    assert_eq!(days_in_month(feb_2025), 28);
    assert_eq!(days_in_month(dec_2025), 31);
  }

  #[test]
  fn month_out_of_range_is_rejected() {
    assert!(matches!(first_of_month(2025, 13), Err(Error::InvalidMonth { month: 13, .. })));
    assert!(matches!(first_of_month(2025, 0), Err(Error::InvalidMonth { month: 0, .. })));
  }
}
