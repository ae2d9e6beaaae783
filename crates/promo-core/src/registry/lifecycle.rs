//! Record lifecycle: create, update, soft-delete, restore, archive.
//!
//! Every public method persists when it changes something. The `apply_*`
//! helpers mutate the document only, so reconciliation can apply a whole
//! batch and persist once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::Registry;
use crate::{
  clock::Clock,
  record::{PromoRecord, RecordKey, RecordSource, RecordStatus, SyncEntry},
  slot::SlotStore,
};

/// What an upsert did to the record at its identity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
  Created,
  Updated,
  /// The record was `deleted` and is `active` again.
  Revived,
  /// The record is archived; nothing was changed.
  Archived,
}

impl<S: SlotStore, C: Clock> Registry<S, C> {
  /// Register a promotion, or refresh the existing record for the same
  /// `(date, issue_key)`. A deleted record is revived; an archived one is
  /// left alone.
  pub async fn upsert(
    &mut self,
    date: NaiveDate,
    issue_key: &str,
    issue_summary: &str,
    source: RecordSource,
  ) -> UpsertOutcome {
    let now = self.clock.now();
    let outcome = self.apply_upsert(
      RecordKey::new(date, issue_key),
      issue_summary.to_owned(),
      source,
      now,
    );
    if outcome != UpsertOutcome::Archived {
      self.persist().await;
    }
    outcome
  }

  /// Soft-delete a record. Returns `false` if there is no such record or it
  /// is not active; the row itself is never removed.
  pub async fn mark_deleted(&mut self, date: NaiveDate, issue_key: &str) -> bool {
    let now = self.clock.now();
    let changed = self.apply_mark_deleted(&RecordKey::new(date, issue_key), now);
    if changed {
      self.persist().await;
    }
    changed
  }

  /// Bring a deleted record back. Returns `false` unless the record exists
  /// and is currently `deleted`.
  pub async fn restore(&mut self, date: NaiveDate, issue_key: &str) -> bool {
    let now = self.clock.now();
    let key = RecordKey::new(date, issue_key);
    let Some(record) = self.doc.records.get_mut(&key) else {
      return false;
    };
    if record.status != RecordStatus::Deleted {
      return false;
    }

    record.status = RecordStatus::Active;
    record.last_modified = now;
    record.restored_at = Some(now);
    record.metadata.sync_history.push(SyncEntry::Restored(now));
    tracing::info!(%key, "promotion restored manually");

    self.persist().await;
    true
  }

  /// Move an active or deleted record to cold storage. One-way: archived
  /// records are excluded from active queries, never revived by sync, and
  /// never archived twice.
  pub async fn archive(&mut self, date: NaiveDate, issue_key: &str) -> bool {
    let now = self.clock.now();
    let key = RecordKey::new(date, issue_key);
    let Some(record) = self.doc.records.get_mut(&key) else {
      return false;
    };
    if record.status == RecordStatus::Archived {
      return false;
    }

    record.status = RecordStatus::Archived;
    record.last_modified = now;
    record.metadata.sync_history.push(SyncEntry::Archived(now));
    tracing::info!(%key, "promotion archived");

    self.persist().await;
    true
  }

  /// Add a user-entered promotion under a generated `MANUAL-<millis>` key.
  pub async fn add_manual_promo(&mut self, date: NaiveDate, description: &str) -> RecordKey {
    let now = self.clock.now();
    let mut millis = now.timestamp_millis();
    let key = loop {
      let candidate = RecordKey::new(date, format!("MANUAL-{millis}"));
      if !self.doc.records.contains_key(&candidate) {
        break candidate;
      }
      millis += 1;
    };

    self.apply_upsert(key.clone(), description.to_owned(), RecordSource::Manual, now);
    tracing::info!(%key, "manual promotion added");
    self.persist().await;
    key
  }

  /// Physically remove a manual record. Tracker-sourced records cannot be
  /// removed this way; they only ever transition status.
  pub async fn remove_manual(&mut self, date: NaiveDate, issue_key: &str) -> bool {
    let key = RecordKey::new(date, issue_key);
    match self.doc.records.get(&key) {
      Some(record) if record.source == RecordSource::Manual => {}
      Some(_) => {
        tracing::warn!(%key, "refusing to remove a non-manual record");
        return false;
      }
      None => return false,
    }

    self.doc.records.remove(&key);
    tracing::info!(%key, "manual promotion removed");
    self.persist().await;
    true
  }

  pub(super) fn apply_upsert(
    &mut self,
    key: RecordKey,
    issue_summary: String,
    source: RecordSource,
    now: DateTime<Utc>,
  ) -> UpsertOutcome {
    let jira_url = match source {
      RecordSource::Jira => self.config.issue_url(&key.issue_key),
      RecordSource::Manual => None,
    };

    let Some(record) = self.doc.records.get_mut(&key) else {
      tracing::debug!(%key, ?source, "registering new promotion");
      let record = PromoRecord::new(key.clone(), issue_summary, source, jira_url, now);
      self.doc.records.insert(key, record);
      return UpsertOutcome::Created;
    };

    match record.status {
      RecordStatus::Archived => {
        tracing::debug!(%key, "upsert ignored for archived record");
        UpsertOutcome::Archived
      }
      RecordStatus::Deleted => {
        record.issue_summary = issue_summary;
        record.status = RecordStatus::Active;
        record.last_modified = now;
        record.restored_at = Some(now);
        record.metadata.sync_history.push(SyncEntry::Revived(now));
        if jira_url.is_some() {
          record.metadata.original_jira_url = jira_url;
        }
        tracing::info!(%key, "promotion revived");
        UpsertOutcome::Revived
      }
      RecordStatus::Active => {
        record.issue_summary = issue_summary;
        record.last_modified = now;
        record.metadata.sync_history.push(SyncEntry::Synced(now));
        if jira_url.is_some() {
          record.metadata.original_jira_url = jira_url;
        }
        UpsertOutcome::Updated
      }
    }
  }

  pub(super) fn apply_mark_deleted(&mut self, key: &RecordKey, now: DateTime<Utc>) -> bool {
    let Some(record) = self.doc.records.get_mut(key) else {
      return false;
    };
    if record.status != RecordStatus::Active {
      return false;
    }

    record.status = RecordStatus::Deleted;
    record.last_modified = now;
    record.deleted_at = Some(now);
    record.metadata.sync_history.push(SyncEntry::Deleted(now));
    tracing::info!(%key, "promotion marked deleted; history retained");
    true
  }
}
