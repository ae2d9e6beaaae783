//! Reconciliation of a freshly observed batch against the ledger.
//!
//! The tracker is lossy and mutable, so nothing observed is ever allowed to
//! erase history: new promotions are created, vanished ones are marked
//! deleted, and reappearing ones are revived. Manual records are exempt.

use std::collections::HashSet;

use serde::Serialize;

use super::{Registry, UpsertOutcome};
use crate::{
  clock::Clock,
  record::{ObservedPromo, RawObservedPromo, RecordKey, RecordSource},
  slot::SlotStore,
};

/// Per-batch tallies from [`Registry::sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub created: usize,
  pub updated: usize,
  pub revived: usize,
  pub deleted: usize,
  /// Observations rejected: malformed, colliding with a manual record, or
  /// pointing at an archived record.
  pub skipped: usize,
}

impl<S: SlotStore, C: Clock> Registry<S, C> {
  /// Merge `observed` into the registry and persist once.
  ///
  /// Re-running with the same batch is a no-op apart from timestamps.
  /// Duplicate pairs within a batch are harmless.
  pub async fn sync(&mut self, observed: impl IntoIterator<Item = ObservedPromo>) -> SyncReport {
    let now = self.clock.now();
    let mut report = SyncReport::default();

    let previously_active: Vec<RecordKey> = self
      .doc
      .records
      .values()
      .filter(|r| r.is_active() && r.source == RecordSource::Jira)
      .map(|r| r.key())
      .collect();

    let mut seen = HashSet::new();
    for promo in observed {
      if promo.issue_key.trim().is_empty() {
        tracing::warn!(date = %promo.date, "skipping observation without an issue key");
        report.skipped += 1;
        continue;
      }

      let key = RecordKey::new(promo.date, promo.issue_key);
      if let Some(existing) = self.doc.get(&key)
        && existing.source == RecordSource::Manual
      {
        tracing::warn!(%key, "observation collides with a manual record; skipping");
        report.skipped += 1;
        continue;
      }

      match self.apply_upsert(key.clone(), promo.issue_summary, RecordSource::Jira, now) {
        UpsertOutcome::Created => report.created += 1,
        UpsertOutcome::Updated => report.updated += 1,
        UpsertOutcome::Revived => report.revived += 1,
        UpsertOutcome::Archived => report.skipped += 1,
      }
      seen.insert(key);
    }

    for key in previously_active {
      if !seen.contains(&key) && self.apply_mark_deleted(&key, now) {
        tracing::info!(%key, "promotion no longer observed");
        report.deleted += 1;
      }
    }

    self.doc.last_sync = now;
    tracing::info!(
      created = report.created,
      updated = report.updated,
      revived = report.revived,
      deleted = report.deleted,
      skipped = report.skipped,
      total = self.doc.records.len(),
      "sync complete"
    );

    self.persist().await;
    report
  }

  /// Validate loosely-typed observations one by one, then [`sync`] the
  /// valid ones. A malformed tuple is logged and counted, never fatal.
  ///
  /// [`sync`]: Registry::sync
  pub async fn sync_raw(&mut self, observed: Vec<RawObservedPromo>) -> SyncReport {
    let mut rejected = 0;
    let mut valid = Vec::with_capacity(observed.len());
    for (index, raw) in observed.into_iter().enumerate() {
      match ObservedPromo::try_from(raw) {
        Ok(promo) => valid.push(promo),
        Err(e) => {
          tracing::warn!(index, error = %e, "rejecting malformed observation");
          rejected += 1;
        }
      }
    }

    let mut report = self.sync(valid).await;
    report.skipped += rejected;
    report
  }
}
