//! Export, import, and the explicit bulk cleanup.

use chrono::Months;
use serde_json::Value;

use super::Registry;
use crate::{
  Result,
  clock::Clock,
  document::ExportEnvelope,
  migrate::migrate,
  slot::SlotStore,
};

impl<S: SlotStore, C: Clock> Registry<S, C> {
  /// The full document as pretty-printed JSON, stamped with `exportedAt`.
  pub fn export(&self) -> Result<String> {
    let envelope = ExportEnvelope {
      document:    &self.doc,
      exported_at: self.clock.now(),
      export_type: "manual",
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
  }

  /// Replace the document with an exported (or any older-version) one.
  ///
  /// Parsing and migration happen before anything is touched, so a failed
  /// import leaves the registry exactly as it was. Returns the number of
  /// records imported.
  pub async fn import(&mut self, text: &str) -> Result<usize> {
    let raw: Value = serde_json::from_str(text)?;
    let doc = migrate(raw, self.clock.now())?;
    let count = doc.records.len();

    self.doc = doc;
    tracing::info!(records = count, "registry replaced by import");
    self.persist().await;
    Ok(count)
  }

  /// Physically remove non-active records dated more than `months_to_keep`
  /// months before today. Active records are always kept, whatever their
  /// date.
  ///
  /// This is the one place tracker-sourced history is destroyed. It exists
  /// to bound storage and only runs when a user asks for it.
  pub async fn cleanup_old_records(&mut self, months_to_keep: u32) -> usize {
    let today = self.clock.today();
    let cutoff = today
      .checked_sub_months(Months::new(months_to_keep))
      .unwrap_or(chrono::NaiveDate::MIN);

    let before = self.doc.records.len();
    self
      .doc
      .records
      .retain(|key, record| record.is_active() || key.date >= cutoff);
    let removed = before - self.doc.records.len();

    if removed > 0 {
      tracing::warn!(removed, %cutoff, "old inactive records permanently removed");
      self.persist().await;
    }
    removed
  }
}
