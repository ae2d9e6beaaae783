//! [`RecordStore`] — serialises the registry document to and from slots.
//!
//! Persistence never fails loudly. A broken primary read falls back to the
//! backup slot, then to an empty document; a broken primary write falls back
//! to the backup slot, then to "unsaved". Callers learn which happened from
//! [`LoadOutcome`] / [`SaveOutcome`] and from the logs.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  document::{BackupSnapshot, RegistryDocument},
  migrate::migrate,
  slot::{Slot, SlotStore},
};

/// Where a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
  Primary,
  /// The primary slot was absent or unreadable; the backup slot was used.
  Backup,
  /// Neither slot produced a document; a fresh one was created.
  Fresh,
}

/// What a save achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
  Saved,
  /// The primary write failed; the document went to the backup slot only.
  BackupOnly,
  /// Both writes failed; the change lives in memory only.
  Unsaved,
}

pub struct RecordStore<S> {
  slots: S,
}

impl<S: SlotStore> RecordStore<S> {
  pub fn new(slots: S) -> Self { Self { slots } }

  pub fn slots(&self) -> &S { &self.slots }

  pub fn into_inner(self) -> S { self.slots }

  /// Load and migrate the registry document.
  pub async fn load(&self, now: DateTime<Utc>) -> (RegistryDocument, LoadOutcome) {
    if let Some(doc) = self.read_document(Slot::Primary, now).await {
      tracing::info!(records = doc.records.len(), "registry loaded from primary slot");
      return (doc, LoadOutcome::Primary);
    }
    if let Some(doc) = self.read_document(Slot::Backup, now).await {
      tracing::warn!(records = doc.records.len(), "registry recovered from backup slot");
      return (doc, LoadOutcome::Backup);
    }
    tracing::info!("initialising empty registry");
    (RegistryDocument::new(now), LoadOutcome::Fresh)
  }

  /// Count one operation, then write the document.
  pub async fn save(&self, doc: &mut RegistryDocument) -> SaveOutcome {
    doc.total_operations += 1;
    self.write(doc).await
  }

  /// Write the document to the primary slot and verify it reads back,
  /// falling back to the backup slot if the write fails. Does not count as
  /// an operation.
  pub async fn write(&self, doc: &RegistryDocument) -> SaveOutcome {
    let encoded = match serde_json::to_string(doc) {
      Ok(encoded) => encoded,
      Err(e) => {
        tracing::error!(error = %e, "failed to serialise registry; nothing written");
        return SaveOutcome::Unsaved;
      }
    };

    match self.slots.write(Slot::Primary, encoded.clone()).await {
      Ok(()) => {
        self.verify(doc.records.len()).await;
        SaveOutcome::Saved
      }
      Err(e) => {
        tracing::error!(error = %e, "primary write failed; falling back to backup slot");
        match self.slots.write(Slot::Backup, encoded).await {
          Ok(()) => {
            tracing::warn!("registry saved to backup slot only");
            SaveOutcome::BackupOnly
          }
          Err(e) => {
            tracing::error!(error = %e, "backup write failed; registry is unsaved");
            SaveOutcome::Unsaved
          }
        }
      }
    }
  }

  /// Write a snapshot to the backup slot.
  pub async fn write_backup(&self, snapshot: &BackupSnapshot<'_>) -> Result<()> {
    let encoded = serde_json::to_string(snapshot)?;
    self
      .slots
      .write(Slot::Backup, encoded)
      .await
      .map_err(|e| Error::BackupFailed(e.to_string()))
  }

  async fn read_document(&self, slot: Slot, now: DateTime<Utc>) -> Option<RegistryDocument> {
    let text = match self.slots.read(slot).await {
      Ok(Some(text)) => text,
      Ok(None) => {
        tracing::debug!(%slot, "slot is empty");
        return None;
      }
      Err(e) => {
        tracing::error!(%slot, error = %e, "failed to read slot");
        return None;
      }
    };
    let decoded = serde_json::from_str::<serde_json::Value>(&text)
      .map_err(Error::from)
      .and_then(|raw| migrate(raw, now));
    match decoded {
      Ok(doc) => Some(doc),
      Err(e) => {
        tracing::error!(%slot, error = %e, "slot contents are unusable");
        None
      }
    }
  }

  /// Re-read the primary slot and check the record count survived.
  async fn verify(&self, expected: usize) {
    let readback = match self.slots.read(Slot::Primary).await {
      Ok(Some(text)) => text,
      Ok(None) => {
        tracing::error!("primary slot empty immediately after write");
        return;
      }
      Err(e) => {
        tracing::error!(error = %e, "could not re-read primary slot to verify write");
        return;
      }
    };
    match serde_json::from_str::<RegistryDocument>(&readback) {
      Ok(doc) if doc.records.len() == expected => {
        tracing::debug!(records = expected, "primary write verified");
      }
      Ok(doc) => {
        tracing::error!(expected, found = doc.records.len(), "primary write verification mismatch");
      }
      Err(e) => {
        tracing::error!(error = %e, "primary slot does not parse after write");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone as _};

  use super::*;
  use crate::{
    document::BackupKind,
    memory::{MemorySlotError, MemorySlots},
    record::{PromoRecord, RecordKey, RecordSource},
  };

  /// Writes land in `inner`, but reading the primary slot returns
  /// `readback` instead of what was written.
  struct TamperedReadback {
    inner:    MemorySlots,
    readback: Option<String>,
  }

  impl SlotStore for TamperedReadback {
    type Error = MemorySlotError;

    async fn read(&self, slot: Slot) -> Result<Option<String>, MemorySlotError> {
      match slot {
        Slot::Primary => Ok(self.readback.clone()),
        Slot::Backup => self.inner.read(slot).await,
      }
    }

    async fn write(&self, slot: Slot, contents: String) -> Result<(), MemorySlotError> {
      self.inner.write(slot, contents).await
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 7, 23, 10, 0, 0).unwrap() }

  fn doc_with_one() -> RegistryDocument {
    let mut doc = RegistryDocument::new(now());
    let key = RecordKey::new(NaiveDate::from_ymd_opt(2025, 7, 23).unwrap(), "ABC-1");
    doc.records.insert(
      key.clone(),
      PromoRecord::new(key, "Promo A".into(), RecordSource::Jira, None, now()),
    );
    doc
  }

  #[tokio::test]
  async fn empty_slots_load_fresh() {
    let store = RecordStore::new(MemorySlots::new());
    let (doc, outcome) = store.load(now()).await;
    assert_eq!(outcome, LoadOutcome::Fresh);
    assert!(doc.records.is_empty());
  }

  #[tokio::test]
  async fn save_counts_operation_and_roundtrips() {
    let store = RecordStore::new(MemorySlots::new());
    let mut doc = doc_with_one();
    assert_eq!(store.save(&mut doc).await, SaveOutcome::Saved);
    assert_eq!(doc.total_operations, 1);

    let (loaded, outcome) = store.load(now()).await;
    assert_eq!(outcome, LoadOutcome::Primary);
    assert_eq!(loaded, doc);
  }

  #[tokio::test]
  async fn corrupt_primary_falls_back_to_backup() {
    let slots = MemorySlots::new();
    let doc = doc_with_one();
    slots.put(Slot::Primary, "{not json");
    slots.put(Slot::Backup, serde_json::to_string(&doc).unwrap());

    let (loaded, outcome) = RecordStore::new(slots).load(now()).await;
    assert_eq!(outcome, LoadOutcome::Backup);
    assert_eq!(loaded.records.len(), 1);
  }

  #[tokio::test]
  async fn backup_snapshot_is_loadable() {
    let slots = MemorySlots::new();
    let doc = doc_with_one();
    let store = RecordStore::new(slots);
    store
      .write_backup(&BackupSnapshot {
        document:          &doc,
        backup_created_at: now(),
        backup_type:       BackupKind::Auto,
      })
      .await
      .unwrap();

    let (loaded, outcome) = store.load(now()).await;
    assert_eq!(outcome, LoadOutcome::Backup);
    assert_eq!(loaded, doc);
  }

  #[tokio::test]
  async fn failed_primary_write_degrades_to_backup() {
    let slots = MemorySlots::new();
    slots.fail_writes(Slot::Primary, true);
    let store = RecordStore::new(slots);
    let mut doc = doc_with_one();

    assert_eq!(store.save(&mut doc).await, SaveOutcome::BackupOnly);
    assert!(store.slots().contents(Slot::Primary).is_none());
    assert!(store.slots().contents(Slot::Backup).is_some());
  }

  #[tokio::test]
  async fn both_writes_failing_is_unsaved_not_an_error() {
    let slots = MemorySlots::new();
    slots.fail_writes(Slot::Primary, true);
    slots.fail_writes(Slot::Backup, true);
    let store = RecordStore::new(slots);
    let mut doc = doc_with_one();

    assert_eq!(store.save(&mut doc).await, SaveOutcome::Unsaved);
    assert_eq!(doc.total_operations, 1);
  }

  #[tokio::test]
  async fn backup_write_failure_is_reported() {
    let slots = MemorySlots::new();
    slots.fail_writes(Slot::Backup, true);
    let store = RecordStore::new(slots);
    let doc = doc_with_one();
    let result = store
      .write_backup(&BackupSnapshot {
        document:          &doc,
        backup_created_at: now(),
        backup_type:       BackupKind::Manual,
      })
      .await;
    assert!(matches!(result, Err(Error::BackupFailed(_))));
  }

  #[tokio::test]
  async fn failed_verification_is_logged_not_raised() {
    let empty = serde_json::to_string(&RegistryDocument::new(now())).unwrap();
    for readback in [Some(empty), None, Some("{garbled".to_owned())] {
      let store = RecordStore::new(TamperedReadback { inner: MemorySlots::new(), readback });
      let mut doc = doc_with_one();

      assert_eq!(store.save(&mut doc).await, SaveOutcome::Saved);
      assert_eq!(doc.total_operations, 1);
      assert!(store.slots().inner.contents(Slot::Primary).is_some());
      assert!(store.slots().inner.contents(Slot::Backup).is_none());
    }
  }
}
