//! [`Registry`] — the in-memory registry document and every operation on it.
//!
//! One `Registry` per process owns the document, the record store and the
//! clock. Each public method runs to completion, read-modify-persist, before
//! returning; callers that share a registry across tasks wrap it in a mutex.
//!
//! The operations are split by concern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | `lifecycle` | `upsert`, `mark_deleted`, `restore`, `archive`, `add_manual_promo`, `remove_manual` |
//! | `reconcile` | `sync`, `sync_raw` |
//! | `backup` | `maybe_auto_backup`, `manual_backup` |
//! | `query` | `records_for_date`, `records_for_month`, `days_without_promos`, `stats`, ... |
//! | `transfer` | `export`, `import`, `cleanup_old_records` |

mod backup;
mod lifecycle;
mod query;
mod reconcile;
mod transfer;


pub use backup::BackupInfo;
pub use lifecycle::UpsertOutcome;
pub use query::{AdvancedStats, MonthSummary, RegistryStats};
pub use reconcile::SyncReport;

use crate::{
  clock::{Clock, SystemClock},
  config::RegistryConfig,
  document::RegistryDocument,
  persist::{LoadOutcome, RecordStore, SaveOutcome},
  slot::SlotStore,
};

pub struct Registry<S, C = SystemClock> {
  store:  RecordStore<S>,
  clock:  C,
  config: RegistryConfig,
  doc:    RegistryDocument,
  loaded: LoadOutcome,
}

impl<S: SlotStore> Registry<S, SystemClock> {
  /// Open the registry on `slots` using wall-clock time.
  pub async fn open(slots: S, config: RegistryConfig) -> Self {
    Self::open_with_clock(slots, config, SystemClock).await
  }
}

impl<S: SlotStore, C: Clock> Registry<S, C> {
  /// Load (or initialise) the document, then run the start-up backup check.
  pub async fn open_with_clock(slots: S, config: RegistryConfig, clock: C) -> Self {
    if let Err(e) = config.validate() {
      tracing::warn!(error = %e, "registry config out of range; clamping");
    }
    let store = RecordStore::new(slots);
    let (doc, loaded) = store.load(clock.now()).await;
    let mut registry = Self { store, clock, config, doc, loaded };

    tracing::info!(
      total = registry.doc.records.len(),
      active = registry.doc.records.values().filter(|r| r.is_active()).count(),
      operations = registry.doc.total_operations,
      last_sync = %registry.doc.last_sync,
      "promotion registry opened"
    );

    registry.startup_backup_check().await;
    registry
  }

  /// The in-memory document.
  pub fn document(&self) -> &RegistryDocument { &self.doc }

  /// Which slot the document was loaded from at open.
  pub fn load_outcome(&self) -> LoadOutcome { self.loaded }

  pub fn slots(&self) -> &S { self.store.slots() }

  /// Write the current document without counting an operation.
  pub async fn flush(&self) -> SaveOutcome { self.store.write(&self.doc).await }

  /// Flush and hand back the slot backend.
  pub async fn close(self) -> S {
    let outcome = self.flush().await;
    tracing::debug!(?outcome, "promotion registry closed");
    self.store.into_inner()
  }

  /// Count and persist one mutation, then give the backup scheduler its
  /// opportunistic check.
  async fn persist(&mut self) -> SaveOutcome {
    let outcome = self.store.save(&mut self.doc).await;
    self.maybe_auto_backup().await;
    outcome
  }
}
