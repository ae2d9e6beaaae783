//! The `SlotStore` trait: durable key-value slots under the record store.
//!
//! The registry needs exactly two slots: the primary document and a backup
//! snapshot. Backends (e.g. `promo-store-sqlite`) implement this trait; the
//! [`RecordStore`](crate::persist::RecordStore) layers serialisation,
//! verification and fallback on top.

use std::{fmt, future::Future};

/// One of the two persistence slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
  Primary,
  Backup,
}

impl Slot {
  /// The storage key for this slot.
  pub fn key(self) -> &'static str {
    match self {
      Slot::Primary => "promo_registry_data",
      Slot::Backup => "promo_registry_backup",
    }
  }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

/// Abstraction over a durable key-value backend holding whole documents.
///
/// Each call is a scoped operation: acquire, read or write, release. No
/// handle or lock is held between calls. All methods return `Send` futures
/// so a registry can live behind an async mutex in a multi-threaded server.
pub trait SlotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a slot. `Ok(None)` means the slot has never been written.
  fn read(
    &self,
    slot: Slot,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Replace the contents of a slot.
  fn write(
    &self,
    slot: Slot,
    contents: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
