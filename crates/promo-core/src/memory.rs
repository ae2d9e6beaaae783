//! [`MemorySlots`] — an in-process [`SlotStore`].
//!
//! Nothing survives the process. Useful for tests (including write-failure
//! injection) and for throwaway sessions.

use std::{
  collections::{HashMap, HashSet},
  sync::Mutex,
};

use thiserror::Error;

use crate::slot::{Slot, SlotStore};

#[derive(Debug, Error)]
pub enum MemorySlotError {
  #[error("write to slot {0} rejected")]
  WriteRejected(Slot),

  #[error("slot table lock poisoned")]
  Poisoned,
}

#[derive(Debug, Default)]
pub struct MemorySlots {
  slots:   Mutex<HashMap<Slot, String>>,
  failing: Mutex<HashSet<Slot>>,
}

impl MemorySlots {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent write to `slot` fail (or succeed again).
  pub fn fail_writes(&self, slot: Slot, fail: bool) {
    let mut failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
    if fail {
      failing.insert(slot);
    } else {
      failing.remove(&slot);
    }
  }

  /// Current contents of `slot`, bypassing failure injection.
  pub fn contents(&self, slot: Slot) -> Option<String> {
    self
      .slots
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .get(&slot)
      .cloned()
  }

  /// Overwrite `slot` directly, bypassing failure injection.
  pub fn put(&self, slot: Slot, contents: impl Into<String>) {
    self
      .slots
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(slot, contents.into());
  }
}

impl SlotStore for MemorySlots {
  type Error = MemorySlotError;

  async fn read(&self, slot: Slot) -> Result<Option<String>, MemorySlotError> {
    let slots = self.slots.lock().map_err(|_| MemorySlotError::Poisoned)?;
    Ok(slots.get(&slot).cloned())
  }

  async fn write(&self, slot: Slot, contents: String) -> Result<(), MemorySlotError> {
    let rejected = self
      .failing
      .lock()
      .map_err(|_| MemorySlotError::Poisoned)?
      .contains(&slot);
    if rejected {
      return Err(MemorySlotError::WriteRejected(slot));
    }
    self
      .slots
      .lock()
      .map_err(|_| MemorySlotError::Poisoned)?
      .insert(slot, contents);
    Ok(())
  }
}
