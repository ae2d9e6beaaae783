//! Error types for `promo-core`.
//!
//! Persistence failures are absent: the record store degrades
//! to backup-only or unsaved writes and reports that through
//! [`SaveOutcome`](crate::persist::SaveOutcome) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid month: {year}-{month}")]
  InvalidMonth { year: i32, month: u32 },

  #[error("invalid calendar date: {0:?}")]
  InvalidDate(String),

  #[error("invalid observation: {0}")]
  InvalidObservation(String),

  #[error("unrecognised schema version: {0:?}")]
  UnsupportedVersion(String),

  #[error("malformed registry document: {0}")]
  MalformedDocument(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("backup failed: {0}")]
  BackupFailed(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
