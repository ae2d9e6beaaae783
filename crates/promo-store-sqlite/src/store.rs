//! [`SqliteSlots`] — the SQLite implementation of [`SlotStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use promo_core::slot::{Slot, SlotStore};

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Persistence slots backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteSlots {
  conn: tokio_rusqlite::Connection,
}

impl SqliteSlots {
  /// Open (or create) a slot database at `path` and run schema
  /// initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    tracing::debug!(path = %path.display(), "opening slot database");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory slot database.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// When `slot` was last written, if ever.
  pub async fn last_written(&self, slot: Slot) -> Result<Option<DateTime<Utc>>> {
    let key = slot.key();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        let at = conn
          .query_row(
            "SELECT updated_at FROM slots WHERE slot_key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?;
        Ok(at)
      })
      .await?;

    raw
      .map(|s| {
        DateTime::parse_from_rfc3339(&s)
          .map(|dt| dt.with_timezone(&Utc))
          .map_err(|e| Error::DateParse(format!("{s}: {e}")))
      })
      .transpose()
  }
}

// ─── SlotStore impl ──────────────────────────────────────────────────────────

impl SlotStore for SqliteSlots {
  type Error = Error;

  async fn read(&self, slot: Slot) -> Result<Option<String>> {
    let key = slot.key();
    let contents = self
      .conn
      .call(move |conn| {
        let contents = conn
          .query_row(
            "SELECT contents FROM slots WHERE slot_key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?;
        Ok(contents)
      })
      .await?;
    Ok(contents)
  }

  async fn write(&self, slot: Slot, contents: String) -> Result<()> {
    let key = slot.key();
    let at = Utc::now().to_rfc3339();
    let bytes = contents.len();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO slots (slot_key, contents, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(slot_key) DO UPDATE
             SET contents = excluded.contents, updated_at = excluded.updated_at",
          rusqlite::params![key, contents, at],
        )?;
        Ok(())
      })
      .await?;

    tracing::trace!(%slot, bytes, "slot written");
    Ok(())
  }
}
