//! Integration tests for `SqliteSlots` against an in-memory database.

use chrono::{NaiveDate, TimeZone as _, Utc};
use promo_core::{
  Registry,
  clock::ManualClock,
  config::RegistryConfig,
  persist::LoadOutcome,
  record::{ObservedPromo, RecordKey, RecordStatus},
  slot::{Slot, SlotStore},
};

use crate::SqliteSlots;

async fn slots() -> SqliteSlots {
  SqliteSlots::open_in_memory()
    .await
    .expect("in-memory slots")
}

// ─── Slots ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unwritten_slot_reads_none() {
  let s = slots().await;
  assert!(s.read(Slot::Primary).await.unwrap().is_none());
  assert!(s.last_written(Slot::Primary).await.unwrap().is_none());
}

#[tokio::test]
async fn write_then_overwrite() {
  let s = slots().await;
  s.write(Slot::Primary, "first".into()).await.unwrap();
  assert_eq!(s.read(Slot::Primary).await.unwrap().as_deref(), Some("first"));

  s.write(Slot::Primary, "second".into()).await.unwrap();
  assert_eq!(s.read(Slot::Primary).await.unwrap().as_deref(), Some("second"));
  assert!(s.last_written(Slot::Primary).await.unwrap().is_some());
}

#[tokio::test]
async fn slots_are_independent() {
  let s = slots().await;
  s.write(Slot::Primary, "data".into()).await.unwrap();
  s.write(Slot::Backup, "snapshot".into()).await.unwrap();

  assert_eq!(s.read(Slot::Primary).await.unwrap().as_deref(), Some("data"));
  assert_eq!(s.read(Slot::Backup).await.unwrap().as_deref(), Some("snapshot"));
}

#[tokio::test]
async fn file_database_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("registry.db");

  {
    let s = SqliteSlots::open(&path).await.unwrap();
    s.write(Slot::Primary, "kept".into()).await.unwrap();
  }
  let s = SqliteSlots::open(&path).await.unwrap();
  assert_eq!(s.read(Slot::Primary).await.unwrap().as_deref(), Some("kept"));
}

// ─── Registry on SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn registry_round_trips_through_sqlite() {
  let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 7, 20, 9, 0, 0).unwrap());
  let day = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();

  let mut registry =
    Registry::open_with_clock(slots().await, RegistryConfig::default(), clock.clone()).await;
  registry
    .sync([
      ObservedPromo::new(day, "ABC-1", "Promo A"),
      ObservedPromo::new(day, "ABC-2", "Promo B"),
    ])
    .await;
  registry.sync([ObservedPromo::new(day, "ABC-1", "Promo A")]).await;
  let before = registry.document().clone();

  let backend = registry.close().await;
  let reopened = Registry::open_with_clock(backend, RegistryConfig::default(), clock).await;

  assert_eq!(reopened.load_outcome(), LoadOutcome::Primary);
  assert_eq!(reopened.document(), &before);
  let b = reopened.document().get(&RecordKey::new(day, "ABC-2")).unwrap();
  assert_eq!(b.status, RecordStatus::Deleted);
}

#[tokio::test]
async fn manual_backup_lands_in_backup_slot() {
  let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 7, 20, 9, 0, 0).unwrap());
  let mut registry =
    Registry::open_with_clock(slots().await, RegistryConfig::default(), clock).await;
  registry
    .add_manual_promo(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(), "by hand")
    .await;
  registry.manual_backup().await.unwrap();

  let raw = registry.slots().read(Slot::Backup).await.unwrap().unwrap();
  let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
  assert_eq!(json["backupType"], "manual");
  assert_eq!(json["records"].as_array().unwrap().len(), 1);
}
