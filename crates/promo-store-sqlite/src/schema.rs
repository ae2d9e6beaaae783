//! SQL schema for the slot table.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so a later change can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per slot ('promo_registry_data' | 'promo_registry_backup').
-- Each row holds the whole serialised document.
CREATE TABLE IF NOT EXISTS slots (
    slot_key    TEXT PRIMARY KEY,
    contents    TEXT NOT NULL,
    updated_at  TEXT NOT NULL    -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
