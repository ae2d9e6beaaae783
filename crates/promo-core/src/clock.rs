//! Time sources for the registry.
//!
//! Every timestamp the registry writes comes from a [`Clock`], so tests can
//! drive the 24-hour backup interval and the cleanup cutoff deterministically.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, SubsecRound as _, TimeDelta, Utc};

/// A source of the current instant and the current calendar day.
pub trait Clock: Send + Sync {
  /// The current instant, truncated to millisecond precision.
  fn now(&self) -> DateTime<Utc>;

  /// Today's calendar date, computed from local calendar fields.
  fn today(&self) -> NaiveDate;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }

  fn today(&self) -> NaiveDate { Local::now().date_naive() }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Arc::new(Mutex::new(start.trunc_subsecs(3))) }
  }

  pub fn advance(&self, by: TimeDelta) {
    let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *guard += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// The UTC calendar day of the current instant.
  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

/// Render a timestamp the way the persisted document stores it
/// (`2025-07-23T10:15:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
