//! Registry tuning knobs.

use chrono::TimeDelta;
use serde::Deserialize;

use crate::{Error, Result};

/// Longest accepted backup interval: ten years.
pub const MAX_BACKUP_INTERVAL_HOURS: i64 = 24 * 366 * 10;

/// Registry-level configuration. Every field has a default, so an empty
/// `[registry]` table (or none at all) yields the stock behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// Base URL of the ticket tracker, e.g. `https://example.atlassian.net`.
  /// When set, tracker-sourced records remember `<base>/browse/<key>`.
  pub issue_base_url:          Option<String>,
  /// Auto-backup when this much time has passed since the last backup.
  pub backup_interval_hours:   i64,
  /// Auto-backup on every N-th persisted operation; `0` disables the trigger.
  pub backup_every_operations: u64,
  /// How many backup timestamps `backupHistory` retains.
  pub backup_history_cap:      usize,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      issue_base_url:          None,
      backup_interval_hours:   24,
      backup_every_operations: 10,
      backup_history_cap:      10,
    }
  }
}

impl RegistryConfig {
  /// Reject values the scheduler cannot honour.
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_BACKUP_INTERVAL_HOURS).contains(&self.backup_interval_hours) {
      return Err(Error::InvalidConfig(format!(
        "backup_interval_hours must be between 1 and {MAX_BACKUP_INTERVAL_HOURS}, got {}",
        self.backup_interval_hours
      )));
    }
    Ok(())
  }

  /// The auto-backup interval, clamped into the range [`validate`] accepts.
  ///
  /// [`validate`]: RegistryConfig::validate
  pub fn backup_interval(&self) -> TimeDelta {
    let hours = self.backup_interval_hours.clamp(1, MAX_BACKUP_INTERVAL_HOURS);
    TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX)
  }

  /// Browse URL for a tracker issue, if a base URL is configured.
  pub fn issue_url(&self, issue_key: &str) -> Option<String> {
    self
      .issue_base_url
      .as_deref()
      .map(|base| format!("{}/browse/{issue_key}", base.trim_end_matches('/')))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issue_url_trims_trailing_slash() {
    let config = RegistryConfig {
      issue_base_url: Some("https://tracker.example/".into()),
      ..RegistryConfig::default()
    };
    assert_eq!(
      config.issue_url("ABC-1").as_deref(),
      Some("https://tracker.example/browse/ABC-1")
    );
  }

  #[test]
  fn issue_url_absent_without_base() {
    assert!(RegistryConfig::default().issue_url("ABC-1").is_none());
  }

  #[test]
  fn partial_config_fills_defaults() {
    let config: RegistryConfig =
      serde_json::from_str(r#"{"backup_history_cap": 3}"#).unwrap();
    assert_eq!(config.backup_history_cap, 3);
    assert_eq!(config.backup_every_operations, 10);
    assert_eq!(config.backup_interval(), TimeDelta::hours(24));
  }

  #[test]
  fn out_of_range_interval_is_rejected() {
    for hours in [0, -5, i64::MAX / 1000, i64::MIN] {
      let config = RegistryConfig { backup_interval_hours: hours, ..RegistryConfig::default() };
      assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{hours} accepted");
    }
    assert!(RegistryConfig::default().validate().is_ok());
  }

  #[test]
  fn out_of_range_interval_is_clamped_not_panicking() {
    let huge = RegistryConfig { backup_interval_hours: i64::MAX / 1000, ..RegistryConfig::default() };
    assert_eq!(huge.backup_interval(), TimeDelta::hours(MAX_BACKUP_INTERVAL_HOURS));

    let negative = RegistryConfig { backup_interval_hours: -3, ..RegistryConfig::default() };
    assert_eq!(negative.backup_interval(), TimeDelta::hours(1));
  }
}
