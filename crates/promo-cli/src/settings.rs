//! Runtime settings, layered from an optional TOML file and `PROMO_*`
//! environment variables.
//!
//! ```toml
//! store_path = "~/.local/share/promo/registry.db"
//! host       = "127.0.0.1"
//! port       = 8787
//!
//! [registry]
//! issue_base_url          = "https://example.atlassian.net"
//! backup_interval_hours   = 24
//! backup_every_operations = 10
//! backup_history_cap      = 10
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `PROMO_REGISTRY__BACKUP_HISTORY_CAP=20`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use promo_core::config::RegistryConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default)]
  pub registry:   RegistryConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/promo/registry.db") }

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8787 }

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PROMO")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      );
    Self::from_builder(builder)
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let settings: Self = builder
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings
      .registry
      .validate()
      .context("invalid [registry] settings")?;
    Ok(settings)
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};

  use super::*;

  fn from_toml(text: &str) -> Settings {
    Settings::from_builder(
      config::Config::builder().add_source(File::from_str(text, FileFormat::Toml)),
    )
    .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let settings = from_toml("");
    assert_eq!(settings.port, 8787);
    assert_eq!(settings.host, "127.0.0.1");
    assert_eq!(settings.registry, RegistryConfig::default());
  }

  #[test]
  fn registry_table_overrides_defaults() {
    let settings = from_toml(
      r#"
      port = 9000

      [registry]
      issue_base_url = "https://tracker.example"
      backup_history_cap = 3
      "#,
    );
    assert_eq!(settings.port, 9000);
    assert_eq!(settings.registry.backup_history_cap, 3);
    assert_eq!(settings.registry.backup_every_operations, 10);
    assert_eq!(
      settings.registry.issue_base_url.as_deref(),
      Some("https://tracker.example")
    );
  }

  #[test]
  fn bad_backup_interval_is_rejected() {
    for hours in ["0", "-1", "9223372036854775"] {
      let text = format!("[registry]\nbackup_interval_hours = {hours}\n");
      let result = Settings::from_builder(
        config::Config::builder().add_source(File::from_str(&text, FileFormat::Toml)),
      );
      assert!(result.is_err(), "{hours} accepted");
    }
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/promo/registry.db"));
    assert_eq!(expanded, PathBuf::from(home).join("promo/registry.db"));
    assert_eq!(expand_tilde(Path::new("/abs/path.db")), PathBuf::from("/abs/path.db"));
  }
}
