//! `promo` — command-line front end and HTTP server for the promotion
//! registry.
//!
//! # Usage
//!
//! ```
//! promo sync observed.json
//! promo month 2025 7 --missing
//! promo add-manual 2025-08-01 "Back-to-school offer"
//! promo serve
//! ```
//!
//! Settings come from `promo.toml` (or `--config`) and `PROMO_*`
//! environment variables; see [`settings`].

mod settings;

use std::{
  io::Read as _,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use promo_core::{
  Registry,
  record::{RawObservedPromo, parse_date},
};
use promo_store_sqlite::SqliteSlots;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "promo", version, about = "Durable registry of tracker promotions")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "promo.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record counts by status and source.
  Stats {
    /// Include backup and operation bookkeeping.
    #[arg(long)]
    advanced: bool,
  },
  /// Active promotions on one day.
  Date {
    #[arg(value_parser = date_arg)]
    date: NaiveDate,
  },
  /// Active promotions in one month.
  Month {
    year:    i32,
    /// 1–12.
    month:   u32,
    /// List the days with no promotion instead.
    #[arg(long)]
    missing: bool,
  },
  /// Soft-deleted records.
  Deleted,
  /// Per-month totals, newest first.
  Monthly,
  /// Reconcile against a JSON array of observed promotions ("-" for stdin).
  Sync { file: PathBuf },
  /// Add a promotion by hand.
  AddManual {
    #[arg(value_parser = date_arg)]
    date:        NaiveDate,
    description: String,
  },
  /// Remove a manually added promotion.
  RemoveManual {
    #[arg(value_parser = date_arg)]
    date: NaiveDate,
    key:  String,
  },
  /// Soft-delete a record.
  Delete {
    #[arg(value_parser = date_arg)]
    date: NaiveDate,
    key:  String,
  },
  /// Bring a soft-deleted record back.
  Restore {
    #[arg(value_parser = date_arg)]
    date: NaiveDate,
    key:  String,
  },
  /// Move a record to cold storage. Cannot be undone.
  Archive {
    #[arg(value_parser = date_arg)]
    date: NaiveDate,
    key:  String,
  },
  /// Write a backup snapshot now.
  Backup,
  /// Write the whole registry as JSON.
  Export {
    /// Output file; stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
  },
  /// Replace the registry with an exported document.
  Import { file: PathBuf },
  /// Permanently remove inactive records older than the given age.
  Cleanup {
    #[arg(long, default_value_t = 12)]
    months: u32,
  },
  /// Serve the JSON API over HTTP.
  Serve,
}

fn date_arg(s: &str) -> Result<NaiveDate, String> { parse_date(s).map_err(|e| e.to_string()) }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = settings.resolved_store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let slots = SqliteSlots::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let registry = Registry::open(slots, settings.registry.clone()).await;

  match cli.command {
    Command::Serve => serve(registry, &settings).await,
    command => {
      let mut registry = registry;
      let result = run(&mut registry, command).await;
      registry.close().await;
      result
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run(registry: &mut Registry<SqliteSlots>, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Stats { advanced: false } => print_json(&registry.stats()),
    Command::Stats { advanced: true } => print_json(&registry.advanced_stats()),
    Command::Date { date } => print_json(&registry.records_for_date(date)),
    Command::Month { year, month, missing: false } => {
      print_json(&registry.records_for_month(year, month)?)
    }
    Command::Month { year, month, missing: true } => {
      print_json(&registry.days_without_promos(year, month)?)
    }
    Command::Deleted => print_json(&registry.deleted_records()),
    Command::Monthly => print_json(&registry.monthly_summary()),
    Command::Sync { file } => {
      let text = read_input(&file)?;
      let batch: Vec<RawObservedPromo> =
        serde_json::from_str(&text).context("expected a JSON array of observations")?;
      let report = registry.sync_raw(batch).await;
      print_json(&report)
    }
    Command::AddManual { date, description } => {
      anyhow::ensure!(!description.trim().is_empty(), "description must not be empty");
      let key = registry.add_manual_promo(date, description.trim()).await;
      println!("{}", key.issue_key);
      Ok(())
    }
    Command::RemoveManual { date, key } => {
      report_change(registry.remove_manual(date, &key).await, "removed", &key)
    }
    Command::Delete { date, key } => {
      report_change(registry.mark_deleted(date, &key).await, "deleted", &key)
    }
    Command::Restore { date, key } => {
      report_change(registry.restore(date, &key).await, "restored", &key)
    }
    Command::Archive { date, key } => {
      report_change(registry.archive(date, &key).await, "archived", &key)
    }
    Command::Backup => {
      let info = registry.manual_backup().await?;
      print_json(&info)
    }
    Command::Export { out: None } => {
      println!("{}", registry.export()?);
      Ok(())
    }
    Command::Export { out: Some(path) } => {
      std::fs::write(&path, registry.export()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
      tracing::info!(path = %path.display(), "registry exported");
      Ok(())
    }
    Command::Import { file } => {
      let text = read_input(&file)?;
      let count = registry.import(&text).await.context("import rejected")?;
      println!("imported {count} records");
      Ok(())
    }
    Command::Cleanup { months } => {
      let removed = registry.cleanup_old_records(months).await;
      println!("removed {removed} records");
      Ok(())
    }
    Command::Serve => anyhow::bail!("serve is not a one-shot command"),
  }
}

async fn serve(registry: Registry<SqliteSlots>, settings: &Settings) -> anyhow::Result<()> {
  let shared = promo_api::share(registry);
  let app = axum::Router::new()
    .nest("/api", promo_api::api_router(shared.clone()))
    .layer(TraceLayer::new_for_http());

  let address = settings.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("server error")?;

  let outcome = shared.lock().await.flush().await;
  tracing::info!(?outcome, "registry flushed on shutdown");
  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn report_change(changed: bool, verb: &str, key: &str) -> anyhow::Result<()> {
  if changed {
    println!("{verb} {key}");
  } else {
    println!("no change: {key} not found or not eligible");
  }
  Ok(())
}

/// Read a file, or stdin when `path` is `-`.
fn read_input(path: &Path) -> anyhow::Result<String> {
  if path == Path::new("-") {
    let mut text = String::new();
    std::io::stdin()
      .read_to_string(&mut text)
      .context("failed to read stdin")?;
    return Ok(text);
  }
  std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
