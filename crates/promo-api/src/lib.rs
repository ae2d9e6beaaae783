//! JSON REST API for the promotion registry.
//!
//! Exposes an axum [`Router`] over a shared [`Registry`] on any
//! [`SlotStore`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", promo_api::api_router(registry.clone()))
//! ```

pub mod admin;
pub mod error;
pub mod months;
pub mod records;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use promo_core::{Registry, slot::SlotStore};
use tokio::sync::Mutex;

pub use error::ApiError;

/// The registry as shared between request handlers. Each handler holds the
/// lock for exactly one registry operation.
pub type SharedRegistry<S> = Arc<Mutex<Registry<S>>>;

/// Wrap an opened registry for [`api_router`].
pub fn share<S>(registry: Registry<S>) -> SharedRegistry<S> { Arc::new(Mutex::new(registry)) }

/// Build a fully-materialised API router for `registry`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(registry: SharedRegistry<S>) -> Router<()>
where
  S: SlotStore + 'static,
{
  Router::new()
    // Statistics
    .route("/stats", get(stats::basic::<S>))
    .route("/stats/advanced", get(stats::advanced::<S>))
    .route("/monthly", get(stats::monthly::<S>))
    // Records
    .route("/records", get(records::by_date::<S>))
    .route("/records/deleted", get(records::deleted::<S>))
    .route("/records/{date}/{key}/delete", post(records::mark_deleted::<S>))
    .route("/records/{date}/{key}/restore", post(records::restore::<S>))
    .route("/records/{date}/{key}/archive", post(records::archive::<S>))
    // Months
    .route("/months/{year}/{month}", get(months::records::<S>))
    .route("/months/{year}/{month}/missing", get(months::missing::<S>))
    // Administration
    .route("/sync", post(admin::sync::<S>))
    .route("/manual", post(admin::add_manual::<S>))
    .route("/manual/{date}/{key}", delete(admin::remove_manual::<S>))
    .route("/backup", post(admin::backup::<S>))
    .route("/export", get(admin::export::<S>))
    .route("/import", post(admin::import::<S>))
    .route("/cleanup", post(admin::cleanup::<S>))
    .with_state(registry)
}
