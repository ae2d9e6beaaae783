//! Core types and the registry engine for the promotion registry.
//!
//! The registry keeps a durable, local ledger of promotions observed in an
//! external ticket tracker. Observations are volatile (tickets get retitled
//! or deleted); the ledger is not. Vanished promotions are soft-deleted and
//! revived when they reappear, so the history of "which day had a promotion"
//! survives any amount of churn upstream.
//!
//! This crate has no HTTP or database dependencies. Durable storage is
//! abstracted behind [`slot::SlotStore`]; `promo-store-sqlite` provides the
//! production backend and [`memory::MemorySlots`] an in-process one.

// `SlotStore` spells out its `Send` bounds; implementors use plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod migrate;
pub mod persist;
pub mod record;
pub mod registry;
pub mod slot;

pub use error::{Error, Result};
pub use registry::Registry;
