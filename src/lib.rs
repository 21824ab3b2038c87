//! Lottery draw ingestion.
//!
//! Fetches draw results from the upstream results service, survives its rate
//! limiting and blocking, normalizes the per-game payloads into one record
//! shape, and reconciles a result store with the upstream state.
//!
//! ## Layout
//!
//! - [`model`] canonical records and the game catalogue
//! - [`upstream`] wire types, normalization, the resilient fetcher and the
//!   rendering fallback
//! - [`reconcile`] the per-game reconciliation orchestrator
//! - [`store`] result persistence
//! - [`admin`], [`scheduler`], [`config`] and (feature `server`) [`api`]
//!   around the core

pub mod admin;
pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod upstream;

#[cfg(feature = "server")]
pub mod api;

pub use error::{ConfigError, FetchError, ModelError, TransportError, UpdateError};
pub use model::{DrawResult, Game, ResultId};
