//! Result persistence.
//!
//! The orchestrator only sees `ResultStore`. Backends: `MemoryResultStore`
//! for tests and database-less runs, `PgResultStore` for production.

mod memory;
#[cfg(feature = "database")]
mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{DrawResult, Game, ResultId};

pub use memory::MemoryResultStore;
#[cfg(feature = "database")]
pub use postgres::PgResultStore;

/// Upsert-by-identity storage for draw results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// All results of a game, newest contest first.
    async fn find_by_game(&self, game: Game) -> Result<Vec<DrawResult>>;

    async fn find_by_id(&self, id: ResultId) -> Result<Option<DrawResult>>;

    /// Result with the highest contest number, `None` when the game has none.
    async fn find_latest_by_game(&self, game: Game) -> Result<Option<DrawResult>>;

    /// Insert or replace one result keyed by its identity.
    async fn save(&self, result: &DrawResult) -> Result<()>;

    /// Insert or replace many results in one operation.
    async fn save_all(&self, results: &[DrawResult]) -> Result<()>;
}
