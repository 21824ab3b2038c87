//! Postgres-backed result store.
//!
//! One row per `(game, contest)`; the canonical record is kept as JSONB so
//! the table does not need to track every per-game field.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use super::ResultStore;
use crate::model::{DrawResult, Game, ResultId};

const UPSERT_SQL: &str = r#"
    INSERT INTO draw_results (game, contest, payload, updated_at)
    VALUES ($1, $2, $3, NOW())
    ON CONFLICT (game, contest) DO UPDATE
        SET payload = EXCLUDED.payload,
            updated_at = NOW()
"#;

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!(url = %crate::config::mask_database_url(database_url), "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS draw_results (
                game       TEXT        NOT NULL,
                contest    INTEGER     NOT NULL,
                payload    JSONB       NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (game, contest)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create draw_results table")?;
        Ok(())
    }

    async fn upsert(tx: &mut Transaction<'_, Postgres>, result: &DrawResult) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(result.game.code())
            .bind(contest_column(result.contest)?)
            .bind(Json(result))
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to upsert {} contest {}", result.game, result.contest))?;
        Ok(())
    }
}

fn contest_column(contest: u32) -> Result<i32> {
    i32::try_from(contest).with_context(|| format!("contest number {contest} out of range"))
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn find_by_game(&self, game: Game) -> Result<Vec<DrawResult>> {
        let rows: Vec<(Json<DrawResult>,)> = sqlx::query_as(
            "SELECT payload FROM draw_results WHERE game = $1 ORDER BY contest DESC",
        )
        .bind(game.code())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load results for {game}"))?;

        Ok(rows.into_iter().map(|(Json(r),)| r).collect())
    }

    async fn find_by_id(&self, id: ResultId) -> Result<Option<DrawResult>> {
        let row: Option<(Json<DrawResult>,)> =
            sqlx::query_as("SELECT payload FROM draw_results WHERE game = $1 AND contest = $2")
                .bind(id.game.code())
                .bind(contest_column(id.contest)?)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to load {} contest {}", id.game, id.contest))?;

        Ok(row.map(|(Json(r),)| r))
    }

    async fn find_latest_by_game(&self, game: Game) -> Result<Option<DrawResult>> {
        let row: Option<(Json<DrawResult>,)> = sqlx::query_as(
            "SELECT payload FROM draw_results WHERE game = $1 ORDER BY contest DESC LIMIT 1",
        )
        .bind(game.code())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load latest result for {game}"))?;

        Ok(row.map(|(Json(r),)| r))
    }

    async fn save(&self, result: &DrawResult) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::upsert(&mut tx, result).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_all(&self, results: &[DrawResult]) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for result in results {
            Self::upsert(&mut tx, result).await?;
        }
        tx.commit().await.context("Failed to commit result batch")?;
        Ok(())
    }
}
