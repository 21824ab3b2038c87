//! Operator actions: background reconciliation triggers and block-window
//! inspection.

use std::sync::Arc;

use serde::Serialize;

use crate::model::Game;
use crate::reconcile::LotteryUpdater;
use crate::upstream::{BlockGate, BlockStatus};

/// Acknowledgement returned by a trigger. The run itself continues in the
/// background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateAck {
    pub status: &'static str,
    pub scope: String,
}

impl UpdateAck {
    fn processing(scope: impl Into<String>) -> Self {
        Self {
            status: "processing",
            scope: scope.into(),
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    updater: Arc<LotteryUpdater>,
    gate: Arc<BlockGate>,
}

impl AdminService {
    pub fn new(updater: Arc<LotteryUpdater>, gate: Arc<BlockGate>) -> Self {
        Self { updater, gate }
    }

    /// Start a full reconciliation and return immediately.
    pub fn trigger_update_all(&self) -> UpdateAck {
        let updater = Arc::clone(&self.updater);
        tokio::spawn(async move {
            let summary = updater.update_all().await;
            tracing::info!(
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                "manual full update finished"
            );
        });
        tracing::info!("manual full update started");
        UpdateAck::processing("all")
    }

    /// Start reconciliation of one game and return immediately.
    pub fn trigger_update(&self, game: Game) -> UpdateAck {
        let updater = Arc::clone(&self.updater);
        tokio::spawn(async move {
            match updater.update_one(game).await {
                Ok(outcome) => tracing::info!(game = %game, ?outcome, "manual update finished"),
                Err(e) => tracing::error!(game = %game, error = %e, "manual update failed"),
            }
        });
        tracing::info!(game = %game, "manual update started");
        UpdateAck::processing(game.code())
    }

    pub fn block_status(&self) -> BlockStatus {
        self.gate.status()
    }

    /// Clear the block window. Returns the resulting (clear) status.
    pub fn reset_block(&self) -> BlockStatus {
        self.gate.reset();
        self.gate.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::DrawResult;
    use crate::reconcile::UpdatePolicy;
    use crate::store::MemoryResultStore;
    use crate::upstream::DrawSource;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Unreachable;

    #[async_trait]
    impl DrawSource for Unreachable {
        async fn fetch_by_contest(&self, _game: Game, _contest: u32) -> Result<DrawResult, FetchError> {
            Err(FetchError::UnexpectedStatus { status: 500 })
        }

        async fn fetch_latest(&self, _game: Game) -> Result<DrawResult, FetchError> {
            Err(FetchError::UnexpectedStatus { status: 500 })
        }
    }

    fn admin(gate: Arc<BlockGate>) -> AdminService {
        let updater = LotteryUpdater::new(
            Arc::new(Unreachable),
            Arc::new(MemoryResultStore::new()),
            UpdatePolicy::without_delays(),
        );
        AdminService::new(Arc::new(updater), gate)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_block() {
        let gate = Arc::new(BlockGate::new());
        gate.trip(Duration::from_secs(3600));
        let admin = admin(Arc::clone(&gate));

        let status = admin.block_status();
        assert!(status.blocked);
        assert_eq!(status.remaining_seconds, 3600);

        let status = admin.reset_block();
        assert!(!status.blocked);
        assert!(status.blocked_until.is_none());
        assert!(gate.check().is_ok());
    }

    #[tokio::test]
    async fn test_triggers_acknowledge_immediately() {
        let admin = admin(Arc::new(BlockGate::new()));

        let ack = admin.trigger_update_all();
        assert_eq!(ack, UpdateAck::processing("all"));

        let ack = admin.trigger_update(Game::DiaDeSorte);
        assert_eq!(ack.status, "processing");
        assert_eq!(ack.scope, "diadesorte");
    }
}
