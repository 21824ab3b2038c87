//! Reconciliation orchestrator.

mod report;
mod updater;

pub use report::{GameOutcome, GameRun, UpdateSummary};
pub use updater::{LotteryUpdater, UpdatePolicy};
