use serde::Serialize;

use crate::error::UpdateError;
use crate::model::Game;

/// What a successful reconciliation of one game did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameOutcome {
    /// Local and remote were at the same contest; its mutable fields were
    /// overwritten from the remote copy.
    Refreshed { contest: u32 },
    /// Local store is ahead of the upstream; nothing was written.
    LocalAhead { local: u32, remote: u32 },
    /// Missing contests between `from` and `to` were fetched: holes below the
    /// local cursor plus everything above it. `abandoned` lists the ones that
    /// failed past the retry cap; the next run requests them again.
    Backfilled {
        from: u32,
        to: u32,
        saved: usize,
        abandoned: Vec<u32>,
    },
}

/// Outcome of one game within a full run.
#[derive(Debug)]
pub struct GameRun {
    pub game: Game,
    pub result: Result<GameOutcome, UpdateError>,
}

/// Result of `update_all`, in the order the games were processed.
#[derive(Debug, Default)]
pub struct UpdateSummary {
    pub runs: Vec<GameRun>,
}

impl UpdateSummary {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }

    pub fn get(&self, game: Game) -> Option<&Result<GameOutcome, UpdateError>> {
        self.runs.iter().find(|r| r.game == game).map(|r| &r.result)
    }
}
