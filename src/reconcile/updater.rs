//! Reconciliation of the local store against the upstream.
//!
//! Per game: read the stored contests, fetch the remote latest, then refresh,
//! skip, or backfill in batches. The work queue holds the holes below the
//! local cursor followed by the new range above it. Every batch is persisted
//! before the next one starts. A block persists only the results below the
//! first blocked contest, so an interrupted run leaves a gap-free prefix.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use super::report::{GameOutcome, GameRun, UpdateSummary};
use crate::error::{FetchError, UpdateError};
use crate::model::{DrawResult, Game};
use crate::store::ResultStore;
use crate::upstream::DrawSource;

/// Pacing and limits for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Attempts for the remote-latest lookup, on top of the fetcher's own retries.
    pub latest_attempts: u32,
    pub latest_pause: Duration,
    pub batch_size: usize,
    pub workers: usize,
    /// Retries per contest before it is abandoned.
    pub contest_retries: u32,
    pub contest_pause: Duration,
    pub game_pause: Duration,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            latest_attempts: 3,
            latest_pause: Duration::from_secs(2),
            batch_size: 10,
            workers: 3,
            contest_retries: 5,
            contest_pause: Duration::from_secs(2),
            game_pause: Duration::from_secs(3),
        }
    }
}

impl UpdatePolicy {
    pub fn without_delays() -> Self {
        Self {
            latest_pause: Duration::ZERO,
            contest_pause: Duration::ZERO,
            game_pause: Duration::ZERO,
            ..Self::default()
        }
    }
}

pub struct LotteryUpdater {
    source: Arc<dyn DrawSource>,
    store: Arc<dyn ResultStore>,
    policy: UpdatePolicy,
}

impl LotteryUpdater {
    pub fn new(source: Arc<dyn DrawSource>, store: Arc<dyn ResultStore>, policy: UpdatePolicy) -> Self {
        Self {
            source,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Reconcile every game in catalogue order. A failing game is reported
    /// and the run moves on.
    pub async fn update_all(&self) -> UpdateSummary {
        tracing::info!(games = Game::ALL.len(), "starting full reconciliation");
        let mut summary = UpdateSummary::default();

        for (i, game) in Game::ALL.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.policy.game_pause).await;
            }

            let result = self.update_one(game).await;
            if let Err(e) = &result {
                tracing::error!(game = %game, error = %e, "reconciliation failed");
            }
            summary.runs.push(GameRun { game, result });
        }

        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "full reconciliation finished"
        );
        summary
    }

    /// Reconcile one game.
    pub async fn update_one(&self, game: Game) -> Result<GameOutcome, UpdateError> {
        let records = self
            .store
            .find_by_game(game)
            .await
            .map_err(|cause| UpdateError::Store { game, cause })?;
        let present: Vec<u32> = records.iter().map(|r| r.contest).collect();
        // newest first
        let local = records.into_iter().next();
        let cursor = local.as_ref().map(|r| r.contest).unwrap_or(0);
        let holes = missing_contests(cursor, &present);

        let remote = self.fetch_latest(game).await?;
        tracing::info!(
            game = %game,
            local = cursor,
            remote = remote.contest,
            holes = holes.len(),
            "compared local and remote"
        );

        match remote.contest.cmp(&cursor) {
            Ordering::Equal => match local {
                Some(mut stored) => {
                    stored.refresh_from(&remote);
                    self.store
                        .save(&stored)
                        .await
                        .map_err(|cause| UpdateError::Store { game, cause })?;
                    tracing::info!(game = %game, contest = cursor, "refreshed latest contest");
                    if holes.is_empty() {
                        Ok(GameOutcome::Refreshed { contest: cursor })
                    } else {
                        self.backfill(game, holes).await
                    }
                }
                None => {
                    tracing::warn!(game = %game, "upstream reports no contests");
                    Ok(GameOutcome::LocalAhead { local: 0, remote: 0 })
                }
            },
            Ordering::Less => {
                tracing::info!(
                    game = %game,
                    local = cursor,
                    remote = remote.contest,
                    "local store is ahead of upstream, nothing to do"
                );
                Ok(GameOutcome::LocalAhead {
                    local: cursor,
                    remote: remote.contest,
                })
            }
            Ordering::Greater => {
                let mut queue = holes;
                queue.extend(cursor + 1..=remote.contest);
                self.backfill(game, queue).await
            }
        }
    }

    async fn fetch_latest(&self, game: Game) -> Result<DrawResult, UpdateError> {
        let mut attempt = 1;
        loop {
            match self.source.fetch_latest(game).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_blocked() || attempt >= self.policy.latest_attempts => {
                    return Err(UpdateError::Fetch { game, source: e });
                }
                Err(e) => {
                    tracing::warn!(game = %game, attempt, error = %e, "latest contest lookup failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.policy.latest_pause).await;
                }
            }
        }
    }

    /// Fetch and persist `contests` (ascending) batch by batch.
    async fn backfill(&self, game: Game, contests: Vec<u32>) -> Result<GameOutcome, UpdateError> {
        let from = contests.first().copied().unwrap_or_default();
        let to = contests.last().copied().unwrap_or_default();
        tracing::info!(game = %game, from, to, count = contests.len(), "backfilling missing contests");

        let mut saved = 0usize;
        let mut abandoned = Vec::new();

        for batch in contests.chunks(self.policy.batch_size.max(1)) {
            let fetched: Vec<(u32, Result<DrawResult, FetchError>)> = stream::iter(batch.iter().copied())
                .map(|contest| async move { (contest, self.fetch_contest(game, contest).await) })
                .buffer_unordered(self.policy.workers.max(1))
                .collect()
                .await;

            let mut records = Vec::with_capacity(fetched.len());
            let mut blocked: Option<(u32, FetchError)> = None;
            for (contest, outcome) in fetched {
                match outcome {
                    Ok(record) => records.push(record),
                    Err(e) if e.is_blocked() => {
                        if blocked.as_ref().map_or(true, |(first, _)| contest < *first) {
                            blocked = Some((contest, e));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(game = %game, contest, error = %e, "abandoning contest after retries");
                        abandoned.push(contest);
                    }
                }
            }
            if let Some((first_blocked, _)) = &blocked {
                records.retain(|r| r.contest < *first_blocked);
            }
            records.sort_by_key(|r| r.contest);

            if !records.is_empty() {
                self.store
                    .save_all(&records)
                    .await
                    .map_err(|cause| UpdateError::Store { game, cause })?;
                saved += records.len();
            }
            tracing::info!(
                game = %game,
                first = batch.first().copied().unwrap_or_default(),
                last = batch.last().copied().unwrap_or_default(),
                persisted = records.len(),
                "batch persisted"
            );

            if let Some((contest, e)) = blocked {
                tracing::warn!(game = %game, contest, saved, "upstream blocked, stopping backfill");
                return Err(UpdateError::Fetch { game, source: e });
            }
        }

        abandoned.sort_unstable();
        tracing::info!(game = %game, from, to, saved, abandoned = abandoned.len(), "backfill finished");
        Ok(GameOutcome::Backfilled {
            from,
            to,
            saved,
            abandoned,
        })
    }

    /// Fetch one contest, retrying up to the cap. A block is never retried.
    async fn fetch_contest(&self, game: Game, contest: u32) -> Result<DrawResult, FetchError> {
        let mut retries = 0;
        loop {
            match self.source.fetch_by_contest(game, contest).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_blocked() || retries >= self.policy.contest_retries => return Err(e),
                Err(e) => {
                    retries += 1;
                    tracing::debug!(game = %game, contest, retry = retries, error = %e, "contest fetch failed");
                    tokio::time::sleep(self.policy.contest_pause).await;
                }
            }
        }
    }
}

/// Contest numbers in `1..=cursor` absent from `present`, ascending.
fn missing_contests(cursor: u32, present: &[u32]) -> Vec<u32> {
    let present: HashSet<u32> = present.iter().copied().collect();
    (1..=cursor).filter(|c| !present.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_contests() {
        assert_eq!(missing_contests(0, &[]), Vec::<u32>::new());
        assert_eq!(missing_contests(5, &[5, 4, 2, 1]), vec![3]);
        assert_eq!(missing_contests(4, &[4]), vec![1, 2, 3]);
        assert_eq!(missing_contests(3, &[3, 2, 1]), Vec::<u32>::new());
    }
}
