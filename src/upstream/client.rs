//! Resilient upstream client.
//!
//! Retrieves one contest (or the latest contest) for a game while surviving
//! the upstream's anti-automation behaviour:
//!
//! - a fixed delay before every call, exponential backoff plus jitter before
//!   each retry, and identity rotation per attempt;
//! - 429 responses wait a scaled delay and retry;
//! - the first 403 of a call tries the rendering fallback, and three
//!   consecutive 403s open the shared block window;
//! - any other non-2xx status fails the call immediately.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

use super::block::{BlockGate, BlockStatus};
use super::normalize::decode_draw;
use super::render::RenderSession;
use super::transport::{ClientIdentity, ReqwestTransport, UpstreamTransport};
use super::DrawSource;
use crate::error::FetchError;
use crate::model::{DrawResult, Game};

pub const UPSTREAM_API_BASE: &str = "https://servicebus2.caixa.gov.br/portaldeloterias/api";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Consecutive 403 responses that open the block window.
const FORBIDDEN_BLOCK_THRESHOLD: u32 = 3;

/// Delays and limits of the retry protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    /// Wait before the first attempt of every call.
    pub request_delay: Duration,
    /// Backoff before attempt `n >= 2` is `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
    /// Jitter range (ms) before the first attempt.
    pub first_jitter_ms: (u64, u64),
    /// Jitter range (ms) before a retry.
    pub retry_jitter_ms: (u64, u64),
    pub rate_limit_base: Duration,
    pub rate_limit_step: Duration,
    pub forbidden_base: Duration,
    pub forbidden_step: Duration,
    pub block_duration: Duration,
    pub render_settle: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            request_delay: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
            first_jitter_ms: (100, 500),
            retry_jitter_ms: (500, 1500),
            rate_limit_base: Duration::from_secs(5),
            rate_limit_step: Duration::from_secs(2),
            forbidden_base: Duration::from_secs(5),
            forbidden_step: Duration::from_secs(3),
            block_duration: Duration::from_secs(3600),
            render_settle: Duration::from_secs(2),
        }
    }
}

impl FetchPolicy {
    /// Same protocol with every wait removed. The block window keeps its
    /// length.
    pub fn without_delays() -> Self {
        Self {
            request_delay: Duration::ZERO,
            backoff_base: Duration::ZERO,
            first_jitter_ms: (0, 0),
            retry_jitter_ms: (0, 0),
            rate_limit_base: Duration::ZERO,
            rate_limit_step: Duration::ZERO,
            forbidden_base: Duration::ZERO,
            forbidden_step: Duration::ZERO,
            render_settle: Duration::ZERO,
            ..Self::default()
        }
    }

    fn pre_attempt_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.request_delay + jitter(self.first_jitter_ms)
        } else {
            let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
            self.backoff_base.saturating_mul(factor) + jitter(self.retry_jitter_ms)
        }
    }

    fn rate_limit_wait(&self, attempt: u32) -> Duration {
        self.rate_limit_base + self.rate_limit_step.saturating_mul(attempt)
    }

    fn forbidden_wait(&self, attempt: u32) -> Duration {
        self.forbidden_base + self.forbidden_step.saturating_mul(attempt)
    }
}

fn jitter((min, max): (u64, u64)) -> Duration {
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..max))
}

/// Upstream URL for a contest, or the latest contest when `contest` is `None`.
pub fn draw_url(game: Game, contest: Option<u32>) -> String {
    match contest {
        Some(n) => format!("{}/{}/{}", UPSTREAM_API_BASE, game.code(), n),
        None => format!("{}/{}/", UPSTREAM_API_BASE, game.code()),
    }
}

pub struct ResilientFetcher {
    transport: Arc<dyn UpstreamTransport>,
    gate: Arc<BlockGate>,
    renderer: RenderSession,
    policy: FetchPolicy,
}

impl ResilientFetcher {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        gate: Arc<BlockGate>,
        renderer: RenderSession,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            transport,
            gate,
            renderer,
            policy,
        }
    }

    /// Production client: reqwest transport with the fixed timeout.
    pub fn with_defaults(gate: Arc<BlockGate>, renderer: RenderSession) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(REQUEST_TIMEOUT)?);
        Ok(Self::new(transport, gate, renderer, FetchPolicy::default()))
    }

    pub fn gate(&self) -> &Arc<BlockGate> {
        &self.gate
    }

    pub fn block_status(&self) -> BlockStatus {
        self.gate.status()
    }

    /// Fetch one contest.
    pub async fn fetch_by_contest(&self, game: Game, contest: u32) -> Result<DrawResult, FetchError> {
        self.fetch(game, Some(contest)).await
    }

    /// Fetch the newest contest published for `game`.
    pub async fn fetch_latest(&self, game: Game) -> Result<DrawResult, FetchError> {
        self.fetch(game, None).await
    }

    /// Release the rendering session, if one was started.
    pub async fn shutdown(&self) {
        self.renderer.release().await;
    }

    fn ensure_not_blocked(&self, url: &str) -> Result<(), FetchError> {
        self.gate.check().map_err(|(remaining, until)| {
            tracing::warn!(
                url,
                remaining_secs = remaining.as_secs(),
                %until,
                "upstream blocked, skipping request"
            );
            FetchError::Blocked { remaining, until }
        })
    }

    async fn fetch(&self, game: Game, contest: Option<u32>) -> Result<DrawResult, FetchError> {
        let url = draw_url(game, contest);
        self.ensure_not_blocked(&url)?;

        let mut consecutive_forbidden = 0u32;
        let mut fallback_tried = false;
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.pre_attempt_delay(attempt);
            if attempt > 1 {
                tracing::debug!(%url, attempt, backoff_ms = delay.as_millis() as u64, "retrying upstream request");
            }
            tokio::time::sleep(delay).await;

            // Another caller may have opened the window while we waited.
            self.ensure_not_blocked(&url)?;

            let identity = ClientIdentity::for_attempt(attempt);
            let response = match self.transport.get(&url, &identity).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%url, attempt, error = %e, "upstream transport error");
                    consecutive_forbidden = 0;
                    last_error = Some(FetchError::Transport(e));
                    continue;
                }
            };

            match response.status {
                429 => {
                    let wait = self.policy.rate_limit_wait(attempt);
                    tracing::warn!(%url, attempt, wait_secs = wait.as_secs(), "rate limited (429)");
                    consecutive_forbidden = 0;
                    last_error = Some(FetchError::RateLimited { waited: wait });
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
                403 => {
                    consecutive_forbidden += 1;

                    if !fallback_tried {
                        fallback_tried = true;
                        tracing::warn!(%url, "forbidden (403), trying rendering fallback");
                        match self.fetch_rendered(game, &url).await {
                            Ok(result) => return Ok(result),
                            Err(e) => tracing::warn!(%url, error = %e, "rendering fallback failed"),
                        }
                    }

                    if consecutive_forbidden >= FORBIDDEN_BLOCK_THRESHOLD {
                        let until = self.gate.trip(self.policy.block_duration);
                        tracing::error!(
                            %url,
                            %until,
                            "{} consecutive 403 responses, upstream block window opened",
                            consecutive_forbidden
                        );
                        // The window may already extend past our own trip.
                        let (remaining, until) = match self.gate.check() {
                            Err(open) => open,
                            Ok(()) => (Duration::ZERO, until),
                        };
                        return Err(FetchError::Blocked { remaining, until });
                    }

                    let wait = self.policy.forbidden_wait(attempt);
                    tracing::warn!(
                        %url,
                        attempt,
                        consecutive_forbidden,
                        wait_secs = wait.as_secs(),
                        "forbidden (403)"
                    );
                    last_error = Some(FetchError::Forbidden { attempt });
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
                200..=299 => {
                    consecutive_forbidden = 0;
                    match decode_draw(game, &response.body) {
                        Ok(result) => return Ok(result),
                        Err(e) => {
                            tracing::warn!(%url, attempt, error = %e, "failed to decode upstream payload");
                            last_error = Some(e);
                        }
                    }
                }
                status => {
                    tracing::error!(%url, status, "unexpected upstream status");
                    return Err(FetchError::UnexpectedStatus { status });
                }
            }
        }

        let last = last_error.unwrap_or(FetchError::UnexpectedStatus { status: 0 });
        Err(FetchError::RetriesExhausted(Box::new(last)))
    }

    async fn fetch_rendered(&self, game: Game, url: &str) -> Result<DrawResult, FetchError> {
        let text = self
            .renderer
            .fetch_json(url, self.policy.render_settle)
            .await
            .map_err(|e| FetchError::FallbackFailed(format!("{e:#}")))?;

        let result = decode_draw(game, &text).map_err(|e| FetchError::FallbackFailed(e.to_string()))?;
        tracing::info!(%game, contest = result.contest, "fetched via rendering fallback");
        Ok(result)
    }
}

#[async_trait]
impl DrawSource for ResilientFetcher {
    async fn fetch_by_contest(&self, game: Game, contest: u32) -> Result<DrawResult, FetchError> {
        ResilientFetcher::fetch_by_contest(self, game, contest).await
    }

    async fn fetch_latest(&self, game: Game) -> Result<DrawResult, FetchError> {
        ResilientFetcher::fetch_latest(self, game).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_url() {
        assert_eq!(
            draw_url(Game::MegaSena, Some(2700)),
            "https://servicebus2.caixa.gov.br/portaldeloterias/api/megasena/2700"
        );
        assert_eq!(
            draw_url(Game::Federal, None),
            "https://servicebus2.caixa.gov.br/portaldeloterias/api/federal/"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = FetchPolicy {
            retry_jitter_ms: (0, 0),
            ..FetchPolicy::default()
        };
        assert_eq!(policy.pre_attempt_delay(2), Duration::from_secs(2));
        assert_eq!(policy.pre_attempt_delay(3), Duration::from_secs(4));
        assert_eq!(policy.pre_attempt_delay(5), Duration::from_secs(16));
    }

    #[test]
    fn test_first_attempt_waits_request_delay_plus_jitter() {
        let policy = FetchPolicy::default();
        let delay = policy.pre_attempt_delay(1);
        assert!(delay >= Duration::from_millis(10_100));
        assert!(delay < Duration::from_millis(10_500));
    }

    #[test]
    fn test_scaled_waits() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.rate_limit_wait(1), Duration::from_secs(7));
        assert_eq!(policy.forbidden_wait(2), Duration::from_secs(11));
    }

    #[test]
    fn test_without_delays_is_zero() {
        let policy = FetchPolicy::without_delays();
        assert_eq!(policy.pre_attempt_delay(1), Duration::ZERO);
        assert_eq!(policy.pre_attempt_delay(4), Duration::ZERO);
        assert_eq!(policy.block_duration, Duration::from_secs(3600));
    }
}
