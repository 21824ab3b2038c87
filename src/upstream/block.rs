//! Process-wide upstream block window.
//!
//! After repeated 403 responses the upstream is treated as blocking this
//! host. The window is shared by every fetch; it only moves forward unless an
//! operator clears it.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct BlockWindow {
    until: Instant,
    until_wall: DateTime<Utc>,
}

/// Snapshot of the block window for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub blocked: bool,
    pub remaining_seconds: u64,
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Guarded block deadline. All access goes through `check`, `status`,
/// `trip` and `reset`.
#[derive(Debug, Default)]
pub struct BlockGate {
    window: Mutex<Option<BlockWindow>>,
}

impl BlockGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<BlockWindow>> {
        self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Err((remaining, until))` while the window is open.
    pub fn check(&self) -> Result<(), (Duration, DateTime<Utc>)> {
        let now = Instant::now();
        match *self.lock() {
            Some(w) if now < w.until => Err((w.until - now, w.until_wall)),
            _ => Ok(()),
        }
    }

    /// Open (or extend) the window to `now + duration`. Never shortens an
    /// existing window. Returns the resulting deadline.
    pub fn trip(&self, duration: Duration) -> DateTime<Utc> {
        let candidate = BlockWindow {
            until: Instant::now() + duration,
            until_wall: Utc::now()
                + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero()),
        };
        let mut guard = self.lock();
        let next = match *guard {
            Some(current) if current.until >= candidate.until => current,
            _ => candidate,
        };
        *guard = Some(next);
        next.until_wall
    }

    /// Clear the window. Returns whether a window was open.
    pub fn reset(&self) -> bool {
        let now = Instant::now();
        let previous = self.lock().take();
        let was_open = matches!(previous, Some(w) if now < w.until);
        if was_open {
            tracing::info!("upstream block window cleared by operator");
        }
        was_open
    }

    pub fn status(&self) -> BlockStatus {
        match self.check() {
            Ok(()) => BlockStatus {
                blocked: false,
                remaining_seconds: 0,
                blocked_until: None,
            },
            Err((remaining, until)) => BlockStatus {
                blocked: true,
                remaining_seconds: remaining.as_secs(),
                blocked_until: Some(until),
            },
        }
    }
}
