//! Error types for the ingestion core.
//!
//! `FetchError` is the full upstream taxonomy returned by the fetcher;
//! `UpdateError` is what a single game's reconciliation can fail with.
//! Store adapters and the renderer use `anyhow` internally and are folded
//! into these at the boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::Game;

/// Errors from the canonical model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("'{code}' is not a supported game. Supported games: [{supported}]")]
    UnknownGame { code: String, supported: String },
}

/// Network-level failure: the request never produced an HTTP status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Failures of a single fetch call.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("decode error: {message} (body: {excerpt})")]
    Decode { message: String, excerpt: String },

    #[error("rate limited (429), waited {}s before retry", .waited.as_secs())]
    RateLimited { waited: Duration },

    #[error("forbidden (403) on attempt {attempt}")]
    Forbidden { attempt: u32 },

    #[error("upstream blocked until {until}, {} seconds remaining", .remaining.as_secs())]
    Blocked {
        remaining: Duration,
        until: DateTime<Utc>,
    },

    #[error("unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("max retries exceeded: {0}")]
    RetriesExhausted(#[source] Box<FetchError>),

    #[error("rendering fallback failed: {0}")]
    FallbackFailed(String),
}

impl FetchError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked { .. })
    }
}

/// Failure of one game's reconciliation.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("{game}: fetch failed: {source}")]
    Fetch {
        game: Game,
        #[source]
        source: FetchError,
    },

    #[error("{game}: store failure: {cause:#}")]
    Store { game: Game, cause: anyhow::Error },
}

impl UpdateError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, UpdateError::Fetch { source, .. } if source.is_blocked())
    }
}

/// Errors loading process configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid schedule expression '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },
}
