//! Process configuration read from the environment.

use std::net::IpAddr;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 9050;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Postgres connection string. Results are kept in memory when unset.
    pub database_url: Option<String>,
    /// Replaces the default update schedule set when present.
    pub cron_schedule: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            database_url: None,
            cron_schedule: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            tracing::debug!("no .env file found, using process environment");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: v.clone(),
            })?,
            None => defaults.port,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "BIND_ADDR",
                value: v.clone(),
            })?,
            None => defaults.bind_addr,
        };

        Ok(Self {
            bind_addr,
            port,
            database_url: get("DATABASE_URL"),
            cron_schedule: get("CRON_SCHEDULE"),
        })
    }
}

/// Hide the password part of a connection string for logging.
pub fn mask_database_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return "***".to_string();
    };
    let rest = &url[scheme_end + 3..];
    let Some(at) = rest.rfind('@') else {
        return url.to_string();
    };
    let credentials = &rest[..at];
    match credentials.find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..scheme_end + 3],
            &credentials[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
