//! HTTP transport for the upstream service.
//!
//! The fetcher talks to the network only through `UpstreamTransport`, so the
//! retry and block logic can be driven by scripted responses in tests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;

use crate::error::TransportError;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
];

const REFERERS: [&str; 2] = ["https://loterias.caixa.gov.br/", "https://www.caixa.gov.br/"];

const ORIGIN: &str = "https://loterias.caixa.gov.br";

/// Outgoing identity markers for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: &'static str,
    pub referer: &'static str,
}

impl ClientIdentity {
    /// Identity for a 1-based attempt number. User agent and referer cycle
    /// independently.
    pub fn for_attempt(attempt: u32) -> Self {
        let idx = attempt.saturating_sub(1) as usize;
        Self {
            user_agent: USER_AGENTS[idx % USER_AGENTS.len()],
            referer: REFERERS[idx % REFERERS.len()],
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        identity: &ClientIdentity,
    ) -> std::result::Result<UpstreamResponse, TransportError>;
}

/// `reqwest`-backed transport sending browser-like headers.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(base_headers())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let fixed = [
        ("accept", "application/json, text/plain, */*"),
        ("accept-language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
        ("connection", "keep-alive"),
        ("origin", ORIGIN),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-site"),
        ("cache-control", "no-cache"),
        ("pragma", "no-cache"),
    ];
    for (name, value) in fixed {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        identity: &ClientIdentity,
    ) -> std::result::Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, identity.user_agent)
            .header(reqwest::header::REFERER, identity.referer)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(UpstreamResponse { status, body })
    }
}
