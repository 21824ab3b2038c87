//! Upstream side of ingestion: wire types, normalization, transport, the
//! rendering fallback, the shared block window and the resilient fetcher.

pub mod block;
pub mod client;
pub mod normalize;
pub mod render;
pub mod transport;
pub mod types;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{DrawResult, Game};

pub use block::{BlockGate, BlockStatus};
pub use client::{draw_url, FetchPolicy, ResilientFetcher, UPSTREAM_API_BASE};
pub use normalize::{decode_draw, month_name, normalize_draw, order_numbers};
pub use render::{PageRenderer, RenderSession, RendererLauncher};
pub use transport::{ClientIdentity, ReqwestTransport, UpstreamResponse, UpstreamTransport};

/// Where the orchestrator gets draws from.
#[async_trait]
pub trait DrawSource: Send + Sync {
    async fn fetch_by_contest(&self, game: Game, contest: u32) -> Result<DrawResult, FetchError>;

    async fn fetch_latest(&self, game: Game) -> Result<DrawResult, FetchError>;
}
