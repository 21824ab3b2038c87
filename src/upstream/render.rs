//! Rendering fallback: load the endpoint in a headless browser and read the
//! JSON back out of the rendered page.
//!
//! At most one browser session exists per `RenderSession`. It is launched on
//! first use and stays up until `release` is called.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A live browser session able to render a URL.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url`, wait `settle`, and return the page body content.
    async fn render_body(&self, url: &str, settle: Duration) -> Result<String>;

    /// Tear down the browser.
    async fn close(&self) -> Result<()>;
}

/// Starts browser sessions.
#[async_trait]
pub trait RendererLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn PageRenderer>>;
}

/// Lazily created, shared browser session.
pub struct RenderSession {
    launcher: Option<Arc<dyn RendererLauncher>>,
    live: Mutex<Option<Arc<dyn PageRenderer>>>,
}

impl RenderSession {
    pub fn new(launcher: Arc<dyn RendererLauncher>) -> Self {
        Self {
            launcher: Some(launcher),
            live: Mutex::new(None),
        }
    }

    /// A session with no browser available; every render fails.
    pub fn disabled() -> Self {
        Self {
            launcher: None,
            live: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.launcher.is_some()
    }

    pub async fn is_live(&self) -> bool {
        self.live.lock().await.is_some()
    }

    async fn renderer(&self) -> Result<Arc<dyn PageRenderer>> {
        let launcher = self
            .launcher
            .as_ref()
            .ok_or_else(|| anyhow!("no headless browser configured"))?;

        // Held across launch so concurrent callers wait instead of starting
        // a second browser.
        let mut live = self.live.lock().await;
        if let Some(renderer) = live.as_ref() {
            return Ok(Arc::clone(renderer));
        }

        let renderer = launcher.launch().await?;
        tracing::info!("headless browser started for rendering fallback");
        *live = Some(Arc::clone(&renderer));
        Ok(renderer)
    }

    /// Render `url` and return the JSON text found in the page body.
    pub async fn fetch_json(&self, url: &str, settle: Duration) -> Result<String> {
        let renderer = self.renderer().await?;
        let body = renderer.render_body(url, settle).await?;
        let text = strip_markup(&body);
        if text.is_empty() {
            return Err(anyhow!("rendered page body is empty"));
        }
        Ok(text)
    }

    /// Close the browser if one is running.
    pub async fn release(&self) {
        let renderer = self.live.lock().await.take();
        if let Some(renderer) = renderer {
            match renderer.close().await {
                Ok(()) => tracing::info!("headless browser closed"),
                Err(e) => tracing::warn!(error = %e, "failed to close headless browser"),
            }
        }
    }
}

/// Remove wrapping tags (`<body>`, `<pre ...>`) around the payload and decode
/// the basic HTML entities the browser escapes.
pub fn strip_markup(body: &str) -> String {
    let mut text = body.trim();
    loop {
        if !text.starts_with('<') {
            break;
        }
        let Some(open_end) = text.find('>') else {
            break;
        };
        let inner = text[open_end + 1..].trim_end();
        let inner = match inner.rfind("</") {
            Some(close_start) if inner.ends_with('>') => &inner[..close_start],
            _ => inner,
        };
        text = inner.trim();
    }

    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(feature = "browser")]
pub use chrome::{ChromeLauncher, ChromeRenderer};

#[cfg(feature = "browser")]
mod chrome {
    use super::*;
    use anyhow::Context;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// Launches a headless Chrome/Chromium via the DevTools protocol.
    #[derive(Debug, Default, Clone)]
    pub struct ChromeLauncher;

    #[async_trait]
    impl RendererLauncher for ChromeLauncher {
        async fn launch(&self) -> Result<Arc<dyn PageRenderer>> {
            let config = BrowserConfig::builder()
                .build()
                .map_err(|e| anyhow!("invalid browser config: {e}"))?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .context("Failed to launch headless browser")?;

            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Arc::new(ChromeRenderer {
                browser: Mutex::new(Some(browser)),
                events,
            }))
        }
    }

    pub struct ChromeRenderer {
        browser: Mutex<Option<Browser>>,
        events: JoinHandle<()>,
    }

    #[async_trait]
    impl PageRenderer for ChromeRenderer {
        async fn render_body(&self, url: &str, settle: Duration) -> Result<String> {
            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| anyhow!("headless browser already closed"))?;

            let page = browser
                .new_page(url)
                .await
                .with_context(|| format!("Failed to navigate to {url}"))?;
            tokio::time::sleep(settle).await;

            let body = page
                .find_element("body")
                .await
                .context("Rendered page has no body")?
                .inner_text()
                .await
                .context("Failed to read rendered body")?
                .unwrap_or_default();

            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "failed to close rendered page");
            }
            Ok(body)
        }

        async fn close(&self) -> Result<()> {
            if let Some(mut browser) = self.browser.lock().await.take() {
                browser
                    .close()
                    .await
                    .context("Failed to close headless browser")?;
            }
            self.events.abort();
            Ok(())
        }
    }
}
