//! Chromium-backed renderer using chromiumoxide.

use std::time::Instant;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RenderConfig, RenderFuture, Renderer};
use crate::config::ScraperConfig;
use crate::fetcher::{FetchResult, FetchSource, UserAgentPool};
use crate::ScrapeError;

/// Launches a fresh headless browser per render call. A semaphore caps how
/// many browsers exist at once; extra callers wait their turn.
pub struct ChromiumRenderer {
    config: RenderConfig,
    agents: UserAgentPool,
    sessions: Semaphore,
}

impl ChromiumRenderer {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            config: config.render.clone(),
            agents: UserAgentPool::new(&config.user_agents),
            sessions: Semaphore::new(config.render.max_sessions.max(1)),
        }
    }

    async fn render_page(&self, url: &str, wait_markers: &[String]) -> Result<FetchResult, ScrapeError> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| ScrapeError::render(url, "renderer is shut down"))?;

        let started = Instant::now();
        let session = BrowserSession::launch(&self.config, self.agents.next())
            .await
            .map_err(|message| ScrapeError::render(url, message))?;

        let budget = self.config.session_budget(wait_markers.len());
        let captured =
            tokio::time::timeout(budget, session.capture(url, wait_markers, &self.config)).await;
        session.close().await;

        let body = match captured {
            Ok(Ok(body)) => body,
            Ok(Err(message)) => return Err(ScrapeError::render(url, message)),
            Err(_) => {
                return Err(ScrapeError::render(
                    url,
                    format!("session exceeded {:.0}s", budget.as_secs_f64()),
                ))
            }
        };

        info!(
            url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered page"
        );
        Ok(FetchResult::new(url, body, FetchSource::Rendered))
    }
}

impl Renderer for ChromiumRenderer {
    fn render<'a>(&'a self, url: &'a str, wait_markers: &'a [String]) -> RenderFuture<'a> {
        Box::pin(self.render_page(url, wait_markers))
    }
}

/// One browser process plus its CDP event loop.
///
/// `close` is the normal exit. `Drop` is the backstop for cancellation and
/// panics: it stops the event loop, and dropping `Browser` kills the child.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &RenderConfig, user_agent: &str) -> Result<Self, String> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={user_agent}"))
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.navigation_timeout);
        if config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder
            .build()
            .map_err(|e| format!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| format!("failed to launch browser: {e}"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser, handler })
    }

    async fn capture(
        &self,
        url: &str,
        wait_markers: &[String],
        config: &RenderConfig,
    ) -> Result<String, String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("failed to open page: {e}"))?;

        match tokio::time::timeout(config.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ = page.wait_for_navigation().await;
            }
            Ok(Err(e)) => return Err(format!("navigation failed: {e}")),
            Err(_) => {
                return Err(format!(
                    "navigation timed out after {:.0}s",
                    config.navigation_timeout.as_secs_f64()
                ))
            }
        }

        for marker in wait_markers {
            wait_for_marker(&page, marker, config).await;
        }
        tokio::time::sleep(config.settle_delay).await;

        let html = page
            .content()
            .await
            .map_err(|e| format!("failed to read page content: {e}"))?;

        if let Err(error) = page.close().await {
            debug!(%error, "page close failed; browser shutdown will reclaim it");
        }
        Ok(html)
    }

    async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            debug!(%error, "browser close command failed");
        }
        if let Err(error) = self.browser.wait().await {
            debug!(%error, "waiting for browser exit failed");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Polls for `marker` until it appears or the marker timeout passes. A marker
/// that never shows up is only logged; the caller re-checks the markup.
async fn wait_for_marker(page: &Page, marker: &str, config: &RenderConfig) {
    let deadline = Instant::now() + config.marker_timeout;
    loop {
        if page.find_element(marker).await.is_ok() {
            debug!(marker, "wait marker present");
            return;
        }
        if Instant::now() >= deadline {
            warn!(marker, "wait marker did not appear before timeout");
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a local Chromium installation"]
    async fn renders_inline_page_and_waits_for_marker() {
        let mut config = ScraperConfig::default();
        config.render.settle_delay = std::time::Duration::from_millis(100);
        let renderer = ChromiumRenderer::new(&config);

        let url = "data:text/html,<div id=\"quotes\"><span>EUR/USD</span></div>";
        let result = renderer
            .render(url, &[String::from("#quotes")])
            .await
            .expect("render should succeed");

        assert_eq!(result.source, FetchSource::Rendered);
        assert!(result.body.contains("EUR/USD"));
    }
}
