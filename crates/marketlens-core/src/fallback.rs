//! Static-first fetch with a rendered fallback.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheMode, PageCache};
use crate::extract::missing_markers;
use crate::fetcher::{FetchResult, Fetcher};
use crate::renderer::Renderer;
use crate::ScrapeError;

/// Decides per call whether a static page is good enough or a browser is
/// needed. Pages are shared per URL for the lifetime of the engine, so
/// categories on the same page cost one request and at most one render.
pub struct FallbackFetcher {
    fetcher: Arc<Fetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    static_pages: PageCache,
    rendered_pages: PageCache,
}

impl FallbackFetcher {
    pub fn new(fetcher: Arc<Fetcher>, renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self::with_cache_mode(fetcher, renderer, CacheMode::Use)
    }

    pub fn with_cache_mode(
        fetcher: Arc<Fetcher>,
        renderer: Option<Arc<dyn Renderer>>,
        mode: CacheMode,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            static_pages: PageCache::new(mode),
            rendered_pages: PageCache::new(mode),
        }
    }

    pub fn can_render(&self) -> bool {
        self.renderer.is_some()
    }

    /// Returns the static page when every required marker matches it, and a
    /// rendered page otherwise.
    ///
    /// A static [`ScrapeError::Request`] failure also falls through to the
    /// renderer; a robots denial never does. A rendered page that still lacks
    /// a required marker fails with [`ScrapeError::IncompleteRender`].
    pub async fn fetch_with_fallback(
        &self,
        url: &str,
        required_markers: &[String],
        wait_markers: &[String],
    ) -> Result<FetchResult, ScrapeError> {
        let static_page = self
            .static_pages
            .get_or_fetch(url, || self.fetcher.fetch(url))
            .await;

        match static_page {
            Ok(page) => {
                let missing = missing_markers(&page.body, required_markers)?;
                if missing.is_empty() {
                    debug!(url, "static page has every required marker");
                    return Ok(page);
                }
                info!(url, missing = ?missing, "required markers absent from static page");
            }
            Err(error) if error.allows_render_fallback() && self.can_render() => {
                warn!(url, %error, "static fetch failed; trying rendered fetch");
            }
            Err(error) => return Err(error),
        }

        let rendered = self.render(url, wait_markers).await?;
        let missing = missing_markers(&rendered.body, required_markers)?;
        if !missing.is_empty() {
            warn!(url, missing = ?missing, "required markers absent after rendering");
            return Err(ScrapeError::IncompleteRender {
                url: url.to_owned(),
                missing,
            });
        }
        Ok(rendered)
    }

    async fn render(&self, url: &str, wait_markers: &[String]) -> Result<FetchResult, ScrapeError> {
        let Some(renderer) = &self.renderer else {
            return Err(ScrapeError::render(
                url,
                "required markers are missing and rendered fetch is disabled",
            ));
        };
        self.rendered_pages
            .get_or_fetch(&render_key(url, wait_markers), || {
                renderer.render(url, wait_markers)
            })
            .await
    }
}

/// Rendered pages depend on what the browser waited for, so the cache key
/// carries the sorted wait-marker set alongside the URL.
fn render_key(url: &str, wait_markers: &[String]) -> String {
    let mut markers: Vec<&str> = wait_markers.iter().map(String::as_str).collect();
    markers.sort_unstable();
    markers.dedup();
    format!("{url}\n{}", markers.join("\n"))
}
