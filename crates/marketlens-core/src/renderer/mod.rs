//! Rendered (script-executing) page fetch.
//!
//! Only the fallback engine calls into this module, and only when a static
//! fetch lacks the markers a category needs.

pub mod chromium;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::secs;
use crate::fetcher::FetchResult;
use crate::ScrapeError;

pub use chromium::ChromiumRenderer;

pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<FetchResult, ScrapeError>> + Send + 'a>>;

/// Loads a page in a real browser and returns its post-script markup,
/// tagged [`FetchSource::Rendered`](crate::fetcher::FetchSource::Rendered).
///
/// Implementations must release every browser resource before the returned
/// future completes, on success and on failure.
pub trait Renderer: Send + Sync {
    fn render<'a>(&'a self, url: &'a str, wait_markers: &'a [String]) -> RenderFuture<'a>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Allows the fallback engine to launch a browser at all.
    pub enabled: bool,
    pub headless: bool,
    #[serde(with = "secs")]
    pub navigation_timeout: Duration,
    /// How long to wait for each wait marker before giving up on it.
    #[serde(with = "secs")]
    pub marker_timeout: Duration,
    /// Extra pause after the markers so late scripts can finish.
    #[serde(with = "secs")]
    pub settle_delay: Duration,
    /// Browser sessions allowed at the same time.
    pub max_sessions: usize,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            marker_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            max_sessions: 1,
            chrome_executable: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl RenderConfig {
    /// Upper bound for one whole render call, browser launch included.
    pub fn session_budget(&self, wait_markers: usize) -> Duration {
        let markers = u32::try_from(wait_markers).unwrap_or(u32::MAX);
        self.navigation_timeout
            .saturating_add(self.marker_timeout.saturating_mul(markers))
            .saturating_add(self.settle_delay)
            .saturating_add(Duration::from_secs(15))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_budget_grows_with_wait_markers() {
        let config = RenderConfig::default();
        assert_eq!(config.session_budget(0), Duration::from_secs(47));
        assert_eq!(config.session_budget(2), Duration::from_secs(67));
    }

    #[test]
    fn config_reads_seconds_and_optional_executable() {
        let config: RenderConfig = serde_json::from_str(
            r#"{"marker_timeout": 2.5, "chrome_executable": "/usr/bin/chromium"}"#,
        )
        .expect("valid render config");

        assert_eq!(config.marker_timeout, Duration::from_millis(2500));
        assert_eq!(config.chrome_executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.max_sessions, 1);
        assert!(config.headless);
    }
}
