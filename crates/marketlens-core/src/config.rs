use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::renderer::RenderConfig;
use crate::retry::RetryConfig;
use crate::CoreError;

pub const PIPELINE_VERSION: &str = "v1.0.0";

pub const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Runtime knobs for one scrape run. Durations are written as float seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    #[serde(with = "secs")]
    pub http_timeout: Duration,
    /// Minimum spacing between two dispatches to the same origin.
    #[serde(with = "secs")]
    pub rate_limit_delay: Duration,
    pub retry: RetryConfig,
    pub user_agents: Vec<String>,
    pub accept: String,
    pub accept_language: String,
    pub respect_robots: bool,
    pub robots_agent: String,
    #[serde(with = "secs")]
    pub robots_cache_ttl: Duration,
    /// Categories processed at the same time.
    pub max_concurrency: usize,
    /// Share fetched pages between categories that read the same URL.
    pub share_pages: bool,
    pub render: RenderConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            rate_limit_delay: Duration::from_secs(5),
            retry: RetryConfig::default(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| (*ua).to_owned()).collect(),
            accept: String::from(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
            accept_language: String::from("en-US,en;q=0.5"),
            respect_robots: true,
            robots_agent: String::from("marketlens"),
            robots_cache_ttl: Duration::from_secs(3600),
            max_concurrency: 4,
            share_pages: true,
            render: RenderConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(CoreError::Config(String::from(
                "user_agents must contain at least one non-empty entry",
            )));
        }
        if self.max_concurrency == 0 {
            return Err(CoreError::Config(String::from("max_concurrency must be at least 1")));
        }
        if self.http_timeout.is_zero() {
            return Err(CoreError::Config(String::from("http_timeout must be positive")));
        }
        if self.render.max_sessions == 0 {
            return Err(CoreError::Config(String::from(
                "render.max_sessions must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Serde adapter for `Duration` as float seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_describe_a_polite_scraper() {
        let config = ScraperConfig::default();

        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit_delay, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.user_agents.len(), 5);
        assert!(config.respect_robots);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"rate_limit_delay": 1.5, "retry": {{"max_retries": 5}}}}"#)
            .expect("write config");

        let config = ScraperConfig::from_json_file(file.path()).expect("config should load");

        assert_eq!(config.rate_limit_delay, Duration::from_millis(1500));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.backoff_factor, Duration::from_millis(500));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_negative_durations_and_empty_agent_pool() {
        let err = serde_json::from_str::<ScraperConfig>(r#"{"http_timeout": -1}"#)
            .expect_err("negative duration must fail");
        assert!(err.is_data());

        let config = ScraperConfig {
            user_agents: vec![String::from(" ")],
            ..ScraperConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = ScraperConfig::from_json_file(Path::new("/nonexistent/marketlens.json"))
            .expect_err("must fail");
        assert!(err.to_string().contains("/nonexistent/marketlens.json"));
    }
}
