use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ScraperConfig, DEFAULT_USER_AGENTS};
use crate::http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest};
use crate::retry::RetryConfig;
use crate::robots::{RobotsDecision, RobotsGate};
use crate::throttling::OriginThrottle;
use crate::{ScrapeError, UtcDateTime};

/// How a page body was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Static,
    Rendered,
}

/// A page body together with where and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub url: String,
    pub body: String,
    pub source: FetchSource,
    pub fetched_at: UtcDateTime,
}

impl FetchResult {
    pub fn new(url: impl Into<String>, body: impl Into<String>, source: FetchSource) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            source,
            fetched_at: UtcDateTime::now(),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.source == FetchSource::Rendered
    }
}

/// Round-robin User-Agent rotation starting at a random entry.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    pub fn new(agents: &[String]) -> Self {
        let mut agents: Vec<String> = agents
            .iter()
            .map(|ua| ua.trim())
            .filter(|ua| !ua.is_empty())
            .map(str::to_owned)
            .collect();
        if agents.is_empty() {
            agents = DEFAULT_USER_AGENTS.iter().map(|ua| (*ua).to_owned()).collect();
        }
        let start = fastrand::usize(..agents.len());
        Self {
            agents,
            cursor: AtomicUsize::new(start),
        }
    }

    pub fn next(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Static page fetcher: robots gate, per-origin throttle, bounded retries.
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    retry: RetryConfig,
    timeout: Duration,
    accept: String,
    accept_language: String,
    agents: UserAgentPool,
    throttle: OriginThrottle,
    robots: Option<RobotsGate>,
}

impl Fetcher {
    pub fn new(client: Arc<dyn HttpClient>, config: &ScraperConfig) -> Self {
        let agents = UserAgentPool::new(&config.user_agents);
        let robots = config.respect_robots.then(|| {
            RobotsGate::new(
                Arc::clone(&client),
                config.robots_agent.as_str(),
                agents.next(),
                config.http_timeout,
                config.robots_cache_ttl,
            )
        });

        Self {
            client,
            retry: config.retry.clone(),
            timeout: config.http_timeout,
            accept: config.accept.clone(),
            accept_language: config.accept_language.clone(),
            agents,
            throttle: OriginThrottle::new(config.rate_limit_delay),
            robots,
        }
    }

    pub fn user_agents(&self) -> &UserAgentPool {
        &self.agents
    }

    /// GETs `url` and returns its body once a 2xx arrives.
    ///
    /// Fails with [`ScrapeError::RobotsTxt`] before any dispatch when the
    /// origin's robots.txt forbids the path, and with
    /// [`ScrapeError::Request`] once the attempt budget is spent or a
    /// non-retryable status/transport failure occurs.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        let parsed = parse_http_url(url)?;
        let origin = parsed.origin().ascii_serialization();

        let crawl_delay = match &self.robots {
            Some(gate) => match gate.check(&parsed).await {
                RobotsDecision::Allowed { crawl_delay } => crawl_delay,
                RobotsDecision::Denied => {
                    info!(url, "skipping url disallowed by robots.txt");
                    return Err(ScrapeError::RobotsTxt {
                        url: url.to_owned(),
                    });
                }
            },
            None => None,
        };

        let mut attempt = 0;
        loop {
            self.throttle.until_ready(&origin, crawl_delay).await;

            let user_agent = self.agents.next();
            let request = HttpRequest::get(parsed.as_str())
                .with_header("user-agent", user_agent)
                .with_header("accept", self.accept.as_str())
                .with_header("accept-language", self.accept_language.as_str())
                .with_header("upgrade-insecure-requests", "1")
                .with_timeout(self.timeout);
            debug!(url, attempt = attempt + 1, user_agent, "dispatching request");

            let outcome = match tokio::time::timeout(self.timeout, self.client.execute(request)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(HttpError::timeout(format!(
                    "no response within {:.1}s",
                    self.timeout.as_secs_f64()
                ))),
            };

            let failure = match outcome {
                Ok(response) if response.is_success() => {
                    debug!(url, status = response.status, bytes = response.body.len(), "fetched");
                    return Ok(FetchResult::new(url, response.body, FetchSource::Static));
                }
                Ok(response) => {
                    let message = format!("HTTP {}", response.status);
                    if !self.retry.should_retry_status(response.status) {
                        warn!(url, status = response.status, "non-retryable status");
                        return Err(ScrapeError::request(url, attempt + 1, message));
                    }
                    message
                }
                Err(error) => {
                    if !self.is_retryable(&error) {
                        warn!(url, %error, "non-retryable transport failure");
                        return Err(ScrapeError::request(url, attempt + 1, error.message()));
                    }
                    error.message().to_owned()
                }
            };

            if !self.retry.has_attempt_after(attempt) {
                warn!(url, attempts = attempt + 1, %failure, "giving up");
                return Err(ScrapeError::request(url, attempt + 1, failure));
            }

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                %failure,
                "retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn is_retryable(&self, error: &HttpError) -> bool {
        match error.kind() {
            HttpErrorKind::Timeout => self.retry.retry_on_timeout,
            HttpErrorKind::Connect => self.retry.retry_on_connect,
            HttpErrorKind::Body | HttpErrorKind::Other => true,
        }
    }
}

fn parse_http_url(url: &str) -> Result<Url, ScrapeError> {
    let parsed =
        Url::parse(url).map_err(|error| ScrapeError::request(url, 0, format!("invalid url: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ScrapeError::request(url, 0, "only absolute http(s) urls can be fetched"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::http_client::HttpResponse;

    /// Replays scripted outcomes for page requests; robots.txt is always 404.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn page_requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    impl HttpClient for Scripted {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let outcome = if request.url.ends_with("/robots.txt") {
                Ok(HttpResponse::new(404, ""))
            } else {
                self.requests.lock().expect("lock").push(request);
                self.outcomes
                    .lock()
                    .expect("lock")
                    .pop_front()
                    .unwrap_or_else(|| Ok(HttpResponse::new(200, "<html></html>")))
            };
            Box::pin(async move { outcome })
        }
    }

    fn quick_config() -> ScraperConfig {
        ScraperConfig {
            rate_limit_delay: Duration::ZERO,
            retry: RetryConfig::exponential(3, Duration::from_millis(1)),
            ..ScraperConfig::default()
        }
    }

    #[tokio::test]
    async fn stops_after_max_retries_on_persistent_503() {
        let client = Scripted::new(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(200, "never reached")),
        ]);
        let fetcher = Fetcher::new(client.clone(), &quick_config());

        let err = fetcher
            .fetch("https://markets.example/forex")
            .await
            .expect_err("must exhaust retries");

        assert_eq!(client.page_requests().len(), 3);
        assert!(matches!(err, ScrapeError::Request { attempts: 3, .. }), "{err}");
    }

    #[tokio::test]
    async fn success_on_second_attempt_stops_retrying() {
        let client = Scripted::new(vec![
            Err(HttpError::timeout("slow")),
            Ok(HttpResponse::new(200, "<p>ok</p>")),
        ]);
        let fetcher = Fetcher::new(client.clone(), &quick_config());

        let result = fetcher
            .fetch("https://markets.example/forex")
            .await
            .expect("second attempt succeeds");

        assert_eq!(result.body, "<p>ok</p>");
        assert_eq!(result.source, FetchSource::Static);
        assert_eq!(client.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let client = Scripted::new(vec![Ok(HttpResponse::new(404, ""))]);
        let fetcher = Fetcher::new(client.clone(), &quick_config());

        let err = fetcher
            .fetch("https://markets.example/missing")
            .await
            .expect_err("404 fails");

        assert_eq!(client.page_requests().len(), 1);
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn connect_failures_respect_retry_flag() {
        let client = Scripted::new(vec![Err(HttpError::connect("refused"))]);
        let mut config = quick_config();
        config.retry.retry_on_connect = false;
        let fetcher = Fetcher::new(client.clone(), &config);

        let err = fetcher.fetch("https://markets.example/").await.expect_err("must fail");

        assert_eq!(client.page_requests().len(), 1);
        assert!(matches!(err, ScrapeError::Request { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn each_attempt_rotates_the_user_agent_and_sends_accept_headers() {
        let client = Scripted::new(vec![
            Ok(HttpResponse::new(500, "")),
            Ok(HttpResponse::new(502, "")),
            Ok(HttpResponse::new(200, "")),
        ]);
        let fetcher = Fetcher::new(client.clone(), &quick_config());

        fetcher.fetch("https://markets.example/").await.expect("third attempt succeeds");

        let requests = client.page_requests();
        let agents: Vec<&str> = requests
            .iter()
            .map(|request| request.header("user-agent").expect("user agent set"))
            .collect();
        assert_eq!(agents.len(), 3);
        assert_ne!(agents[0], agents[1]);
        assert_ne!(agents[1], agents[2]);
        assert!(requests[0]
            .header("accept")
            .is_some_and(|accept| accept.starts_with("text/html")));
        assert_eq!(requests[0].header("accept-language"), Some("en-US,en;q=0.5"));
    }

    #[tokio::test]
    async fn rejects_non_http_urls_without_dispatch() {
        let client = Scripted::new(Vec::new());
        let fetcher = Fetcher::new(client.clone(), &quick_config());

        for url in ["not a url", "ftp://markets.example/file", "mailto:desk@markets.example"] {
            let err = fetcher.fetch(url).await.expect_err("must fail");
            assert!(matches!(err, ScrapeError::Request { attempts: 0, .. }), "{url}");
        }
        assert!(client.page_requests().is_empty());
    }

    #[test]
    fn user_agent_pool_cycles_through_every_entry() {
        let pool = UserAgentPool::new(&[String::from("a"), String::from(" "), String::from("b")]);
        assert_eq!(pool.len(), 2);

        let first = pool.next().to_owned();
        let second = pool.next().to_owned();
        let third = pool.next().to_owned();
        assert_ne!(first, second);
        assert_eq!(first, third);
    }
}
