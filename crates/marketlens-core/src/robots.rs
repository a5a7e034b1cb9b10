//! robots.txt gate consulted before the first request to each origin.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use texting_robots::Robot;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::http_client::{HttpClient, HttpRequest};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RobotsDecision {
    Allowed { crawl_delay: Option<Duration> },
    Denied,
}

impl RobotsDecision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

enum RobotsRules {
    AllowAll,
    Parsed(Robot),
}

impl RobotsRules {
    fn decide(&self, url: &str) -> RobotsDecision {
        match self {
            Self::AllowAll => RobotsDecision::Allowed { crawl_delay: None },
            Self::Parsed(robot) => {
                if robot.allowed(url) {
                    RobotsDecision::Allowed {
                        crawl_delay: robot
                            .delay
                            .filter(|delay| *delay > 0.0)
                            .and_then(|delay| Duration::try_from_secs_f32(delay).ok()),
                    }
                } else {
                    RobotsDecision::Denied
                }
            }
        }
    }
}

struct OriginEntry {
    created_at: Instant,
    rules: OnceCell<RobotsRules>,
}

/// Fetches, parses and caches robots.txt per origin.
///
/// Missing, unreadable or unparsable robots files allow everything.
pub struct RobotsGate {
    client: Arc<dyn HttpClient>,
    agent: String,
    user_agent: String,
    timeout: Duration,
    ttl: Duration,
    origins: Mutex<HashMap<String, Arc<OriginEntry>>>,
}

impl RobotsGate {
    pub fn new(
        client: Arc<dyn HttpClient>,
        agent: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            agent: agent.into(),
            user_agent: user_agent.into(),
            timeout,
            ttl,
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluates `url` against the cached rules of its origin, fetching them
    /// first if needed. Concurrent callers for the same origin share one fetch.
    pub async fn check(&self, url: &Url) -> RobotsDecision {
        let origin = url.origin().ascii_serialization();
        let entry = self.entry_for(&origin);
        let rules = entry
            .rules
            .get_or_init(|| self.load(url))
            .await;

        let decision = rules.decide(url.as_str());
        debug!(%origin, url = %url, ?decision, "robots decision");
        decision
    }

    fn entry_for(&self, origin: &str) -> Arc<OriginEntry> {
        let mut origins = self
            .origins
            .lock()
            .expect("robots cache should not be poisoned");
        let expired = origins
            .get(origin)
            .is_some_and(|entry| entry.created_at.elapsed() >= self.ttl);
        if expired {
            origins.remove(origin);
        }
        origins
            .entry(origin.to_owned())
            .or_insert_with(|| {
                Arc::new(OriginEntry {
                    created_at: Instant::now(),
                    rules: OnceCell::new(),
                })
            })
            .clone()
    }

    async fn load(&self, url: &Url) -> RobotsRules {
        let robots_url = match url.join("/robots.txt") {
            Ok(robots_url) => robots_url,
            Err(error) => {
                warn!(url = %url, %error, "cannot derive robots.txt location; allowing");
                return RobotsRules::AllowAll;
            }
        };

        let request = HttpRequest::get(robots_url.as_str())
            .with_header("user-agent", self.user_agent.as_str())
            .with_timeout(self.timeout);

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(robots_url = %robots_url, %error, "robots.txt unreachable; allowing");
                return RobotsRules::AllowAll;
            }
        };

        if response.status != 200 {
            info!(robots_url = %robots_url, status = response.status, "no usable robots.txt; allowing");
            return RobotsRules::AllowAll;
        }

        match Robot::new(&self.agent, response.body.as_bytes()) {
            Ok(robot) => RobotsRules::Parsed(robot),
            Err(error) => {
                warn!(robots_url = %robots_url, %error, "unparsable robots.txt; allowing");
                RobotsRules::AllowAll
            }
        }
    }
}
