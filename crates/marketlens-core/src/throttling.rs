use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-origin dispatch gate. Each origin gets its own single-cell limiter, so
/// two dispatches to one origin are always at least the origin's delay apart
/// no matter how many tasks are waiting.
#[derive(Clone)]
pub struct OriginThrottle {
    default_delay: Duration,
    limiters: Arc<Mutex<HashMap<String, Option<Arc<DirectRateLimiter>>>>>,
}

impl OriginThrottle {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            limiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Suspends the caller until a request to `origin` may be dispatched.
    ///
    /// `min_delay` (e.g. a robots.txt crawl-delay) only raises the spacing and
    /// only takes effect the first time the origin is seen.
    pub async fn until_ready(&self, origin: &str, min_delay: Option<Duration>) {
        let limiter = self.limiter_for(origin, min_delay);
        if let Some(limiter) = limiter {
            limiter.until_ready().await;
        }
    }

    fn limiter_for(&self, origin: &str, min_delay: Option<Duration>) -> Option<Arc<DirectRateLimiter>> {
        let mut limiters = self
            .limiters
            .lock()
            .expect("origin throttle map should not be poisoned");
        limiters
            .entry(origin.to_owned())
            .or_insert_with(|| {
                let delay = min_delay.map_or(self.default_delay, |d| d.max(self.default_delay));
                quota_from_delay(delay).map(|quota| Arc::new(RateLimiter::direct(quota)))
            })
            .clone()
    }
}

/// One cell per `delay`, burst of one. `None` when the delay is zero.
fn quota_from_delay(delay: Duration) -> Option<Quota> {
    Quota::with_period(delay).map(|quota| quota.allow_burst(NonZeroU32::MIN))
}
