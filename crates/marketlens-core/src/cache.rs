//! Per-run page sharing for categories that read the same URL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::fetcher::FetchResult;
use crate::ScrapeError;

type PageOutcome = Result<FetchResult, ScrapeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Concurrent and later lookups of a key share the first fetch. (Default)
    #[default]
    Use,
    /// Every lookup runs its own fetch and nothing is stored.
    Bypass,
}

/// Single-flight memo keyed by URL. Failures are memoised as well, so one
/// unreachable page costs one retry budget per run, not one per category.
#[derive(Debug, Default)]
pub struct PageCache {
    mode: CacheMode,
    entries: Mutex<HashMap<String, Arc<OnceCell<PageOutcome>>>>,
}

impl PageCache {
    pub fn new(mode: CacheMode) -> Self {
        Self {
            mode,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> PageOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PageOutcome>,
    {
        if self.mode == CacheMode::Bypass {
            return fetch().await;
        }

        let cell = {
            let mut entries = self
                .entries
                .lock()
                .expect("page cache should not be poisoned");
            Arc::clone(entries.entry(key.to_owned()).or_default())
        };

        cell.get_or_init(fetch).await.clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("page cache should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::fetcher::FetchSource;

    async fn slow_fetch(calls: &AtomicUsize, url: &str) -> PageOutcome {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(FetchResult::new(url, "<html></html>", FetchSource::Static))
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_fetch() {
        let cache = PageCache::new(CacheMode::Use);
        let calls = AtomicUsize::new(0);
        let url = "https://markets.example/macro";

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(url, || slow_fetch(&calls, url)),
            cache.get_or_fetch(url, || slow_fetch(&calls, url)),
            cache.get_or_fetch(url, || slow_fetch(&calls, url)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.expect("ok").body, b.expect("ok").body);
        assert!(c.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_shared_too() {
        let cache = PageCache::new(CacheMode::Use);
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let failing = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScrapeError::request("https://markets.example/", 3, "HTTP 503"))
        };

        let first = cache.get_or_fetch("k", failing).await;
        let second = cache.get_or_fetch("k", failing).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bypass_mode_always_fetches() {
        let cache = PageCache::new(CacheMode::Bypass);
        let calls = AtomicUsize::new(0);
        let url = "https://markets.example/";

        cache.get_or_fetch(url, || slow_fetch(&calls, url)).await.expect("ok");
        cache.get_or_fetch(url, || slow_fetch(&calls, url)).await.expect("ok");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
