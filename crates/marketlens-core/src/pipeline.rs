//! Runs every requested category through fetch, extract and validate, and
//! merges the outcomes into one [`AggregateOutput`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::cache::CacheMode;
use crate::config::{ScraperConfig, PIPELINE_VERSION};
use crate::domain::{Category, TypedRecord, UtcDateTime};
use crate::envelope::{AggregateOutput, RunMetadata};
use crate::extract::extract;
use crate::fallback::FallbackFetcher;
use crate::fetcher::{FetchSource, Fetcher};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::renderer::{ChromiumRenderer, Renderer};
use crate::rules::RuleBook;
use crate::validate::Validator;
use crate::{CoreError, ScrapeError};

pub struct Pipeline {
    engine: FallbackFetcher,
    rules: RuleBook,
    config: ScraperConfig,
}

/// What one category contributed to the run. Built completely before it is
/// merged, so a category's records and errors land together or not at all.
#[derive(Debug)]
struct CategoryOutcome {
    category: Category,
    records: Vec<TypedRecord>,
    errors: Vec<String>,
    source: Option<FetchSource>,
}

impl CategoryOutcome {
    fn failed(category: Category, error: &ScrapeError) -> Self {
        warn!(%category, %error, "category unavailable");
        Self {
            category,
            records: Vec::new(),
            errors: vec![format!("{category}: {error}")],
            source: None,
        }
    }
}

impl Pipeline {
    pub fn new(
        engine: FallbackFetcher,
        rules: RuleBook,
        config: ScraperConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            engine,
            rules,
            config,
        })
    }

    /// Wires the production stack: reqwest transport, and a Chromium
    /// renderer unless rendering is disabled.
    pub fn from_config(config: ScraperConfig, rules: RuleBook) -> Result<Self, CoreError> {
        let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let renderer = config
            .render
            .enabled
            .then(|| Arc::new(ChromiumRenderer::new(&config)) as Arc<dyn Renderer>);
        let mode = if config.share_pages {
            CacheMode::Use
        } else {
            CacheMode::Bypass
        };
        let fetcher = Arc::new(Fetcher::new(client, &config));
        let engine = FallbackFetcher::with_cache_mode(fetcher, renderer, mode);
        Self::new(engine, rules, config)
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrapes `categories` concurrently (at most `max_concurrency` at a
    /// time). Category failures become `errors` entries; nothing aborts the
    /// run. Output order is the declared category order.
    pub async fn run(&self, categories: &[Category]) -> Result<AggregateOutput, CoreError> {
        let started = Instant::now();
        let scraped_at = UtcDateTime::now();
        let selected: BTreeSet<Category> = categories.iter().copied().collect();

        let mut metadata = RunMetadata::new(
            scraped_at,
            PIPELINE_VERSION,
            self.config.retry.clone(),
            self.config.rate_limit_delay,
            self.config.http_timeout,
        )?;
        info!(run_id = %metadata.run_id, categories = selected.len(), "starting scrape run");

        let mut outcomes: Vec<CategoryOutcome> = stream::iter(selected.iter().copied())
            .map(|category| self.run_category(category, scraped_at))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|outcome| outcome.category);

        let mut data_sources = BTreeSet::new();
        let mut selectors_used = BTreeSet::new();
        for category in &selected {
            if let Some(rules) = self.rules.get(category.rule_group()) {
                data_sources.insert(rules.url.clone());
                selectors_used.insert(category.rule_group().to_owned());
            }
        }
        metadata.data_sources = data_sources.into_iter().collect();
        metadata.selectors_used = selectors_used.into_iter().collect();

        let mut output = AggregateOutput::new(metadata);
        for outcome in outcomes {
            if outcome.source == Some(FetchSource::Rendered) {
                output.metadata.rendered_categories.push(outcome.category);
            }
            output.errors.extend(outcome.errors);
            output.records.insert(outcome.category, outcome.records);
        }
        output.metadata.rendered_fetch_used = !output.metadata.rendered_categories.is_empty();
        output.metadata.duration_seconds = started.elapsed().as_secs_f64();

        let summary = output.summary();
        info!(
            duration_s = output.metadata.duration_seconds,
            total_items = output.total_items(),
            instruments = summary.market_total(),
            indicators = summary.macro_total(),
            articles = summary.news_total(),
            errors = output.errors.len(),
            rendered = output.metadata.rendered_fetch_used,
            "scrape run complete"
        );
        Ok(output)
    }

    async fn run_category(&self, category: Category, scraped_at: UtcDateTime) -> CategoryOutcome {
        let Some(rules) = self.rules.for_category(category) else {
            let error = ScrapeError::parse(format!(
                "no extraction rules for group '{}'",
                category.rule_group()
            ));
            return CategoryOutcome::failed(category, &error);
        };

        let page = match self
            .engine
            .fetch_with_fallback(&rules.url, &rules.markers(), &rules.wait_markers())
            .await
        {
            Ok(page) => page,
            Err(error) => return CategoryOutcome::failed(category, &error),
        };

        let raw_records = match extract(&page.body, &rules) {
            Ok(raw_records) => raw_records,
            Err(error) => return CategoryOutcome::failed(category, &error),
        };

        let validator = Validator::new(scraped_at).with_base_url(&page.url);
        let mut records = Vec::with_capacity(raw_records.len());
        let mut errors = Vec::new();
        for raw in &raw_records {
            match validator.validate(raw, category) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(%category, row = raw.index, %reason, "dropping record");
                    errors.push(format!("{category}[row {}]: {reason}", raw.index));
                }
            }
        }

        info!(
            %category,
            source = ?page.source,
            extracted = raw_records.len(),
            kept = records.len(),
            "category complete"
        );
        CategoryOutcome {
            category,
            records,
            errors,
            source: Some(page.source),
        }
    }
}
