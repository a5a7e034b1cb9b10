//! # Marketlens Core
//!
//! Resilient scraping of market, macro and news data from pages that mix
//! static and script-rendered content.
//!
//! ## Overview
//!
//! - **Fetch layer**: per-origin rate limiting, bounded retries with
//!   exponential backoff, User-Agent rotation and a robots.txt gate
//! - **Fallback engine**: static fetch first, a headless browser only when
//!   the markers a category needs are missing
//! - **Extraction and validation**: selector rules turn markup into raw rows,
//!   and the validator turns rows into typed records one at a time, so a bad
//!   row never costs its siblings
//! - **Pipeline**: categories run concurrently and merge into one
//!   [`AggregateOutput`]
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Per-run single-flight page sharing |
//! | [`config`] | Scraper configuration and defaults |
//! | [`domain`] | Categories, typed records, symbols, timestamps |
//! | [`envelope`] | Aggregate output and run metadata |
//! | [`error`] | Validation, scrape and core error types |
//! | [`extract`] | Selector-driven extraction |
//! | [`fallback`] | Static/rendered fetch decision |
//! | [`fetcher`] | Rate-limited retrying static fetcher |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Concurrent category orchestration |
//! | [`renderer`] | Headless browser rendering |
//! | [`retry`] | Retry policy and backoff |
//! | [`robots`] | robots.txt policy checks |
//! | [`rules`] | Extraction rule sets |
//! | [`throttling`] | Per-origin dispatch spacing |
//! | [`validate`] | Raw row validation and normalization |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketlens_core::{Category, Pipeline, RuleBook, ScraperConfig};
//!
//! let pipeline = Pipeline::from_config(ScraperConfig::default(), RuleBook::default())?;
//! let output = pipeline.run(&Category::all()).await?;
//! println!("{}", serde_json::to_string_pretty(&output)?);
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fetcher;
pub mod http_client;
pub mod pipeline;
pub mod renderer;
pub mod retry;
pub mod robots;
pub mod rules;
pub mod throttling;
pub mod validate;

pub use cache::{CacheMode, PageCache};
pub use config::{ScraperConfig, DEFAULT_USER_AGENTS, PIPELINE_VERSION};
pub use domain::{
    Category, CountryCode, Frequency, IndicatorRecord, InstrumentRecord, MarketCategory, NewsFeed,
    NewsRecord, Sentiment, Symbol, TypedRecord, UtcDateTime,
};
pub use envelope::{AggregateOutput, RunMetadata, RunSummary};
pub use error::{CoreError, ScrapeError, ValidationError};
pub use extract::{extract, missing_markers, RawRecord};
pub use fallback::FallbackFetcher;
pub use fetcher::{FetchResult, FetchSource, Fetcher, UserAgentPool};
pub use http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use pipeline::Pipeline;
pub use renderer::{ChromiumRenderer, RenderConfig, Renderer};
pub use retry::{Backoff, RetryConfig};
pub use robots::{RobotsDecision, RobotsGate};
pub use rules::{ExtractionRuleSet, FieldSelector, IndicatorRule, Layout, RuleBook};
pub use throttling::OriginThrottle;
pub use validate::Validator;
