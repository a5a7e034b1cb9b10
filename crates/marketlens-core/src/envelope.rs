use std::collections::BTreeMap;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::config::secs;
use crate::domain::{Category, TypedRecord, UtcDateTime};
use crate::retry::RetryConfig;
use crate::ValidationError;

/// Result of one scraping run, as handed to the JSON writer.
///
/// Serializes to a single object: one array per category in declared order
/// (empty arrays included), then `metadata`, then `errors`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutput {
    pub records: BTreeMap<Category, Vec<TypedRecord>>,
    pub metadata: RunMetadata,
    pub errors: Vec<String>,
}

impl AggregateOutput {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            records: BTreeMap::new(),
            metadata,
            errors: Vec::new(),
        }
    }

    pub fn records_for(&self, category: Category) -> &[TypedRecord] {
        self.records
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Partial data counts: the run succeeds if any category produced a
    /// record, whatever `errors` holds.
    pub fn is_success(&self) -> bool {
        self.total_items() > 0
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for category in Category::all() {
            let count = self.records_for(category).len();
            let group = match category {
                Category::Market(_) => &mut summary.markets,
                Category::Macro(_) => &mut summary.macroeconomics,
                Category::News(_) => &mut summary.news,
            };
            group.insert(category.key(), count);
        }
        summary
    }
}

impl Serialize for AggregateOutput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let categories = Category::all();
        let mut map = serializer.serialize_map(Some(categories.len() + 2))?;
        for category in categories {
            map.serialize_entry(&category, self.records_for(category))?;
        }
        map.serialize_entry("metadata", &self.metadata)?;
        map.serialize_entry("errors", &self.errors)?;
        map.end()
    }
}

/// Record counts per category, grouped the way the run log reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub markets: BTreeMap<String, usize>,
    pub macroeconomics: BTreeMap<String, usize>,
    pub news: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn market_total(&self) -> usize {
        self.markets.values().sum()
    }

    pub fn macro_total(&self) -> usize {
        self.macroeconomics.values().sum()
    }

    pub fn news_total(&self) -> usize {
        self.news.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub scraped_at: UtcDateTime,
    pub pipeline_version: String,
    pub run_id: String,
    pub data_sources: Vec<String>,
    pub retry_config: RetryConfig,
    #[serde(with = "secs")]
    pub rate_limit_delay: Duration,
    #[serde(with = "secs")]
    pub http_timeout: Duration,
    pub selectors_used: Vec<String>,
    pub rendered_fetch_used: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rendered_categories: Vec<Category>,
    pub duration_seconds: f64,
}

impl RunMetadata {
    pub fn new(
        scraped_at: UtcDateTime,
        pipeline_version: impl Into<String>,
        retry_config: RetryConfig,
        rate_limit_delay: Duration,
        http_timeout: Duration,
    ) -> Result<Self, ValidationError> {
        let pipeline_version = pipeline_version.into();
        if !is_valid_pipeline_version(&pipeline_version) {
            return Err(ValidationError::InvalidPipelineVersion {
                value: pipeline_version,
            });
        }

        Ok(Self {
            scraped_at,
            pipeline_version,
            run_id: Uuid::new_v4().to_string(),
            data_sources: Vec::new(),
            retry_config,
            rate_limit_delay,
            http_timeout,
            selectors_used: Vec::new(),
            rendered_fetch_used: false,
            rendered_categories: Vec::new(),
            duration_seconds: 0.0,
        })
    }
}

fn is_valid_pipeline_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let mut parts = version.split('.');
    let major = parts.next();
    let minor = parts.next();
    let patch = parts.next();

    if parts.next().is_some() {
        return false;
    }

    [major, minor, patch].iter().all(|part| {
        part.is_some_and(|segment| {
            !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_digit())
        })
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::domain::{CountryCode, MarketCategory, NewsFeed, NewsRecord};

    fn metadata() -> RunMetadata {
        RunMetadata::new(
            UtcDateTime::parse("2024-03-05T12:00:00Z").expect("valid timestamp"),
            "v1.0.0",
            RetryConfig::default(),
            Duration::from_secs(5),
            Duration::from_secs(30),
        )
        .expect("metadata should be valid")
    }

    fn headline() -> TypedRecord {
        TypedRecord::News(NewsRecord {
            title: String::from("Stocks rally"),
            summary: None,
            timestamp: UtcDateTime::parse("2024-03-05T12:00:00Z").expect("valid timestamp"),
            url: String::from("https://news.example.com/rally"),
            source: None,
            category: None,
            sentiment: None,
        })
    }

    #[test]
    fn rejects_bad_pipeline_version() {
        let err = RunMetadata::new(
            UtcDateTime::now(),
            "1.0.0",
            RetryConfig::default(),
            Duration::ZERO,
            Duration::ZERO,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidPipelineVersion { .. }));
        assert!(!is_valid_pipeline_version("v1.0"));
        assert!(!is_valid_pipeline_version("v1.0.0.1"));
        assert!(is_valid_pipeline_version("v12.3.45"));
    }

    #[test]
    fn serializes_every_category_key_in_declared_order() {
        let mut output = AggregateOutput::new(metadata());
        output
            .records
            .insert(Category::News(NewsFeed::DividendNews), vec![headline()]);

        let json = serde_json::to_string(&output).expect("serializable");
        let value: Value = serde_json::from_str(&json).expect("valid json");
        let object = value.as_object().expect("object");

        assert_eq!(object.len(), 24 + 2);
        assert_eq!(object["forex"], Value::Array(Vec::new()));
        assert_eq!(object["dividend_news"][0]["title"], "Stocks rally");
        assert_eq!(object["metadata"]["rate_limit_delay"], 5.0);
        assert_eq!(object["metadata"]["scraped_at"], "2024-03-05T12:00:00Z");

        let forex = json.find("\"forex\"").expect("forex key");
        let macro_us = json.find("\"macro_us\"").expect("macro_us key");
        let headlines = json.find("\"market_headlines\"").expect("headlines key");
        let errors = json.find("\"errors\"").expect("errors key");
        assert!(forex < macro_us && macro_us < headlines && headlines < errors);
    }

    #[test]
    fn success_needs_at_least_one_record() {
        let mut output = AggregateOutput::new(metadata());
        output
            .errors
            .push(String::from("commodities: container not found"));
        assert!(!output.is_success());

        output
            .records
            .insert(Category::News(NewsFeed::MarketHeadlines), vec![headline()]);
        assert!(output.is_success());
        assert_eq!(output.total_items(), 1);
    }

    #[test]
    fn summary_groups_counts() {
        let mut output = AggregateOutput::new(metadata());
        output
            .records
            .insert(Category::News(NewsFeed::MarketHeadlines), vec![headline(), headline()]);

        let summary = output.summary();
        assert_eq!(summary.news_total(), 2);
        assert_eq!(summary.market_total(), 0);
        assert_eq!(summary.markets.len(), MarketCategory::ALL.len());
        assert_eq!(summary.macroeconomics[&Category::Macro(CountryCode::EU).key()], 0);
    }
}
