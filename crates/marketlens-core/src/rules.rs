//! Selector rule sets. Selector strings are opaque here; they are only
//! compiled by the extractor and the fallback marker probe.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Category, MarketCategory, NewsFeed};
use crate::CoreError;

pub const DEFAULT_BASE_URL: &str = "https://tradingeconomics.com";
pub const DEFAULT_MAX_INDICATORS: usize = 20;

/// Where a field's text comes from: `"css"` (element text), `"css@attr"`
/// (attribute of the first match) or `"@attr"` (attribute of the row or
/// indicator element itself). An empty selector reads the element's own text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldSelector {
    pub selector: Option<String>,
    pub attribute: Option<String>,
}

impl FieldSelector {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let (selector, attribute) = match trimmed.rsplit_once('@') {
            Some((selector, attribute)) if !attribute.trim().is_empty() => {
                (selector.trim(), Some(attribute.trim().to_owned()))
            }
            _ => (trimmed, None),
        };
        Self {
            selector: (!selector.is_empty()).then(|| selector.to_owned()),
            attribute,
        }
    }

    pub fn text(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_owned()),
            attribute: None,
        }
    }
}

impl From<String> for FieldSelector {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for FieldSelector {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<FieldSelector> for String {
    fn from(value: FieldSelector) -> Self {
        value.to_string()
    }
}

impl Display for FieldSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(selector) = &self.selector {
            f.write_str(selector)?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "@{attribute}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRule {
    pub name: String,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// One record per row element inside the container.
    Rows {
        row: String,
        fields: BTreeMap<String, FieldSelector>,
    },
    /// A matrix keyed by an outer label (a country): pick the scope whose
    /// key matches, then emit one record per indicator found inside it.
    Keyed {
        scope: String,
        key: FieldSelector,
        #[serde(default)]
        key_match: Vec<String>,
        indicators: Vec<IndicatorRule>,
        #[serde(default = "default_max_indicators")]
        max_indicators: usize,
        #[serde(default)]
        fields: BTreeMap<String, FieldSelector>,
    },
}

fn default_max_indicators() -> usize {
    DEFAULT_MAX_INDICATORS
}

/// Everything needed to fetch and extract one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRuleSet {
    pub url: String,
    pub container: String,
    /// Selectors that must match for the static markup to be usable.
    /// Empty means the container alone.
    #[serde(default)]
    pub required_markers: Vec<String>,
    /// Selectors the browser waits for when rendering.
    #[serde(default)]
    pub wait_markers: Vec<String>,
    #[serde(default)]
    pub max_rows: Option<usize>,
    pub layout: Layout,
}

impl ExtractionRuleSet {
    pub fn markers(&self) -> Vec<String> {
        if self.required_markers.is_empty() {
            vec![self.container.clone()]
        } else {
            self.required_markers.clone()
        }
    }

    pub fn wait_markers(&self) -> Vec<String> {
        if self.wait_markers.is_empty() {
            self.markers()
        } else {
            self.wait_markers.clone()
        }
    }

    /// Narrows a keyed rule set to one key (e.g. a country's labels).
    /// Row layouts are returned unchanged.
    pub fn bind_key<I, S>(&self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut bound = self.clone();
        if let Layout::Keyed { key_match, .. } = &mut bound.layout {
            *key_match = labels.into_iter().map(Into::into).collect();
        }
        bound
    }
}

/// Rule sets by rule group (`forex`, ..., `macro`, `market_headlines`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleBook {
    groups: BTreeMap<String, ExtractionRuleSet>,
}

impl RuleBook {
    pub fn new(groups: BTreeMap<String, ExtractionRuleSet>) -> Self {
        Self { groups }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn get(&self, group: &str) -> Option<&ExtractionRuleSet> {
        self.groups.get(group)
    }

    pub fn insert(&mut self, group: impl Into<String>, rules: ExtractionRuleSet) {
        self.groups.insert(group.into(), rules);
    }

    /// The rule set for a category, with macro rules bound to its country.
    pub fn for_category(&self, category: Category) -> Option<ExtractionRuleSet> {
        let rules = self.get(category.rule_group())?;
        Some(match category {
            Category::Macro(country) => rules.bind_key(country.aliases().iter().copied()),
            Category::Market(_) | Category::News(_) => rules.clone(),
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl Default for RuleBook {
    /// Rules for the markup of the public markets homepage and its sections.
    fn default() -> Self {
        let mut groups = BTreeMap::new();

        for category in MarketCategory::ALL {
            let name = category.as_str();
            groups.insert(
                name.to_owned(),
                ExtractionRuleSet {
                    url: format!("{DEFAULT_BASE_URL}/{}", market_path(category)),
                    container: format!("#{name}, table[data-category='{name}']"),
                    required_markers: vec![format!("#{name} tr[data-symbol], table[data-category='{name}'] tr[data-symbol]")],
                    wait_markers: Vec::new(),
                    max_rows: None,
                    layout: Layout::Rows {
                        row: String::from("tbody tr"),
                        fields: instrument_fields(),
                    },
                },
            );
        }

        groups.insert(
            String::from("macro"),
            ExtractionRuleSet {
                url: format!("{DEFAULT_BASE_URL}/macro"),
                container: String::from("#macro, table.macro-matrix"),
                required_markers: vec![String::from("#macro tr[data-country], table.macro-matrix tr[data-country]")],
                wait_markers: Vec::new(),
                max_rows: None,
                layout: Layout::Keyed {
                    scope: String::from("tr[data-country]"),
                    key: FieldSelector::parse("@data-country"),
                    key_match: Vec::new(),
                    indicators: DEFAULT_INDICATORS
                        .iter()
                        .map(|(name, slug)| IndicatorRule {
                            name: (*name).to_owned(),
                            selector: format!("td[data-indicator='{slug}']"),
                        })
                        .collect(),
                    max_indicators: DEFAULT_MAX_INDICATORS,
                    fields: BTreeMap::from([
                        (String::from("value"), FieldSelector::parse("@data-value")),
                        (String::from("previous"), FieldSelector::parse("@data-previous")),
                        (String::from("unit"), FieldSelector::parse("@data-unit")),
                        (String::from("period"), FieldSelector::parse("@data-period")),
                    ]),
                },
            },
        );

        for feed in NewsFeed::ALL {
            let name = feed.as_str();
            groups.insert(
                name.to_owned(),
                ExtractionRuleSet {
                    url: format!("{DEFAULT_BASE_URL}/news"),
                    container: format!("#{name}, section[data-feed='{name}']"),
                    required_markers: vec![format!("#{name} article, section[data-feed='{name}'] article")],
                    wait_markers: Vec::new(),
                    max_rows: Some(25),
                    layout: Layout::Rows {
                        row: String::from("article"),
                        fields: BTreeMap::from([
                            (String::from("title"), FieldSelector::parse("h2, h3, .title")),
                            (String::from("summary"), FieldSelector::parse("p.summary, p")),
                            (String::from("url"), FieldSelector::parse("a@href")),
                            (String::from("timestamp"), FieldSelector::parse("time@datetime")),
                            (String::from("source"), FieldSelector::parse(".source")),
                            (String::from("category"), FieldSelector::parse(".category")),
                            (String::from("sentiment"), FieldSelector::parse("@data-sentiment")),
                        ]),
                    },
                },
            );
        }

        Self { groups }
    }
}

fn market_path(category: MarketCategory) -> &'static str {
    match category {
        MarketCategory::Etfs | MarketCategory::Derivatives => "markets",
        other => other.as_str(),
    }
}

fn instrument_fields() -> BTreeMap<String, FieldSelector> {
    [
        ("symbol", "@data-symbol"),
        ("name", "td.name"),
        ("value", "td.price"),
        ("change", "td.change"),
        ("pct_change", "td.pct-change"),
        ("bid", "td.bid"),
        ("ask", "td.ask"),
        ("high", "td.high"),
        ("low", "td.low"),
        ("open", "td.open"),
        ("previous_close", "td.prev-close"),
        ("timestamp", "td.time@datetime"),
    ]
    .into_iter()
    .map(|(field, selector)| (field.to_owned(), FieldSelector::parse(selector)))
    .collect()
}

const DEFAULT_INDICATORS: [(&str, &str); 12] = [
    ("GDP Growth", "gdp-growth"),
    ("Unemployment Rate", "unemployment"),
    ("Inflation Rate", "inflation"),
    ("Core Inflation Rate", "core-inflation"),
    ("Interest Rate", "interest-rate"),
    ("Trade Balance", "trade-balance"),
    ("Current Account", "current-account"),
    ("Government Debt to GDP", "debt-to-gdp"),
    ("Manufacturing PMI", "manufacturing-pmi"),
    ("Services PMI", "services-pmi"),
    ("Retail Sales", "retail-sales"),
    ("Industrial Production", "industrial-production"),
];
