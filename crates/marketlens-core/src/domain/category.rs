use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::ValidationError;

/// Instrument table kinds found on a market page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCategory {
    Forex,
    Indices,
    Commodities,
    Bonds,
    Crypto,
    Stocks,
    Etfs,
    Derivatives,
}

impl MarketCategory {
    pub const ALL: [Self; 8] = [
        Self::Forex,
        Self::Indices,
        Self::Commodities,
        Self::Bonds,
        Self::Crypto,
        Self::Stocks,
        Self::Etfs,
        Self::Derivatives,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forex => "forex",
            Self::Indices => "indices",
            Self::Commodities => "commodities",
            Self::Bonds => "bonds",
            Self::Crypto => "crypto",
            Self::Stocks => "stocks",
            Self::Etfs => "etfs",
            Self::Derivatives => "derivatives",
        }
    }
}

impl Display for MarketCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or(ValidationError::InvalidCategory { value: normalized })
    }
}

/// Countries covered by the macro indicator matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CountryCode {
    US,
    UK,
    EU,
    JP,
    CN,
    DE,
    FR,
    IT,
    ES,
    CA,
    AU,
    BR,
    IN,
}

impl CountryCode {
    pub const ALL: [Self; 13] = [
        Self::US,
        Self::UK,
        Self::EU,
        Self::JP,
        Self::CN,
        Self::DE,
        Self::FR,
        Self::IT,
        Self::ES,
        Self::CA,
        Self::AU,
        Self::BR,
        Self::IN,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::US => "US",
            Self::UK => "UK",
            Self::EU => "EU",
            Self::JP => "JP",
            Self::CN => "CN",
            Self::DE => "DE",
            Self::FR => "FR",
            Self::IT => "IT",
            Self::ES => "ES",
            Self::CA => "CA",
            Self::AU => "AU",
            Self::BR => "BR",
            Self::IN => "IN",
        }
    }

    /// Lower-case labels a page may use for the country, code included.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::US => &["us", "usa", "united states", "america"],
            Self::UK => &["uk", "gb", "united kingdom", "great britain", "britain"],
            Self::EU => &["eu", "euro area", "eurozone", "euro zone", "european union"],
            Self::JP => &["jp", "japan"],
            Self::CN => &["cn", "china"],
            Self::DE => &["de", "germany"],
            Self::FR => &["fr", "france"],
            Self::IT => &["it", "italy"],
            Self::ES => &["es", "spain"],
            Self::CA => &["ca", "canada"],
            Self::AU => &["au", "australia"],
            Self::BR => &["br", "brazil"],
            Self::IN => &["in", "india"],
        }
    }

    /// Resolves a code or a country name.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|code| code.aliases().contains(&normalized.as_str()))
    }
}

impl Display for CountryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_label(value).ok_or_else(|| ValidationError::InvalidCountry {
            value: value.trim().to_owned(),
        })
    }
}

/// Release cadence of a macro indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Guesses the cadence from an indicator name when the page does not say.
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let quarterly_marker = lower
            .split(|ch: char| !ch.is_ascii_alphanumeric())
            .any(|word| matches!(word, "q1" | "q2" | "q3" | "q4" | "qoq"));
        if lower.contains("gdp") || lower.contains("quarter") || quarterly_marker {
            Self::Quarterly
        } else if lower.contains("annual") || lower.contains("yoy") {
            Self::Yearly
        } else if lower.contains("weekly") || lower.contains("jobless claims") {
            Self::Weekly
        } else {
            Self::Monthly
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" | "annual" | "annually" => Ok(Self::Yearly),
            other => Err(ValidationError::InvalidFrequency {
                value: other.to_owned(),
            }),
        }
    }
}

/// Tone attached to a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for Sentiment {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" | "bullish" => Ok(Self::Positive),
            "negative" | "bearish" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(ValidationError::InvalidSentiment {
                value: other.to_owned(),
            }),
        }
    }
}

/// News sections emitted as separate output arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsFeed {
    MarketHeadlines,
    EarningsAnnouncements,
    DividendNews,
}

impl NewsFeed {
    pub const ALL: [Self; 3] = [
        Self::MarketHeadlines,
        Self::EarningsAnnouncements,
        Self::DividendNews,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketHeadlines => "market_headlines",
            Self::EarningsAnnouncements => "earnings_announcements",
            Self::DividendNews => "dividend_news",
        }
    }
}

/// One independently scraped unit of the page.
///
/// The derived ordering is the declared output order: market tables first,
/// then one macro category per country, then the news feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Market(MarketCategory),
    Macro(CountryCode),
    News(NewsFeed),
}

impl Category {
    pub fn all() -> Vec<Self> {
        MarketCategory::ALL
            .into_iter()
            .map(Self::Market)
            .chain(CountryCode::ALL.into_iter().map(Self::Macro))
            .chain(NewsFeed::ALL.into_iter().map(Self::News))
            .collect()
    }

    /// Output key, e.g. `forex`, `macro_us`, `dividend_news`.
    pub fn key(self) -> String {
        match self {
            Self::Market(category) => category.as_str().to_owned(),
            Self::Macro(country) => format!("macro_{}", country.as_str().to_ascii_lowercase()),
            Self::News(feed) => feed.as_str().to_owned(),
        }
    }

    /// Name of the rule set this category is extracted with. All macro
    /// categories share one rule set keyed by country.
    pub const fn rule_group(self) -> &'static str {
        match self {
            Self::Market(category) => category.as_str(),
            Self::Macro(_) => "macro",
            Self::News(feed) => feed.as_str(),
        }
    }

    /// Expands a CLI token: a category key or one of `all`, `markets`,
    /// `macro`, `news`.
    pub fn expand(token: &str) -> Result<Vec<Self>, ValidationError> {
        let normalized = token.trim().to_ascii_lowercase();
        let expanded = match normalized.as_str() {
            "all" => Self::all(),
            "markets" => MarketCategory::ALL.into_iter().map(Self::Market).collect(),
            "macro" => CountryCode::ALL.into_iter().map(Self::Macro).collect(),
            "news" => NewsFeed::ALL.into_iter().map(Self::News).collect(),
            _ => vec![normalized.parse()?],
        };
        Ok(expanded)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or(ValidationError::InvalidCategory { value: normalized })
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_order_puts_markets_then_macro_then_news() {
        let keys: Vec<String> = Category::all().into_iter().map(Category::key).collect();
        assert_eq!(keys.len(), 24);
        assert_eq!(keys[0], "forex");
        assert_eq!(keys[7], "derivatives");
        assert_eq!(keys[8], "macro_us");
        assert_eq!(keys[20], "macro_in");
        assert_eq!(keys[23], "dividend_news");

        let mut sorted = Category::all();
        sorted.sort();
        assert_eq!(sorted, Category::all());
    }

    #[test]
    fn category_keys_round_trip_through_from_str() {
        for category in Category::all() {
            assert_eq!(category.key().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn country_labels_resolve_case_insensitively() {
        assert_eq!(CountryCode::from_label("Euro Area"), Some(CountryCode::EU));
        assert_eq!(CountryCode::from_label(" USA "), Some(CountryCode::US));
        assert_eq!(CountryCode::from_label("Atlantis"), None);
    }

    #[test]
    fn frequency_is_inferred_from_indicator_name() {
        assert_eq!(Frequency::infer_from_name("GDP Growth Rate"), Frequency::Quarterly);
        assert_eq!(Frequency::infer_from_name("Retail Sales Q3"), Frequency::Quarterly);
        assert_eq!(Frequency::infer_from_name("Inflation Rate YoY"), Frequency::Yearly);
        assert_eq!(Frequency::infer_from_name("Initial Jobless Claims"), Frequency::Weekly);
        assert_eq!(Frequency::infer_from_name("Unemployment Rate"), Frequency::Monthly);
    }

    #[test]
    fn sentiment_accepts_market_synonyms() {
        assert_eq!("Bullish".parse::<Sentiment>(), Ok(Sentiment::Positive));
        assert_eq!("bearish".parse::<Sentiment>(), Ok(Sentiment::Negative));
        assert!("mixed".parse::<Sentiment>().is_err());
    }

    #[test]
    fn expand_accepts_group_aliases() {
        assert_eq!(Category::expand("macro").expect("valid").len(), 13);
        assert_eq!(Category::expand("news").expect("valid").len(), 3);
        assert_eq!(
            Category::expand("Forex").expect("valid"),
            vec![Category::Market(MarketCategory::Forex)]
        );
        assert!(Category::expand("weather").is_err());
    }
}
