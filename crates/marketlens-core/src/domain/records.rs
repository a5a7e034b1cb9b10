use serde::{Deserialize, Serialize};

use super::{CountryCode, Frequency, MarketCategory, Sentiment, Symbol, UtcDateTime};

/// A priced instrument row (currency pair, index, commodity, bond, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub symbol: Symbol,
    pub name: String,
    pub category: MarketCategory,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    pub timestamp: UtcDateTime,
}

/// One macro-economic indicator reading for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub country: CountryCode,
    pub indicator_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
    pub unit: String,
    pub frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub timestamp: UtcDateTime,
}

/// A news headline with its link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub timestamp: UtcDateTime,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

/// A validated record of any kind. Serialized without a tag because each
/// output array only ever holds one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedRecord {
    Instrument(InstrumentRecord),
    Indicator(IndicatorRecord),
    News(NewsRecord),
}

impl TypedRecord {
    pub fn as_instrument(&self) -> Option<&InstrumentRecord> {
        match self {
            Self::Instrument(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_indicator(&self) -> Option<&IndicatorRecord> {
        match self {
            Self::Indicator(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_news(&self) -> Option<&NewsRecord> {
        match self {
            Self::News(record) => Some(record),
            _ => None,
        }
    }
}
