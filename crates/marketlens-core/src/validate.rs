//! Turns raw field texts into typed records, or explains why not.

use url::Url;

use crate::domain::{
    is_url_shaped, Category, CountryCode, Frequency, IndicatorRecord, InstrumentRecord,
    MarketCategory, NewsRecord, Sentiment, Symbol, TypedRecord, UtcDateTime,
};
use crate::extract::{RawRecord, INDICATOR_FIELD};
use crate::ValidationError;

const CHANGE_TOLERANCE: f64 = 0.01;
const PLACEHOLDERS: [&str; 8] = ["n/a", "na", "n.a.", "-", "--", "—", "...", "…"];
const UNIT_SUFFIXES: [&str; 11] = [
    "basispoints",
    "bps",
    "billion",
    "trillion",
    "million",
    "bln",
    "mln",
    "tln",
    "bn",
    "k",
    "t",
];

const INDICATOR_ALIASES: [(&str, &str); 20] = [
    ("gdp yoy", "GDP Growth"),
    ("gdp growth rate", "GDP Growth"),
    ("annual gdp growth", "GDP Growth"),
    ("cpi inflation", "Inflation Rate"),
    ("consumer price index", "Inflation Rate"),
    ("inflation yoy", "Inflation Rate"),
    ("unemployment rate", "Unemployment Rate"),
    ("jobless rate", "Unemployment Rate"),
    ("policy rate", "Interest Rate"),
    ("central bank rate", "Interest Rate"),
    ("manufacturing pmi", "Manufacturing PMI"),
    ("pmi manufacturing", "Manufacturing PMI"),
    ("consumer confidence index", "Consumer Confidence"),
    ("retail sales yoy", "Retail Sales"),
    ("industrial production yoy", "Industrial Production"),
    ("trade balance yoy", "Trade Balance"),
    ("govt debt gdp", "Government Debt to GDP"),
    ("public debt gdp", "Government Debt to GDP"),
    ("current account balance", "Current Account"),
    ("ppi", "Producer Price Index"),
];

/// Stateless apart from the reference time and link base, so validating the
/// same raw record twice always gives the same answer.
#[derive(Debug, Clone)]
pub struct Validator {
    as_of: UtcDateTime,
    base_url: Option<Url>,
}

impl Validator {
    /// `as_of` stands in for records that carry no timestamp of their own.
    pub fn new(as_of: UtcDateTime) -> Self {
        Self {
            as_of,
            base_url: None,
        }
    }

    /// Page URL that relative news links are resolved against.
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = Url::parse(base).ok();
        self
    }

    pub fn validate(
        &self,
        raw: &RawRecord,
        category: Category,
    ) -> Result<TypedRecord, ValidationError> {
        match category {
            Category::Market(market) => self.instrument(raw, market).map(TypedRecord::Instrument),
            Category::Macro(country) => self.indicator(raw, country).map(TypedRecord::Indicator),
            Category::News(_) => self.news(raw).map(TypedRecord::News),
        }
    }

    fn instrument(
        &self,
        raw: &RawRecord,
        category: MarketCategory,
    ) -> Result<InstrumentRecord, ValidationError> {
        let name = required_text(raw, "name", 200)?;
        let symbol = match raw.get("symbol") {
            Some(symbol) => Symbol::parse(symbol)?,
            None => Symbol::parse(&name.split_whitespace().collect::<String>())?,
        };
        let value = number(raw, "value")?.ok_or(ValidationError::MissingField { field: "value" })?;

        let change = number(raw, "change")?;
        let pct_change = number(raw, "pct_change")?;
        let previous_close = number(raw, "previous_close")?;

        if let Some(pct) = pct_change {
            if !(-100.0..=100.0).contains(&pct) {
                return Err(ValidationError::PctChangeOutOfRange { value: pct });
            }
        }
        if let (Some(change), Some(pct), Some(previous)) = (change, pct_change, previous_close) {
            check_change_consistency(change, pct, previous)?;
        }

        Ok(InstrumentRecord {
            symbol,
            name,
            category,
            value,
            change,
            pct_change,
            bid: number(raw, "bid")?,
            ask: number(raw, "ask")?,
            high: number(raw, "high")?,
            low: number(raw, "low")?,
            open: number(raw, "open")?,
            previous_close,
            timestamp: self.timestamp(raw)?,
        })
    }

    fn indicator(
        &self,
        raw: &RawRecord,
        country: CountryCode,
    ) -> Result<IndicatorRecord, ValidationError> {
        let country = match raw.get("country") {
            Some(label) => label.parse()?,
            None => country,
        };

        let raw_name = raw
            .get(INDICATOR_FIELD)
            .or_else(|| raw.get("indicator_name"))
            .ok_or(ValidationError::MissingField {
                field: "indicator_name",
            })?;
        let indicator_name = canonical_indicator_name(raw_name);
        check_length("indicator_name", &indicator_name, 1, 100)?;

        let (value_text, previous_text) = match raw.get("value") {
            Some(text) => {
                let (value, previous) = split_previous(text);
                (Some(value), previous)
            }
            None => (None, None),
        };
        let value = value_text
            .map(|text| parse_number("value", text))
            .transpose()?
            .flatten();
        let previous = match raw.get("previous") {
            Some(text) => parse_number("previous", text)?,
            None => previous_text
                .map(|text| parse_number("previous", text))
                .transpose()?
                .flatten(),
        };

        let unit = match raw.get("unit") {
            Some(unit) => unit.to_owned(),
            None => infer_unit(raw.get("value").unwrap_or_default(), &indicator_name),
        };
        check_length("unit", &unit, 0, 20)?;

        let frequency = match raw.get("frequency") {
            Some(text) => text.parse()?,
            None => Frequency::infer_from_name(&indicator_name),
        };

        Ok(IndicatorRecord {
            country,
            indicator_name,
            value,
            previous,
            forecast: number(raw, "forecast")?,
            unit,
            frequency,
            period: optional_text(raw, "period", 50)?,
            source: optional_text(raw, "source", 100)?,
            timestamp: self.timestamp(raw)?,
        })
    }

    fn news(&self, raw: &RawRecord) -> Result<NewsRecord, ValidationError> {
        let title = required_text(raw, "title", 500)?;
        let summary = optional_text(raw, "summary", 2000)?;

        let href = raw
            .get("url")
            .ok_or(ValidationError::MissingField { field: "url" })?;
        let url = self.resolve_link(href);
        if !is_url_shaped(&url) {
            return Err(ValidationError::InvalidUrl { value: url });
        }

        let sentiment = raw
            .get("sentiment")
            .map(str::parse::<Sentiment>)
            .transpose()?;

        Ok(NewsRecord {
            title,
            summary,
            timestamp: self.timestamp(raw)?,
            url,
            source: optional_text(raw, "source", 100)?,
            category: optional_text(raw, "category", 50)?,
            sentiment,
        })
    }

    fn resolve_link(&self, href: &str) -> String {
        let trimmed = href.trim();
        if Url::parse(trimmed).is_ok() {
            return trimmed.to_owned();
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(trimmed).ok())
            .map_or_else(|| trimmed.to_owned(), String::from)
    }

    fn timestamp(&self, raw: &RawRecord) -> Result<UtcDateTime, ValidationError> {
        match raw.get("timestamp") {
            Some(text) => UtcDateTime::parse_lenient(text),
            None => Ok(self.as_of),
        }
    }
}

fn check_change_consistency(change: f64, pct: f64, previous: f64) -> Result<(), ValidationError> {
    if previous == 0.0 {
        return Err(ValidationError::ZeroPreviousClose);
    }
    let expected = change / previous * 100.0;
    if (pct - expected).abs() > CHANGE_TOLERANCE + 1e-9 {
        return Err(ValidationError::InconsistentChange {
            expected,
            actual: pct,
        });
    }
    Ok(())
}

fn required_text(raw: &RawRecord, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let text = raw
        .get(field)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(ValidationError::MissingField { field })?;
    check_length(field, text, 1, max)?;
    Ok(text.to_owned())
}

fn optional_text(
    raw: &RawRecord,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match raw.get(field).map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => {
            check_length(field, text, 1, max)?;
            Ok(Some(text.to_owned()))
        }
        None => Ok(None),
    }
}

fn check_length(field: &'static str, text: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if len < min || len > max {
        return Err(ValidationError::FieldLength {
            field,
            len,
            min,
            max,
        });
    }
    Ok(())
}

fn number(raw: &RawRecord, field: &'static str) -> Result<Option<f64>, ValidationError> {
    match raw.get(field) {
        Some(text) => parse_number(field, text),
        None => Ok(None),
    }
}

/// Parses page-formatted numbers: `$1,234.50`, `-0.25%`, `(3.1)`, `−2`,
/// `+12 bps`, `4.5 bln`. Placeholders such as `n/a` or `-` mean "absent".
/// Unit suffixes are dropped without scaling.
pub fn parse_number(field: &'static str, text: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() || PLACEHOLDERS.contains(&lowered.as_str()) {
        return Ok(None);
    }

    let invalid = || ValidationError::InvalidNumber {
        field,
        value: trimmed.to_owned(),
    };

    let (negative_parens, inner) = match lowered
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner.trim()),
        None => (false, lowered.as_str()),
    };

    let mut cleaned: String = inner
        .chars()
        .filter(|ch| !matches!(ch, '$' | '€' | '£' | '¥' | ',' | '%') && !ch.is_whitespace())
        .map(|ch| if matches!(ch, '−' | '–') { '-' } else { ch })
        .collect();
    if let Some(suffix) = UNIT_SUFFIXES
        .iter()
        .find(|suffix| cleaned.ends_with(*suffix) && cleaned.len() > suffix.len())
    {
        cleaned.truncate(cleaned.len() - suffix.len());
    }
    let unsigned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let value: f64 = unsigned.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(Some(if negative_parens { -value } else { value }))
}

/// Splits `"1.5 (1.4)"` and `"1.5 vs 1.4"` into current and previous text.
fn split_previous(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some(position) = lowered.find(" vs ") {
        let previous = trimmed[position + 4..].trim().trim_end_matches('.');
        return (trimmed[..position].trim(), Some(previous.trim()));
    }
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            if open > 0 {
                let previous = &trimmed[open + 1..trimmed.len() - 1];
                return (trimmed[..open].trim(), Some(previous.trim()));
            }
        }
    }
    (trimmed, None)
}

fn infer_unit(value_text: &str, indicator_name: &str) -> String {
    let lowered = value_text.to_lowercase();
    let mentions_billions = ["bln", "bn", "billion"]
        .iter()
        .any(|marker| lowered.contains(marker));
    if mentions_billions {
        String::from("billions")
    } else if indicator_name.to_ascii_lowercase().contains("yoy") {
        String::from("% YoY")
    } else {
        String::from("%")
    }
}

fn canonical_indicator_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    INDICATOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or(collapsed, |(_, canonical)| (*canonical).to_owned())
}
