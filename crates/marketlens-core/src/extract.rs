use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::rules::{ExtractionRuleSet, FieldSelector, Layout};
use crate::ScrapeError;

/// Field name the extractor sets on keyed records.
pub const INDICATOR_FIELD: &str = "indicator";
/// Field holding the matched outer key text on keyed records.
pub const KEY_FIELD: &str = "key";

/// Loosely typed field texts pulled from one row or one indicator cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    /// Position of the row (or indicator) within its category, 1-based.
    pub index: usize,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

struct CompiledField {
    name: String,
    selector: Option<Selector>,
    attribute: Option<String>,
}

impl CompiledField {
    fn compile(name: &str, field: &FieldSelector) -> Result<Self, ScrapeError> {
        Ok(Self {
            name: name.to_owned(),
            selector: field.selector.as_deref().map(compile).transpose()?,
            attribute: field.attribute.clone(),
        })
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        let target = match &self.selector {
            Some(selector) => element.select(selector).next()?,
            None => element,
        };
        let raw = match &self.attribute {
            Some(attribute) => target.value().attr(attribute)?.to_owned(),
            None => target.text().collect::<String>(),
        };
        let cleaned = collapse_whitespace(&raw);
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

/// Applies a rule set to markup.
///
/// A missing container (or, for keyed layouts, a missing key) means the
/// whole category is unavailable and yields [`ScrapeError::Parse`]. Missing
/// fields never fail: they are simply absent from the record, and rows with
/// no field at all are skipped.
pub fn extract(markup: &str, rules: &ExtractionRuleSet) -> Result<Vec<RawRecord>, ScrapeError> {
    let container_selector = compile(&rules.container)?;
    let document = Html::parse_document(markup);
    let Some(container) = document.select(&container_selector).next() else {
        return Err(ScrapeError::parse(format!(
            "container not found (selector '{}')",
            rules.container
        )));
    };

    let limit = rules.max_rows.unwrap_or(usize::MAX);
    match &rules.layout {
        Layout::Rows { row, fields } => extract_rows(container, row, fields, limit),
        Layout::Keyed {
            scope,
            key,
            key_match,
            indicators,
            max_indicators,
            fields,
        } => {
            let scope_selector = compile(scope)?;
            let key_field = CompiledField::compile(KEY_FIELD, key)?;
            let compiled = compile_fields(fields)?;
            if key_match.is_empty() {
                return Err(ScrapeError::parse("keyed rule set has no key to match"));
            }

            let matched = container.select(&scope_selector).find_map(|element| {
                let label = key_field.read(element)?;
                key_matches(&label, key_match).then_some((element, label))
            });
            let Some((scope_element, label)) = matched else {
                return Err(ScrapeError::parse(format!(
                    "key not found (expected one of: {})",
                    key_match.join(", ")
                )));
            };

            let mut records = Vec::new();
            for (position, indicator) in indicators.iter().take(*max_indicators).enumerate() {
                if records.len() >= limit {
                    break;
                }
                let selector = compile(&indicator.selector)?;
                let Some(element) = scope_element.select(&selector).next() else {
                    continue;
                };

                let mut record = read_fields(position + 1, element, &compiled)
                    .with(INDICATOR_FIELD, indicator.name.as_str())
                    .with(KEY_FIELD, label.as_str());
                if !record.fields.contains_key("value") {
                    let own_text = collapse_whitespace(&element.text().collect::<String>());
                    if !own_text.is_empty() {
                        record.fields.insert(String::from("value"), own_text);
                    }
                }
                records.push(record);
            }
            Ok(records)
        }
    }
}

fn extract_rows(
    container: ElementRef<'_>,
    row: &str,
    fields: &BTreeMap<String, FieldSelector>,
    limit: usize,
) -> Result<Vec<RawRecord>, ScrapeError> {
    let row_selector = compile(row)?;
    let compiled = compile_fields(fields)?;

    let records = container
        .select(&row_selector)
        .enumerate()
        .map(|(position, element)| read_fields(position + 1, element, &compiled))
        .filter(|record| !record.fields.is_empty())
        .take(limit)
        .collect();
    Ok(records)
}

fn compile_fields(fields: &BTreeMap<String, FieldSelector>) -> Result<Vec<CompiledField>, ScrapeError> {
    fields
        .iter()
        .map(|(name, field)| CompiledField::compile(name, field))
        .collect()
}

fn read_fields(index: usize, element: ElementRef<'_>, fields: &[CompiledField]) -> RawRecord {
    let mut record = RawRecord::new(index);
    for field in fields {
        if let Some(value) = field.read(element) {
            record.fields.insert(field.name.clone(), value);
        }
    }
    record
}

/// Returns the markers with no match in `markup`, in the given order.
pub fn missing_markers(markup: &str, markers: &[String]) -> Result<Vec<String>, ScrapeError> {
    let compiled = markers
        .iter()
        .map(|marker| compile(marker).map(|selector| (marker, selector)))
        .collect::<Result<Vec<_>, _>>()?;
    let document = Html::parse_document(markup);

    Ok(compiled
        .into_iter()
        .filter(|(_, selector)| document.select(selector).next().is_none())
        .map(|(marker, _)| marker.clone())
        .collect())
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|error| ScrapeError::Selector {
        selector: selector.to_owned(),
        message: error.to_string(),
    })
}

/// Case-insensitive match of a scraped key against accepted labels, either
/// exactly or as a whole-word phrase inside the key ("Euro Area (EU)").
fn key_matches(label: &str, accepted: &[String]) -> bool {
    let words: Vec<String> = label
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();

    accepted.iter().any(|candidate| {
        let wanted: Vec<String> = candidate
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();
        !wanted.is_empty() && words.windows(wanted.len()).any(|window| window == wanted.as_slice())
    })
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
