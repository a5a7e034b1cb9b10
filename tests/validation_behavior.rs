//! Behavior-driven tests for extraction and validation
//!
//! These tests verify how raw page rows become typed records, and that a
//! bad row is rejected on its own without touching its siblings.

use marketlens_core::domain::is_url_shaped;
use marketlens_core::{
    extract, Category, CountryCode, Frequency, MarketCategory, NewsFeed, RawRecord, RuleBook,
    ScrapeError, TypedRecord, UtcDateTime, ValidationError, Validator,
};

const FOREX_PAGE: &str = include_str!("fixtures/forex.html");

fn validator() -> Validator {
    Validator::new(UtcDateTime::parse("2024-03-05T12:00:00Z").expect("valid timestamp"))
}

fn instrument_row(pct_change: &str) -> RawRecord {
    RawRecord::new(1)
        .with("symbol", "abc")
        .with("name", "Abc Holdings")
        .with("value", "101.00")
        .with("change", "1.0")
        .with("previous_close", "100.0")
        .with("pct_change", pct_change)
}

// =============================================================================
// Validation: Cross-Field Consistency
// =============================================================================

#[test]
fn when_pct_change_disagrees_with_change_record_is_rejected() {
    // Given: change 1.0 on a previous close of 100 (expected 1%)
    let raw = instrument_row("2.0");

    // When: The record is validated
    let result = validator().validate(&raw, Category::Market(MarketCategory::Stocks));

    // Then: It fails with the expected and actual percentages
    match result {
        Err(ValidationError::InconsistentChange { expected, actual }) => {
            assert!((expected - 1.0).abs() < 1e-9);
            assert_eq!(actual, 2.0);
        }
        other => panic!("expected inconsistency, got {other:?}"),
    }
}

#[test]
fn when_pct_change_agrees_with_change_record_is_accepted() {
    // Given: The same row with a matching percentage
    let raw = instrument_row("1.0");

    // When: The record is validated
    let record = validator()
        .validate(&raw, Category::Market(MarketCategory::Stocks))
        .expect("consistent record");

    // Then: The symbol is upper-cased and the category kept
    let instrument = record.as_instrument().expect("instrument");
    assert_eq!(instrument.symbol.as_str(), "ABC");
    assert_eq!(instrument.category, MarketCategory::Stocks);
    assert_eq!(instrument.pct_change, Some(1.0));
}

// =============================================================================
// Validation: Idempotence and Defaults
// =============================================================================

#[test]
fn when_same_row_is_validated_twice_results_are_identical() {
    // Given: One accepted and one rejected row
    let validator = validator();
    let category = Category::Market(MarketCategory::Indices);
    let good = instrument_row("1.0");
    let bad = instrument_row("7.5");

    // When / Then: Repeating validation yields the same outcome
    assert_eq!(
        validator.validate(&good, category),
        validator.validate(&good, category)
    );
    assert_eq!(
        validator.validate(&bad, category),
        validator.validate(&bad, category)
    );
}

#[test]
fn when_row_has_no_timestamp_system_uses_run_time() {
    // Given: A news row without a timestamp
    let raw = RawRecord::new(1)
        .with("title", "Central bank minutes released")
        .with("url", "https://news.example.com/minutes");

    // When: It is validated
    let record = validator()
        .validate(&raw, Category::News(NewsFeed::MarketHeadlines))
        .expect("valid news");

    // Then: The run time stands in
    assert_eq!(
        record.as_news().expect("news").timestamp.format_rfc3339(),
        "2024-03-05T12:00:00Z"
    );
}

#[test]
fn when_timestamp_is_unreadable_record_is_rejected() {
    // Given: A news row with a timestamp in no known format
    let raw = RawRecord::new(1)
        .with("title", "Markets open higher")
        .with("url", "https://news.example.com/open")
        .with("timestamp", "yesterday-ish");

    // When: It is validated
    let err = validator()
        .validate(&raw, Category::News(NewsFeed::MarketHeadlines))
        .expect_err("must fail");

    // Then: The reason names the bad value
    assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
    assert!(err.to_string().contains("yesterday-ish"));
}

#[test]
fn when_timestamp_overflows_on_utc_conversion_record_is_rejected() {
    // Given: A news row whose offset pushes it past the last representable year
    let raw = RawRecord::new(1)
        .with("title", "Year-end outlook")
        .with("url", "https://news.example.com/outlook")
        .with("timestamp", "9999-12-31T23:00:00-02:00");

    // When: It is validated
    let result = validator().validate(&raw, Category::News(NewsFeed::MarketHeadlines));

    // Then: Only this record is rejected, as an unreadable timestamp
    assert!(
        matches!(result, Err(ValidationError::InvalidTimestamp { .. })),
        "unexpected outcome: {result:?}"
    );
}

// =============================================================================
// Validation: Macro Indicators
// =============================================================================

#[test]
fn when_indicator_name_is_an_alias_system_uses_canonical_name() {
    // Given: A macro row with a page-specific indicator label
    let raw = RawRecord::new(1)
        .with("indicator", "GDP Growth Rate")
        .with("value", "0.8%");

    // When: It is validated for Japan
    let record = validator()
        .validate(&raw, Category::Macro(CountryCode::JP))
        .expect("valid indicator");

    // Then: Name, unit and cadence are normalized
    let TypedRecord::Indicator(indicator) = record else {
        panic!("expected an indicator record");
    };
    assert_eq!(indicator.country, CountryCode::JP);
    assert_eq!(indicator.indicator_name, "GDP Growth");
    assert_eq!(indicator.value, Some(0.8));
    assert_eq!(indicator.unit, "%");
    assert_eq!(indicator.frequency, Frequency::Quarterly);
}

// =============================================================================
// Extraction + Validation: Row Isolation
// =============================================================================

#[test]
fn when_one_row_is_bad_its_siblings_still_validate() {
    // Given: The forex fixture with one price replaced by text
    let page = FOREX_PAGE.replace(
        "<td class=\"price\">1.2700</td>",
        "<td class=\"price\">closed</td>",
    );
    let rules = RuleBook::default()
        .for_category(Category::Market(MarketCategory::Forex))
        .expect("forex rules");

    // When: The page is extracted and every row validated
    let rows = extract(&page, &rules).expect("container present");
    let outcomes: Vec<_> = rows
        .iter()
        .map(|row| validator().validate(row, Category::Market(MarketCategory::Forex)))
        .collect();

    // Then: Four rows pass and only row 2 fails
    assert_eq!(rows.len(), 5);
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 4);
    assert!(matches!(
        outcomes[1],
        Err(ValidationError::InvalidNumber { field: "value", .. })
    ));
    assert_eq!(rows[1].index, 2);
}

#[test]
fn when_container_is_missing_extraction_fails_once_for_the_category() {
    // Given: Markup without the commodities table
    let rules = RuleBook::default()
        .for_category(Category::Market(MarketCategory::Commodities))
        .expect("commodities rules");

    // When: Extraction runs
    let err = extract(FOREX_PAGE, &rules).expect_err("container absent");

    // Then: One parse error describes the missing container
    assert!(matches!(err, ScrapeError::Parse { .. }));
    assert!(err.to_string().starts_with("container not found"));
}

// =============================================================================
// URL Shape Grammar
// =============================================================================

#[test]
fn when_url_is_pathological_shape_check_returns_quickly_with_false() {
    // Given: Inputs that defeat naive patterns
    let long_host = format!("https://{}", "a.".repeat(5_000));
    let dotted = format!("https://{}com", "-.".repeat(10_000));
    let inputs = [
        long_host.as_str(),
        dotted.as_str(),
        "https://",
        "https://example",
        "https://exa mple.com/",
        "ftp://example.com/file",
        "https://example.com:123456/",
        "https://example.com/path with space",
    ];

    // When / Then: Every one is rejected
    for input in inputs {
        assert!(!is_url_shaped(input), "accepted {input:.40}");
    }
    assert!(is_url_shaped("https://tradingeconomics.com/united-states/gdp"));
    assert!(is_url_shaped("HTTP://markets.example.com:8080"));
}
