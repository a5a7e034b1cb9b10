use thiserror::Error;

/// Per-record constraint violations raised by the validator.
///
/// The `Display` output of each variant is the rejection reason recorded in
/// the aggregate output's `errors` list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("field '{field}' length {len} is outside {min}..={max}")]
    FieldLength {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
    #[error("field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("pct_change {value} is outside -100..=100")]
    PctChangeOutOfRange { value: f64 },
    #[error("pct_change {actual} is inconsistent with change/previous_close ({expected:.4})")]
    InconsistentChange { expected: f64, actual: f64 },
    #[error("previous_close must be non-zero when change and pct_change are present")]
    ZeroPreviousClose,

    #[error("invalid country '{value}'")]
    InvalidCountry { value: String },
    #[error("invalid frequency '{value}', expected one of daily, weekly, monthly, quarterly, yearly")]
    InvalidFrequency { value: String },
    #[error("invalid sentiment '{value}', expected one of positive, negative, neutral")]
    InvalidSentiment { value: String },
    #[error("invalid category '{value}'")]
    InvalidCategory { value: String },

    #[error("url is not an absolute http(s) address: '{value}'")]
    InvalidUrl { value: String },
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unrecognized timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("pipeline_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidPipelineVersion { value: String },
}

/// Category-level failures. Any of these makes one category unavailable for
/// the current run without affecting the others.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("disallowed by robots.txt: {url}")]
    RobotsTxt { url: String },

    #[error("request to {url} failed after {attempts} attempt(s): {message}")]
    Request {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("rendering {url} failed: {message}")]
    Render { url: String, message: String },

    #[error("required markers still absent after rendering {url}: {}", missing.join(", "))]
    IncompleteRender { url: String, missing: Vec<String> },

    #[error("{message}")]
    Parse { message: String },

    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ScrapeError {
    pub fn request(url: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            attempts,
            message: message.into(),
        }
    }

    pub fn render(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Static failures that a rendered fetch may still recover from.
    pub const fn allows_render_fallback(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// Top-level error type for loading configuration and rule files.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
