use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Strict RFC3339 parse; the offset must already be UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    /// Lenient parse for timestamps scraped from page text.
    ///
    /// Accepts RFC3339 with any offset (converted to UTC), `YYYY-MM-DD HH:MM:SS`,
    /// `YYYY-MM-DD`, and `January 5, 2024` / `Jan 5, 2024`. Naive values are
    /// taken as UTC.
    pub fn parse_lenient(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();

        if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return parsed
                .checked_to_offset(UtcOffset::UTC)
                .map(Self)
                .ok_or_else(|| ValidationError::InvalidTimestamp {
                    value: trimmed.to_owned(),
                });
        }

        if let Ok(parsed) = PrimitiveDateTime::parse(
            trimmed,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ) {
            return Ok(Self(parsed.assume_utc()));
        }

        let date_formats = [
            format_description!("[year]-[month]-[day]"),
            format_description!("[month repr:long] [day padding:none], [year]"),
            format_description!("[month repr:short] [day padding:none], [year]"),
        ];
        for format in date_formats {
            if let Ok(date) = Date::parse(trimmed, format) {
                return Ok(Self(date.midnight().assume_utc()));
            }
        }

        Err(ValidationError::InvalidTimestamp {
            value: trimmed.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp_in_strict_mode() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn lenient_parse_converts_offsets_to_utc() {
        let parsed = UtcDateTime::parse_lenient("2024-01-01T01:00:00+01:00").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn lenient_parse_rejects_offsets_that_leave_the_calendar_range() {
        let err = UtcDateTime::parse_lenient("9999-12-31T23:00:00-02:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
    }

    #[test]
    fn lenient_parse_accepts_page_date_formats() {
        let cases = [
            ("2024-03-05 14:30:00", "2024-03-05T14:30:00Z"),
            ("2024-03-05", "2024-03-05T00:00:00Z"),
            ("March 5, 2024", "2024-03-05T00:00:00Z"),
            ("Mar 15, 2024", "2024-03-15T00:00:00Z"),
        ];
        for (input, expected) in cases {
            let parsed = UtcDateTime::parse_lenient(input).expect(input);
            assert_eq!(parsed.format_rfc3339(), expected, "input: {input}");
        }
    }

    #[test]
    fn lenient_parse_rejects_free_text() {
        let err = UtcDateTime::parse_lenient("2 hours ago").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
    }
}
