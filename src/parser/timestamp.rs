//! Timestamp parsing shared by all record formats.

use chrono::NaiveDateTime;

use super::error::ParseError;

/// Accepted layouts, tried in order.
const FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

/// Parse a combined date and time.
///
/// # Errors
///
/// Returns [`ParseError::Timestamp`] if no accepted layout matches.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ParseError> {
    let trimmed = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ParseError::Timestamp {
            value: value.to_string(),
        })
}

/// Parse a date and a time held in two separate columns.
///
/// # Errors
///
/// Returns [`ParseError::Timestamp`] if the joined text is not a timestamp.
pub fn parse_split_timestamp(date: &str, time: &str) -> Result<NaiveDateTime, ParseError> {
    parse_timestamp(&format!("{date} {time}"))
}
