//! Aggregate statistics export lines (`clientstat*.csv`).
//!
//! Columns are semicolon separated and mapped to summary fields through a
//! configurable column map. The start and end dates span two columns each
//! (date, then time).

use serde::{Deserialize, Serialize};

use super::error::ParseError;
use super::timestamp::parse_split_timestamp;
use crate::store::{Field, FieldValue};

/// Banner that starts header rows ("Record number").
pub const HEADER_BANNER: &str = "Номер записи";

/// Value meaning "not recorded" in date columns.
const ZERO_DATE: &str = "0";

/// Storage type of a summary column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Timestamp,
}

/// Summary columns that may appear in a column map.
pub const SUMMARY_COLUMNS: &[(&str, ColumnKind)] = &[
    ("system_code", ColumnKind::Text),
    ("distr_number", ColumnKind::Text),
    ("computer", ColumnKind::Text),
    ("ip_address", ColumnKind::Text),
    ("session_id", ColumnKind::Text),
    ("start_date", ColumnKind::Timestamp),
    ("qst_received_time", ColumnKind::Text),
    ("qst_received_size", ColumnKind::Integer),
    ("update_create_time", ColumnKind::Text),
    ("update_size", ColumnKind::Integer),
    ("update_size_cache", ColumnKind::Integer),
    ("download_time", ColumnKind::Text),
    ("update_time", ColumnKind::Text),
    ("report_received_size", ColumnKind::Integer),
    ("end_date", ColumnKind::Timestamp),
    ("log_files_folder", ColumnKind::Text),
    ("log_file_name", ColumnKind::Text),
    ("result_log_file_name", ColumnKind::Text),
    ("error_log_file_name", ColumnKind::Text),
    ("usr_archive_name", ColumnKind::Text),
    ("client_return_code", ColumnKind::Integer),
    ("server_return_code", ColumnKind::Integer),
    ("launch_method", ColumnKind::Text),
    ("res_version", ColumnKind::Text),
    ("download_speed", ColumnKind::Real),
    ("send_anon_tech_info", ColumnKind::Integer),
    ("send_stt", ColumnKind::Integer),
    ("inet_ext_key", ColumnKind::Text),
];

/// Columns every column map must contain.
pub const REQUIRED_COLUMNS: &[&str] = &["distr_number", "computer", "session_id", "start_date"];

/// Kind of a summary column, if it exists.
#[must_use]
pub fn column_kind(name: &str) -> Option<ColumnKind> {
    SUMMARY_COLUMNS
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, kind)| *kind)
}

/// Maps a summary column to its index in the export line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub index: usize,
}

impl ColumnMapping {
    #[must_use]
    pub fn new(name: &str, index: usize) -> Self {
        Self {
            name: name.to_string(),
            index,
        }
    }
}

/// Column map of the stock export layout.
#[must_use]
pub fn default_column_map() -> Vec<ColumnMapping> {
    [
        ("system_code", 1),
        ("distr_number", 2),
        ("computer", 3),
        ("ip_address", 4),
        ("session_id", 5),
        ("start_date", 6),
        ("qst_received_time", 8),
        ("qst_received_size", 9),
        ("update_create_time", 10),
        ("update_size", 11),
        ("update_size_cache", 13),
        ("download_time", 14),
        ("update_time", 15),
        ("report_received_size", 17),
        ("end_date", 18),
        ("log_files_folder", 21),
        ("log_file_name", 22),
        ("result_log_file_name", 23),
        ("error_log_file_name", 24),
        ("usr_archive_name", 25),
        ("client_return_code", 26),
        ("server_return_code", 27),
        ("launch_method", 28),
        ("res_version", 29),
        ("download_speed", 30),
        ("send_anon_tech_info", 31),
        ("send_stt", 32),
        ("inet_ext_key", 33),
    ]
    .into_iter()
    .map(|(name, index)| ColumnMapping::new(name, index))
    .collect()
}

/// Where a summary's start date comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDate {
    /// Written in the export.
    Explicit(chrono::NaiveDateTime),
    /// Not recorded; derive from the earliest session log message.
    FromEvents,
}

/// One export row, before entity resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Record number in column 0, for diagnostics.
    pub record_number: String,
    /// Raw distributive number as written.
    pub distr_number: String,
    /// Raw computer (sub-unit) token.
    pub computer: String,
    pub session_id: String,
    pub start: StartDate,
    /// Mapped columns except `start_date`.
    pub fields: Vec<Field>,
}

/// Whether a line is blank or a header row.
#[must_use]
pub fn is_header_or_blank(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(HEADER_BANNER)
}

/// Parse an export line with the given column map.
///
/// Header and blank lines yield `Ok(None)`. Unknown column names in the map
/// are ignored.
///
/// # Errors
///
/// Returns an error if a mapped column is missing, a required column is not
/// mapped, or a value cannot be converted to its column type.
pub fn parse_summary(
    line: &str,
    columns: &[ColumnMapping],
) -> Result<Option<SessionSummary>, ParseError> {
    if is_header_or_blank(line) {
        return Ok(None);
    }

    let words: Vec<&str> = line.split(';').collect();
    let at = |index: usize| cell(&words, index);
    let required = |name: &str| required_index(columns, name);

    let start_index = required("start_date")?;
    let start = if at(start_index)? == ZERO_DATE {
        StartDate::FromEvents
    } else {
        StartDate::Explicit(parse_split_timestamp(
            at(start_index)?,
            at(start_index + 1)?,
        )?)
    };

    let mut fields = Vec::with_capacity(columns.len());
    for mapping in columns {
        let Some(kind) = column_kind(&mapping.name) else {
            continue;
        };
        let value = match mapping.name.as_str() {
            "start_date" => continue,
            "end_date" => {
                let date = at(mapping.index)?;
                if date == ZERO_DATE {
                    FieldValue::Null
                } else {
                    FieldValue::Timestamp(parse_split_timestamp(
                        date,
                        at(mapping.index + 1)?,
                    )?)
                }
            }
            name => convert(name, kind, rewrite_flag(at(mapping.index)?))?,
        };
        fields.push(Field::new(mapping.name.clone(), value));
    }

    Ok(Some(SessionSummary {
        record_number: at(0)?.to_string(),
        distr_number: at(required("distr_number")?)?.to_string(),
        computer: at(required("computer")?)?.to_string(),
        session_id: at(required("session_id")?)?.to_string(),
        start,
        fields,
    }))
}

fn cell<'a>(words: &[&'a str], index: usize) -> Result<&'a str, ParseError> {
    words.get(index).copied().ok_or(ParseError::MissingColumn {
        index,
        found: words.len(),
    })
}

fn required_index(columns: &[ColumnMapping], name: &str) -> Result<usize, ParseError> {
    columns
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.index)
        .ok_or_else(|| ParseError::UnmappedColumn {
            name: name.to_string(),
        })
}

/// Rewrite flag tokens to their three-valued numeric encoding.
///
/// `TRUE` → `1`, `FALSE` → `0`, `NULL` → `2` (unknown).
#[must_use]
pub fn rewrite_flag(value: &str) -> &str {
    match value.trim() {
        "TRUE" => "1",
        "FALSE" => "0",
        "NULL" => "2",
        _ => value,
    }
}

fn convert(column: &str, kind: ColumnKind, raw: &str) -> Result<FieldValue, ParseError> {
    let trimmed = raw.trim();
    if kind != ColumnKind::Text && trimmed.is_empty() {
        return Ok(FieldValue::Null);
    }
    let invalid = || ParseError::InvalidNumber {
        column: column.to_string(),
        value: raw.to_string(),
    };

    Ok(match kind {
        ColumnKind::Integer => FieldValue::Integer(trimmed.parse().map_err(|_| invalid())?),
        ColumnKind::Real => {
            FieldValue::Real(trimmed.replace(',', ".").parse().map_err(|_| invalid())?)
        }
        ColumnKind::Text => FieldValue::Text(raw.to_string()),
        ColumnKind::Timestamp => FieldValue::Timestamp(super::timestamp::parse_timestamp(raw)?),
    })
}
