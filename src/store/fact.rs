//! Fact rows and their natural keys.

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value};

use super::schema::{ACKNOWLEDGEMENT_COLUMNS, MESSAGE_COLUMNS, SUMMARY_EXTRA_COLUMNS};
use crate::parser::SUMMARY_COLUMNS;

/// Tables that receive derived facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Session log messages.
    Messages,
    /// Files acknowledged in result logs.
    Acknowledgements,
    /// Rows of the aggregate statistics export.
    Summaries,
}

impl Table {
    /// SQL table name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Messages => "session_messages",
            Self::Acknowledgements => "acknowledged_files",
            Self::Summaries => "session_summaries",
        }
    }

    /// Whether `column` may be written to this table.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        match self {
            Self::Messages => MESSAGE_COLUMNS.contains(&column),
            Self::Acknowledgements => ACKNOWLEDGEMENT_COLUMNS.contains(&column),
            Self::Summaries => {
                SUMMARY_EXTRA_COLUMNS.contains(&column)
                    || SUMMARY_COLUMNS.iter().any(|(name, _)| *name == column)
            }
        }
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<NaiveDateTime>> for FieldValue {
    fn from(value: Option<NaiveDateTime>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Self::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Self::Text(v) => ToSqlOutput::Borrowed(v.as_str().into()),
            Self::Timestamp(v) => v.to_sql()?,
        })
    }
}

/// A named column value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub column: String,
    pub value: FieldValue,
}

impl Field {
    #[must_use]
    pub fn new(column: impl Into<String>, value: FieldValue) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// A row that must be stored at most once.
pub trait Fact {
    /// Destination table.
    fn table(&self) -> Table;

    /// Columns that identify the row.
    fn natural_key(&self) -> Vec<Field>;

    /// All columns to insert.
    fn fields(&self) -> Vec<Field>;
}
