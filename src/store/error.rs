//! Storage error types.

use std::path::PathBuf;

/// Errors that can occur during storage operations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Failed to open or create database.
    #[error("Failed to open database at {path}: {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to execute SQL.
    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A column name is not part of the table.
    #[error("Unknown column {column} for table {table}")]
    UnknownColumn { table: &'static str, column: String },

    /// A lookup or insert was issued without any column.
    #[error("No columns given for table {0}")]
    NoColumns(&'static str),

    /// Blocking task was cancelled.
    #[error("Blocking task cancelled")]
    TaskCancelled,

    /// Failed to create parent directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
