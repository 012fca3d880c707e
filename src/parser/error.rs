//! Line parsing errors.

/// A line did not match the expected format. The line is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Timestamp text is not a valid calendar timestamp.
    #[error("Invalid timestamp: {value:?}")]
    Timestamp { value: String },

    /// The line has too few columns.
    #[error("Missing column {index} (line has {found})")]
    MissingColumn { index: usize, found: usize },

    /// A required column has no entry in the column map.
    #[error("Column {name} is not mapped")]
    UnmappedColumn { name: String },

    /// A numeric column holds a non-numeric value.
    #[error("Invalid number in column {column}: {value:?}")]
    InvalidNumber { column: String, value: String },
}
