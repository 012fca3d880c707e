//! Ingestion errors.

use std::path::PathBuf;

use crate::store::StoreError;
use crate::watcher::WatcherError;

/// Errors that abort processing of one file.
///
/// Line-level parse failures are not errors here; they are counted in the
/// report and the line is skipped.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// The file could not be read.
    #[error("Failed to read file: {0}")]
    Read(#[from] WatcherError),

    /// Storage failed; the position was not advanced.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The path has no file name or parent directory.
    #[error("Path is not a watched file: {0}")]
    InvalidPath(PathBuf),

    /// Blocking task was cancelled.
    #[error("Blocking task cancelled")]
    TaskCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_wraps_watcher_error() {
        let err: IngestError = WatcherError::FileDeleted(PathBuf::from("/x/a.log")).into();
        assert!(err.to_string().contains("/x/a.log"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: IngestError = StoreError::TaskCancelled.into();
        assert!(matches!(err, IngestError::Store(_)));
    }
}
