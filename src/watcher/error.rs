//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while reading or watching log files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched file no longer exists.
    #[error("Watched file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Invalid watch glob pattern.
    #[error("Invalid file mask {mask}: {source}")]
    InvalidMask {
        mask: String,
        #[source]
        source: globset::Error,
    },

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Map an I/O error on `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}
