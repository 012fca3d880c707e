//! Line extraction for growing log files.
//!
//! Files are always read end to end and split into lines. The consumed
//! position stored per file is the index of the last line read, not a count.

use std::path::Path;

use super::error::WatcherError;

/// Unseen suffix of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tail {
    /// Lines not yet consumed.
    pub lines: Vec<String>,
    /// Absolute index of the first line in `lines`.
    pub first_index: usize,
    /// Position to persist once the tail has been ingested.
    pub new_consumed: usize,
}

impl Tail {
    /// Iterate over `(absolute_index, line)` pairs.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (self.first_index + i, line.as_str()))
    }
}

/// Read the full current content of a file as lines.
///
/// The content is decoded lossily, trailing whitespace is trimmed and the
/// rest is split on `\n`. A trailing `\r` is removed from each line. An empty
/// file yields a single empty line.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn read_all(path: &Path) -> Result<Vec<String>, WatcherError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| WatcherError::from_io(path, e))?;
    Ok(split_lines(&String::from_utf8_lossy(&bytes)))
}

/// Split file content into lines.
#[must_use]
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .trim_end()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Return the lines after `consumed` and the new consumed position.
///
/// The new position is `len - 1`, the index of the last line read. If the
/// file now has fewer lines than `consumed`, the tail is empty and the
/// position is kept.
#[must_use]
pub fn unseen_tail(lines: &[String], consumed: usize) -> Tail {
    if consumed > lines.len() {
        tracing::warn!(
            consumed,
            total = lines.len(),
            "File has fewer lines than consumed position, keeping position"
        );
        return Tail {
            lines: Vec::new(),
            first_index: consumed,
            new_consumed: consumed,
        };
    }

    Tail {
        lines: lines[consumed..].to_vec(),
        first_index: consumed,
        new_consumed: lines.len().saturating_sub(1),
    }
}
