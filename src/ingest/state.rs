//! Watched-file lifecycle.

use crate::store::FileRecord;

/// Lifecycle of a watched file. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileState {
    /// Never seen; no stored row.
    Unknown,
    /// Stored with a consumed position.
    Tracked,
    /// Session ended; new lines are still ingested.
    Finished,
}

impl FileState {
    /// State of a stored row, or `Unknown` when there is none.
    #[must_use]
    pub fn of(record: Option<&FileRecord>) -> Self {
        match record {
            None => Self::Unknown,
            Some(r) if r.finished => Self::Finished,
            Some(_) => Self::Tracked,
        }
    }

    /// Move to `next` unless that would go backwards.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }
}
