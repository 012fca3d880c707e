//! File family classification by naming convention.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extension of every file written under a session root.
pub const LOG_EXTENSION: &str = "log";

/// Marker in the second `#` segment of files that are never ingested.
const LETTER_MARKER: &str = "_letter";

/// Marker in the second `#` segment of acknowledgement summaries.
const RESULT_MARKER: &str = "_result";

/// Record format held by a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFamily {
    /// Per-session message log.
    Log,
    /// Per-session acknowledgement summary.
    Result,
    /// Aggregate statistics export.
    Common,
}

impl FileFamily {
    /// Storage representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Result => "result",
            Self::Common => "common",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "log" => Some(Self::Log),
            "result" => Some(Self::Result),
            "common" => Some(Self::Common),
            _ => None,
        }
    }
}

impl fmt::Display for FileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of watch root a file was discovered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootRole {
    /// Per-session roots laid out as `<root>/<YYYY_MM_DD>/`.
    Session,
    /// Aggregate statistics roots.
    Common,
}

/// Classify a file by name and root role.
///
/// Returns `None` for files that must be skipped entirely.
///
/// # Examples
///
/// ```
/// use update_stat_parser::watcher::{classify, FileFamily, RootRole};
///
/// assert_eq!(classify("SOJ_42#1_result.log", RootRole::Session), Some(FileFamily::Result));
/// assert_eq!(classify("SOJ_42#1_letter.log", RootRole::Session), None);
/// assert_eq!(classify("clientstat_2024.csv", RootRole::Common), Some(FileFamily::Common));
/// ```
#[must_use]
pub fn classify(file_name: &str, role: RootRole) -> Option<FileFamily> {
    if role == RootRole::Common {
        return Some(FileFamily::Common);
    }

    let second = file_name.split('#').nth(1).unwrap_or_default();
    if second.contains(LETTER_MARKER) {
        None
    } else if second.contains(RESULT_MARKER) {
        Some(FileFamily::Result)
    } else {
        Some(FileFamily::Log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_session_file_is_log() {
        assert_eq!(
            classify("SOJ_0042_01#20240101_100000.log", RootRole::Session),
            Some(FileFamily::Log)
        );
    }

    #[test]
    fn test_result_marker() {
        assert_eq!(
            classify("SOJ_0042#20240101_result.log", RootRole::Session),
            Some(FileFamily::Result)
        );
    }

    #[test]
    fn test_letter_marker_is_ignored() {
        assert_eq!(classify("SOJ_0042#20240101_letter.log", RootRole::Session), None);
    }

    #[test]
    fn test_marker_only_checked_in_second_segment() {
        assert_eq!(
            classify("SOJ_result#20240101.log", RootRole::Session),
            Some(FileFamily::Log)
        );
    }

    #[test]
    fn test_name_without_delimiter_is_log() {
        assert_eq!(classify("plain.log", RootRole::Session), Some(FileFamily::Log));
    }

    #[test]
    fn test_common_root_ignores_name() {
        assert_eq!(
            classify("x#y_letter.csv", RootRole::Common),
            Some(FileFamily::Common)
        );
    }

    #[test]
    fn test_family_round_trip() {
        for family in [FileFamily::Log, FileFamily::Result, FileFamily::Common] {
            assert_eq!(FileFamily::from_str_opt(family.as_str()), Some(family));
        }
        assert_eq!(FileFamily::from_str_opt("other"), None);
    }
}
