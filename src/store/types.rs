//! Row types exchanged with storage.

use chrono::NaiveDateTime;

use crate::watcher::FileFamily;

/// Identity of a watched file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub file_name: String,
    /// Name of the directory holding the file (a date folder for logs).
    pub directory_name: String,
    pub family: FileFamily,
}

impl FileKey {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        directory_name: impl Into<String>,
        family: FileFamily,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            directory_name: directory_name.into(),
            family,
        }
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.directory_name, self.file_name, self.family)
    }
}

/// Attributes recorded when a file is first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSeed {
    /// Server name of the watch root.
    pub server: String,
    pub system_code: Option<String>,
    pub distributive_id: Option<i64>,
}

/// A watched file as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub key: FileKey,
    pub server: String,
    pub system_code: Option<String>,
    pub distributive_id: Option<i64>,
    /// Index of the last line read; the next pass starts here.
    pub consumed: usize,
    pub finished: bool,
    pub report_archive: Option<String>,
}

/// A summary row selected for repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRepair {
    pub id: i64,
    pub session_id: Option<String>,
    pub distr_number: Option<String>,
    pub computer: Option<String>,
    pub start_date: Option<NaiveDateTime>,
}

/// A distributive row, for seeding and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributiveRow {
    pub id: i64,
    /// Normalized number, e.g. `42` or `210.3`.
    pub number: String,
    pub support_type: Option<String>,
    pub connected_on: Option<chrono::NaiveDate>,
    pub installed_on: Option<chrono::NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_display() {
        let key = FileKey::new("SOJ_42#x.log", "2024_01_01", FileFamily::Log);
        assert_eq!(key.to_string(), "2024_01_01/SOJ_42#x.log (log)");
    }

    #[test]
    fn test_seed_default_is_empty() {
        let seed = FileSeed::default();
        assert!(seed.server.is_empty());
        assert!(seed.system_code.is_none());
        assert!(seed.distributive_id.is_none());
    }
}
