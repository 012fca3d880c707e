//! Companion report archive discovery.
//!
//! When a client session ends, the server drops a `.zip` with the client's
//! report into a `Reports` directory next to the session log root.

use std::path::{Path, PathBuf};

/// Name of the directory holding report archives.
pub const REPORTS_DIR: &str = "Reports";

/// Extension of report archives.
const ARCHIVE_EXTENSION: &str = "zip";

/// Prefix every report archive name starts with.
const ARCHIVE_PREFIX: &str = "CONS";

/// Locate the `Reports` directory for a session log file.
///
/// Session logs live at `<root>/<YYYY_MM_DD>/<file>`, and reports at
/// `<root>/../Reports`.
#[must_use]
pub fn reports_dir_for(log_path: &Path) -> Option<PathBuf> {
    let root = log_path.parent()?.parent()?;
    Some(root.parent()?.join(REPORTS_DIR))
}

/// Archive name prefix for a session log.
///
/// # Examples
///
/// ```
/// use update_stat_parser::watcher::report_archive_prefix;
///
/// assert_eq!(
///     report_archive_prefix("SOJ_42_01#1.log", "2024_01_01"),
///     "CONS#SOJ_42_01#2024_01_01"
/// );
/// ```
#[must_use]
pub fn report_archive_prefix(file_name: &str, directory_name: &str) -> String {
    let head = file_name.split('#').next().unwrap_or_default();
    format!("{ARCHIVE_PREFIX}#{head}#{directory_name}")
}

/// Find the newest archive in `reports_dir` whose name starts with `prefix`.
///
/// Returns `None` if no archive matches or the directory cannot be read.
#[must_use]
pub fn find_report_archive(reports_dir: &Path, prefix: &str) -> Option<String> {
    let entries = match std::fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                dir = %reports_dir.display(),
                error = %e,
                "Reports directory unreadable"
            );
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
                && entry.file_name().to_string_lossy().starts_with(prefix)
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.file_name().to_string_lossy().into_owned(), modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(name, _)| name)
}

/// Find the report archive for a session log at `log_path`.
#[must_use]
pub fn find_archive_for_log(log_path: &Path) -> Option<String> {
    let file_name = log_path.file_name()?.to_string_lossy();
    let directory_name = log_path.parent()?.file_name()?.to_string_lossy();
    let reports_dir = reports_dir_for(log_path)?;
    let prefix = report_archive_prefix(&file_name, &directory_name);

    tracing::info!(
        prefix = %prefix,
        dir = %reports_dir.display(),
        "Searching for report archive"
    );
    find_report_archive(&reports_dir, &prefix)
}
