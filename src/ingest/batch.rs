//! Offline scans that reuse the ingestion pipeline without a watcher.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use walkdir::WalkDir;

use crate::config::WatchRoot;
use crate::distributive::distributive_key;
use crate::store::{FileRecord, Storage, StoreError};
use crate::watcher::{find_archive_for_log, RootRole, LOG_EXTENSION};

use super::error::IngestError;
use super::orchestrator::{FileTask, IngestReport, Ingestor};

/// Name format of per-day session folders.
pub const DAY_FOLDER_FORMAT: &str = "%Y_%m_%d";

/// Totals over many files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub skipped: usize,
    pub failed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub finished: usize,
}

impl BatchSummary {
    /// Fold one file outcome into the totals.
    pub fn record(&mut self, path: &Path, outcome: Result<IngestReport, IngestError>) {
        match outcome {
            Ok(report) if report.is_skipped() => self.skipped += 1,
            Ok(report) => {
                self.files += 1;
                self.inserted += report.inserted;
                self.duplicates += report.duplicates;
                self.malformed += report.malformed;
                if report.finished {
                    self.finished += 1;
                }
            }
            Err(e) => {
                self.failed += 1;
                tracing::error!(path = %path.display(), error = %e, "Failed to process file");
            }
        }
    }

    /// Add another summary into this one.
    pub fn merge(&mut self, other: &Self) {
        self.files += other.files;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.finished += other.finished;
    }
}

/// Outcome of [`repair`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub starts_filled: usize,
    pub starts_missing: usize,
    pub entities_filled: usize,
    pub entities_missing: usize,
}

/// Process every `*.log` file under every session root.
pub async fn scan_all(ingestor: &Ingestor, roots: &[WatchRoot]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for root in roots {
        tracing::info!(server = %root.server, root = %root.path.display(), "Scanning session root");
        summary.merge(&scan_logs_under(ingestor, &root.path, &root.server).await);
    }
    summary
}

/// Process every `*.log` file below `dir`, in name order.
async fn scan_logs_under(ingestor: &Ingestor, dir: &Path, server: &str) -> BatchSummary {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == LOG_EXTENSION))
        .collect();

    let mut summary = BatchSummary::default();
    for path in files {
        let task = FileTask::new(path.clone(), RootRole::Session, server);
        summary.record(&path, ingestor.process_file(&task).await);
    }
    summary
}

/// Process the `*.log` files in the day folders of the `days` days before
/// `today`, oldest first. Today's folder is left to the watcher.
///
/// Missing folders are skipped with a warning.
pub async fn scan_recent_days(
    ingestor: &Ingestor,
    roots: &[WatchRoot],
    days: u32,
    today: NaiveDate,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for folder_day in past_days(days, today) {
        for root in roots {
            let folder = day_folder(&root.path, folder_day);
            if !folder.is_dir() {
                tracing::warn!(folder = %folder.display(), "Day folder missing, skipping");
                continue;
            }
            tracing::info!(server = %root.server, folder = %folder.display(), "Scanning day folder");
            summary.merge(&scan_logs_under(ingestor, &folder, &root.server).await);
        }
    }
    summary
}

/// Day folder paths under `root` for the `days` days before `today`,
/// oldest first.
#[must_use]
pub fn day_folders(root: &Path, days: u32, today: NaiveDate) -> Vec<PathBuf> {
    past_days(days, today)
        .map(|day| day_folder(root, day))
        .collect()
}

fn past_days(days: u32, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (1..=days)
        .rev()
        .filter_map(move |offset| today.checked_sub_days(Days::new(u64::from(offset))))
}

fn day_folder(root: &Path, day: NaiveDate) -> PathBuf {
    root.join(day.format(DAY_FOLDER_FORMAT).to_string())
}

/// Process every file directly inside `dir` as a session file.
pub async fn scan_folder(ingestor: &Ingestor, dir: &Path, server: &str) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "Failed to read folder");
            summary.failed += 1;
            return summary;
        }
    };
    files.sort();

    tracing::info!(dir = %dir.display(), files = files.len(), "Scanning folder");
    for path in files {
        let task = FileTask::new(path.clone(), RootRole::Session, server);
        summary.record(&path, ingestor.process_file(&task).await);
    }
    summary
}

/// Ingest a whole aggregate export file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or storage fails.
pub async fn scan_common_file(
    ingestor: &Ingestor,
    path: &Path,
    server: &str,
) -> Result<IngestReport, IngestError> {
    ingestor.ingest_common_file(path, server).await
}

/// Locate the on-disk path of a stored Log file.
fn locate(roots: &[WatchRoot], record: &FileRecord) -> Option<PathBuf> {
    let path_in = |root: &WatchRoot| {
        root.path
            .join(&record.key.directory_name)
            .join(&record.key.file_name)
    };
    roots
        .iter()
        .filter(|root| root.server == record.server)
        .chain(roots.iter().filter(|root| root.server != record.server))
        .map(path_in)
        .find(|path| path.is_file())
}

/// Search report archives for Finished files that have none recorded.
///
/// Returns how many archives were found.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn find_missing_archives(
    store: &dyn Storage,
    roots: &[WatchRoot],
) -> Result<usize, IngestError> {
    let mut found = 0;
    for record in store.finished_files_without_archive().await? {
        let Some(path) = locate(roots, &record) else {
            tracing::warn!(file = %record.key, "Log file not found under any session root");
            continue;
        };
        let archive = tokio::task::spawn_blocking(move || find_archive_for_log(&path))
            .await
            .map_err(|_| IngestError::TaskCancelled)?;
        if let Some(name) = archive {
            store.set_report_archive(record.id, &name).await?;
            tracing::info!(file = %record.key, archive = %name, "Recorded report archive");
            found += 1;
        }
    }
    Ok(found)
}

/// Re-ingest Log files whose session has not ended.
///
/// # Errors
///
/// Returns an error if the unfinished files cannot be listed.
pub async fn recover_unfinished(
    ingestor: &Ingestor,
    roots: &[WatchRoot],
) -> Result<BatchSummary, IngestError> {
    let mut summary = BatchSummary::default();
    for record in ingestor.store().unfinished_log_files().await? {
        let Some(path) = locate(roots, &record) else {
            tracing::warn!(file = %record.key, "Log file not found under any session root");
            summary.failed += 1;
            continue;
        };
        let task = FileTask::new(path.clone(), RootRole::Session, record.server.clone());
        summary.record(&path, ingestor.process_file(&task).await);
    }
    Ok(summary)
}

/// Fill missing summary start dates and entity ids.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn repair(store: &dyn Storage) -> Result<RepairReport, StoreError> {
    let mut report = RepairReport::default();

    for row in store.summaries_without_start().await? {
        let Some(session_id) = row.session_id.as_deref() else {
            continue;
        };
        match store.earliest_event_timestamp(session_id).await? {
            Some(start) => {
                store.set_summary_start(row.id, start).await?;
                report.starts_filled += 1;
            }
            None => report.starts_missing += 1,
        }
    }

    for row in store.summaries_without_entity().await? {
        let Some(number) = row.distr_number.as_deref() else {
            continue;
        };
        let key = distributive_key(number, row.computer.as_deref().unwrap_or_default());
        match store.resolve_entity(&key).await? {
            Some(entity_id) => {
                store.set_summary_entity(row.id, entity_id).await?;
                report.entities_filled += 1;
            }
            None => report.entities_missing += 1,
        }
    }

    tracing::info!(
        starts_filled = report.starts_filled,
        entities_filled = report.entities_filled,
        "Repair complete"
    );
    Ok(report)
}
