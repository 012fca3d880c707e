//! Per-file ingestion pipeline.
//!
//! One pass reads the whole file, takes the unseen tail, parses it according
//! to the file family, stores new facts and then advances the position.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::distributive::{distributive_key, log_file_identity};
use crate::parser::{
    parse_acknowledgement, parse_event, parse_summary, ColumnMapping, SessionSummary, StartDate,
    RESULT_HEADER_LINES,
};
use crate::store::{FileKey, FileRecord, FileSeed, Storage, StoreError};
use crate::watcher::{classify, find_archive_for_log, read_all, unseen_tail, FileFamily, RootRole, Tail};

use super::error::IngestError;
use super::facts::{AckFact, EventFact, SummaryFact};
use super::guard::{insert_if_absent, Insertion};
use super::locks::FileLocks;
use super::state::FileState;

/// A file to process and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    pub role: RootRole,
    /// Server name of the watch root.
    pub server: String,
}

impl FileTask {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, role: RootRole, server: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            role,
            server: server.into(),
        }
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// `None` when the file was skipped by classification.
    pub family: Option<FileFamily>,
    /// Lines in the processed tail.
    pub lines: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    /// File is Finished after this pass.
    pub finished: bool,
    /// Report archive found during this pass.
    pub archive: Option<String>,
}

impl IngestReport {
    fn new(family: FileFamily) -> Self {
        Self {
            family: Some(family),
            ..Self::default()
        }
    }

    /// Whether classification skipped the file.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.family.is_none()
    }

    fn count(&mut self, outcome: Insertion) {
        match outcome {
            Insertion::Inserted(_) => self.inserted += 1,
            Insertion::Duplicate => self.duplicates += 1,
        }
    }
}

/// Runs the ingestion pipeline against a store.
pub struct Ingestor {
    store: Arc<dyn Storage>,
    columns: Vec<ColumnMapping>,
    locks: FileLocks,
}

impl Ingestor {
    /// Create an ingestor using `columns` for aggregate export lines.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>, columns: Vec<ColumnMapping>) -> Self {
        Self {
            store,
            columns,
            locks: FileLocks::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    /// Process the unseen tail of one file.
    ///
    /// Calls for the same file identity are serialized. The position is only
    /// advanced after every line of the tail has been handled.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or storage fails. In both
    /// cases the stored position is unchanged.
    pub async fn process_file(&self, task: &FileTask) -> Result<IngestReport, IngestError> {
        let (file_name, directory_name) = file_identity(&task.path)?;
        let Some(family) = classify(&file_name, task.role) else {
            tracing::debug!(path = %task.path.display(), "Ignoring file");
            return Ok(IngestReport::default());
        };
        let key = FileKey::new(file_name, directory_name, family);

        let _guard = self.locks.lock(&key).await;

        let lines = read_all(&task.path).await?;
        let existing = self.store.find_position(&key).await?;
        let mut state = FileState::of(existing.as_ref());
        let record = match existing {
            Some(record) => record,
            None => {
                let seed = self.seed(&key, &task.server).await?;
                self.store.get_or_create_position(&key, &seed).await?
            }
        };
        state = state.advance(FileState::Tracked);

        let tail = unseen_tail(&lines, record.consumed);
        let mut report = IngestReport::new(family);
        report.lines = tail.lines.len();

        match family {
            FileFamily::Log => {
                self.ingest_log(&task.path, &record, &tail, &mut state, &mut report)
                    .await?;
            }
            FileFamily::Result => self.ingest_result(&record, &tail, &mut report).await?,
            FileFamily::Common => {
                self.ingest_common(tail.numbered(), &task.server, &mut report)
                    .await?;
            }
        }

        self.store
            .advance_position(record.id, tail.new_consumed)
            .await?;
        report.finished = state.is_finished();

        tracing::info!(
            file = %key,
            file_id = record.id,
            lines = report.lines,
            inserted = report.inserted,
            duplicates = report.duplicates,
            malformed = report.malformed,
            consumed = tail.new_consumed,
            "Processed file"
        );
        Ok(report)
    }

    /// Ingest every line of an aggregate export, leaving its position alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or storage fails.
    pub async fn ingest_common_file(
        &self,
        path: &Path,
        server: &str,
    ) -> Result<IngestReport, IngestError> {
        let lines = read_all(path).await?;
        let mut report = IngestReport::new(FileFamily::Common);
        report.lines = lines.len();
        self.ingest_common(
            lines.iter().enumerate().map(|(i, line)| (i, line.as_str())),
            server,
            &mut report,
        )
        .await?;

        tracing::info!(
            path = %path.display(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            malformed = report.malformed,
            "Processed export file"
        );
        Ok(report)
    }

    /// Resolve derived columns of a summary and store it once.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn ingest_summary(
        &self,
        summary: &SessionSummary,
        server: &str,
    ) -> Result<Insertion, StoreError> {
        let start = match summary.start {
            StartDate::Explicit(start) => Some(start),
            StartDate::FromEvents => {
                let derived = self
                    .store
                    .earliest_event_timestamp(&summary.session_id)
                    .await?;
                if derived.is_none() {
                    tracing::warn!(
                        session_id = %summary.session_id,
                        "No messages to derive start date from"
                    );
                }
                derived
            }
        };

        let key = distributive_key(&summary.distr_number, &summary.computer);
        let entity_id = self.store.resolve_entity(&key).await?;
        let update_file_id = self.store.file_id_for_session(&summary.session_id).await?;

        let fact = SummaryFact {
            summary,
            start,
            entity_id,
            update_file_id,
            server,
        };
        let outcome = insert_if_absent(self.store.as_ref(), &fact).await?;
        if outcome == Insertion::Duplicate {
            tracing::info!(
                record = %summary.record_number,
                distr_number = %summary.distr_number,
                session_id = %summary.session_id,
                "Summary already recorded"
            );
        }
        Ok(outcome)
    }

    async fn seed(&self, key: &FileKey, server: &str) -> Result<FileSeed, StoreError> {
        let mut seed = FileSeed {
            server: server.to_string(),
            ..FileSeed::default()
        };
        if key.family == FileFamily::Log {
            if let Some(identity) = log_file_identity(&key.file_name) {
                seed.distributive_id = self
                    .store
                    .resolve_entity(&identity.distributive_key)
                    .await?;
                seed.system_code = Some(identity.system_code);
            }
        }
        Ok(seed)
    }

    async fn ingest_log(
        &self,
        path: &Path,
        record: &FileRecord,
        tail: &Tail,
        state: &mut FileState,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        for (index, line) in tail.numbered() {
            let event = match parse_event(line) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(file = %record.key, line = index, error = %e, "Skipping malformed line");
                    continue;
                }
            };

            let fact = EventFact {
                file_id: record.id,
                event: &event,
            };
            report.count(insert_if_absent(self.store.as_ref(), &fact).await?);

            if event.is_session_end() && !state.is_finished() {
                report.archive = self.finish_session(path, record).await?;
                *state = state.advance(FileState::Finished);
            }
        }
        Ok(())
    }

    async fn finish_session(
        &self,
        path: &Path,
        record: &FileRecord,
    ) -> Result<Option<String>, IngestError> {
        let log_path = path.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || find_archive_for_log(&log_path))
            .await
            .map_err(|_| IngestError::TaskCancelled)?;

        match &archive {
            Some(name) => {
                self.store.set_report_archive(record.id, name).await?;
                tracing::info!(file = %record.key, archive = %name, "Session ended, report archive found");
            }
            None => {
                tracing::warn!(file = %record.key, "Session ended, no report archive found");
            }
        }
        self.store.mark_finished(record.id).await?;
        Ok(archive)
    }

    async fn ingest_result(
        &self,
        record: &FileRecord,
        tail: &Tail,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        for (index, line) in tail.numbered() {
            if index < RESULT_HEADER_LINES {
                continue;
            }
            let ack = match parse_acknowledgement(line) {
                Ok(Some(ack)) => ack,
                Ok(None) => continue,
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(file = %record.key, line = index, error = %e, "Skipping malformed line");
                    continue;
                }
            };
            let fact = AckFact {
                file_id: record.id,
                ack: &ack,
            };
            report.count(insert_if_absent(self.store.as_ref(), &fact).await?);
        }
        Ok(())
    }

    async fn ingest_common<'a>(
        &self,
        lines: impl Iterator<Item = (usize, &'a str)> + Send,
        server: &str,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        for (index, line) in lines {
            let summary = match parse_summary(line, &self.columns) {
                Ok(Some(summary)) => summary,
                Ok(None) => continue,
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(line = index, error = %e, "Skipping malformed export line");
                    continue;
                }
            };
            report.count(self.ingest_summary(&summary, server).await?);
        }
        Ok(())
    }
}

/// File name and parent directory name of a path.
fn file_identity(path: &Path) -> Result<(String, String), IngestError> {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let directory_name = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());
    match (file_name, directory_name) {
        (Some(file_name), Some(directory_name)) => Ok((file_name, directory_name)),
        _ => Err(IngestError::InvalidPath(path.to_path_buf())),
    }
}
