//! Storage abstraction used by the ingestion pipeline.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::error::StoreError;
use super::fact::{Field, Table};
use super::types::{FileKey, FileRecord, FileSeed, SummaryRepair};

/// Persistence for positions, facts and entity lookups.
///
/// Implementations must be safe to share between tasks. Exists-then-insert
/// is not atomic; callers serialize work per file.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Look up a watched file without creating it.
    async fn find_position(&self, key: &FileKey) -> Result<Option<FileRecord>, StoreError>;

    /// Look up a watched file, creating it at position 0 if absent.
    async fn get_or_create_position(
        &self,
        key: &FileKey,
        seed: &FileSeed,
    ) -> Result<FileRecord, StoreError>;

    /// Record the new consumed position. Never moves a position backwards.
    async fn advance_position(&self, file_id: i64, consumed: usize) -> Result<(), StoreError>;

    /// Whether a row with exactly these column values exists.
    async fn exists(&self, table: Table, key: &[Field]) -> Result<bool, StoreError>;

    /// Insert a row, returning its id.
    async fn insert(&self, table: Table, fields: &[Field]) -> Result<i64, StoreError>;

    /// Resolve a normalized distributive key to an entity id.
    async fn resolve_entity(&self, normalized: &str) -> Result<Option<i64>, StoreError>;

    /// Earliest message timestamp recorded for a session.
    async fn earliest_event_timestamp(
        &self,
        session_id: &str,
    ) -> Result<Option<NaiveDateTime>, StoreError>;

    /// Id of the Log file whose messages carry this session id.
    async fn file_id_for_session(&self, session_id: &str) -> Result<Option<i64>, StoreError>;

    async fn mark_finished(&self, file_id: i64) -> Result<(), StoreError>;

    async fn set_report_archive(&self, file_id: i64, archive: &str) -> Result<(), StoreError>;

    /// Finished Log files with no report archive recorded.
    async fn finished_files_without_archive(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// Log files whose session never ended.
    async fn unfinished_log_files(&self) -> Result<Vec<FileRecord>, StoreError>;

    async fn summaries_without_start(&self) -> Result<Vec<SummaryRepair>, StoreError>;

    async fn set_summary_start(&self, id: i64, start: NaiveDateTime) -> Result<(), StoreError>;

    async fn summaries_without_entity(&self) -> Result<Vec<SummaryRepair>, StoreError>;

    async fn set_summary_entity(&self, id: i64, entity_id: i64) -> Result<(), StoreError>;
}
