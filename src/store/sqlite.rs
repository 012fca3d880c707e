//! `SQLite` storage with async operations via `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tokio::sync::Mutex;

use super::error::StoreError;
use super::fact::{Field, Table};
use super::schema::SCHEMA;
use super::storage::Storage;
use super::types::{DistributiveRow, FileKey, FileRecord, FileSeed, SummaryRepair};
use crate::distributive::{pick_entity, Candidate};
use crate::watcher::FileFamily;

/// Returns the default path for the statistics database.
///
/// This is `~/.local/share/update-stat-parser/stat.db` on Unix systems.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("update-stat-parser")
        .join("stat.db")
}

const FILE_COLUMNS: &str = "id, file_name, directory_name, family, server, system_code, \
     distributive_id, last_read_position, finished, report_archive";

const SUMMARY_REPAIR_COLUMNS: &str = "id, session_id, distr_number, computer, start_date";

impl ToSql for FileFamily {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FileFamily {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::from_str_opt(text).ok_or(FromSqlError::InvalidType)
    }
}

fn file_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let consumed: i64 = row.get(7)?;
    Ok(FileRecord {
        id: row.get(0)?,
        key: FileKey {
            file_name: row.get(1)?,
            directory_name: row.get(2)?,
            family: row.get(3)?,
        },
        server: row.get(4)?,
        system_code: row.get(5)?,
        distributive_id: row.get(6)?,
        consumed: usize::try_from(consumed).unwrap_or(0),
        finished: row.get(8)?,
        report_archive: row.get(9)?,
    })
}

fn summary_repair(row: &Row<'_>) -> rusqlite::Result<SummaryRepair> {
    Ok(SummaryRepair {
        id: row.get(0)?,
        session_id: row.get(1)?,
        distr_number: row.get(2)?,
        computer: row.get(3)?,
        start_date: row.get(4)?,
    })
}

fn select_file(conn: &Connection, key: &FileKey) -> rusqlite::Result<Option<FileRecord>> {
    conn.query_row(
        &format!(
            "SELECT {FILE_COLUMNS} FROM watched_files
             WHERE file_name = ?1 AND directory_name = ?2 AND family = ?3"
        ),
        params![key.file_name, key.directory_name, key.family],
        file_record,
    )
    .optional()
}

fn check_columns(table: Table, fields: &[Field]) -> Result<(), StoreError> {
    if fields.is_empty() {
        return Err(StoreError::NoColumns(table.name()));
    }
    match fields.iter().find(|f| !table.has_column(&f.column)) {
        Some(field) => Err(StoreError::UnknownColumn {
            table: table.name(),
            column: field.column.clone(),
        }),
        None => Ok(()),
    }
}

/// Statistics store backed by a single `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a store at the specified path.
    ///
    /// Creates parent directories if they don't exist and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn =
                Connection::open(&path_clone).map_err(|source| StoreError::DatabaseOpen {
                    path: path_clone,
                    source,
                })?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        tracing::debug!(path = %path.display(), "Opened statistics database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, StoreError> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Insert or replace a distributive row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub async fn upsert_distributive(&self, row: &DistributiveRow) -> Result<(), StoreError> {
        let row = row.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO distributives (id, number, support_type, connected_on, installed_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.number,
                    row.support_type,
                    row.connected_on,
                    row.installed_on
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Candidate entities sharing a normalized number, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn candidates(&self, normalized: &str) -> Result<Vec<Candidate>, StoreError> {
        let normalized = normalized.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, support_type, connected_on, installed_on
                 FROM distributives WHERE number = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map([normalized], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    support_type: row.get(1)?,
                    connected_on: row.get(2)?,
                    installed_on: row.get(3)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Count rows in a fact table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self, table: Table) -> Result<u64, StoreError> {
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table.name()),
                [],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn select_files(&self, filter: &'static str) -> Result<Vec<FileRecord>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM watched_files WHERE {filter} ORDER BY id"
            ))?;
            let rows = stmt.query_map([], file_record)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn select_summaries(
        &self,
        filter: &'static str,
    ) -> Result<Vec<SummaryRepair>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_REPAIR_COLUMNS} FROM session_summaries WHERE {filter} ORDER BY id"
            ))?;
            let rows = stmt.query_map([], summary_repair)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn find_position(&self, key: &FileKey) -> Result<Option<FileRecord>, StoreError> {
        let key = key.clone();
        self.run(move |conn| Ok(select_file(conn, &key)?)).await
    }

    async fn get_or_create_position(
        &self,
        key: &FileKey,
        seed: &FileSeed,
    ) -> Result<FileRecord, StoreError> {
        let key = key.clone();
        let seed = seed.clone();
        self.run(move |conn| {
            let created = conn.execute(
                "INSERT OR IGNORE INTO watched_files
                     (file_name, directory_name, family, server, system_code, distributive_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.file_name,
                    key.directory_name,
                    key.family,
                    seed.server,
                    seed.system_code,
                    seed.distributive_id
                ],
            )?;
            if created > 0 {
                tracing::info!(file = %key, "Tracking new file");
            }
            select_file(conn, &key)?.ok_or(StoreError::Query(rusqlite::Error::QueryReturnedNoRows))
        })
        .await
    }

    async fn advance_position(&self, file_id: i64, consumed: usize) -> Result<(), StoreError> {
        let consumed = i64::try_from(consumed).unwrap_or(i64::MAX);
        self.run(move |conn| {
            conn.execute(
                "UPDATE watched_files
                 SET last_read_position = MAX(last_read_position, ?1)
                 WHERE id = ?2",
                params![consumed, file_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, table: Table, key: &[Field]) -> Result<bool, StoreError> {
        check_columns(table, key)?;
        let key = key.to_vec();
        self.run(move |conn| {
            // IS matches NULL against NULL, so keys with a missing part still dedup.
            let predicate = key
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} IS ?{}", f.column, i + 1))
                .collect::<Vec<_>>()
                .join(" AND ");
            let found = conn
                .query_row(
                    &format!("SELECT 1 FROM {} WHERE {predicate} LIMIT 1", table.name()),
                    params_from_iter(key.iter().map(|f| &f.value)),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert(&self, table: Table, fields: &[Field]) -> Result<i64, StoreError> {
        check_columns(table, fields)?;
        let fields = fields.to_vec();
        self.run(move |conn| {
            let columns = fields
                .iter()
                .map(|f| f.column.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=fields.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            conn.execute(
                &format!(
                    "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                    table.name()
                ),
                params_from_iter(fields.iter().map(|f| &f.value)),
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn resolve_entity(&self, normalized: &str) -> Result<Option<i64>, StoreError> {
        let candidates = self.candidates(normalized).await?;
        let entity = pick_entity(&candidates);
        if entity.is_none() {
            tracing::debug!(number = normalized, "No distributive matches");
        }
        Ok(entity)
    }

    async fn earliest_event_timestamp(
        &self,
        session_id: &str,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        let session_id = session_id.to_string();
        self.run(move |conn| {
            Ok(conn.query_row(
                "SELECT MIN(timestamp) FROM session_messages WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )?)
        })
        .await
    }

    async fn file_id_for_session(&self, session_id: &str) -> Result<Option<i64>, StoreError> {
        let session_id = session_id.to_string();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT m.file_id FROM session_messages m
                     JOIN watched_files w ON w.id = m.file_id
                     WHERE m.session_id = ?1 AND w.family = 'log'
                     ORDER BY m.id LIMIT 1",
                    [session_id],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .await
    }

    async fn mark_finished(&self, file_id: i64) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE watched_files SET finished = 1 WHERE id = ?1",
                [file_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_report_archive(&self, file_id: i64, archive: &str) -> Result<(), StoreError> {
        let archive = archive.to_string();
        self.run(move |conn| {
            conn.execute(
                "UPDATE watched_files SET report_archive = ?1 WHERE id = ?2",
                params![archive, file_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn finished_files_without_archive(&self) -> Result<Vec<FileRecord>, StoreError> {
        self.select_files("family = 'log' AND finished = 1 AND report_archive IS NULL")
            .await
    }

    async fn unfinished_log_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        self.select_files("family = 'log' AND finished = 0").await
    }

    async fn summaries_without_start(&self) -> Result<Vec<SummaryRepair>, StoreError> {
        self.select_summaries("start_date IS NULL AND session_id IS NOT NULL")
            .await
    }

    async fn set_summary_start(&self, id: i64, start: NaiveDateTime) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE session_summaries SET start_date = ?1 WHERE id = ?2",
                params![start, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn summaries_without_entity(&self) -> Result<Vec<SummaryRepair>, StoreError> {
        self.select_summaries("entity_id IS NULL AND distr_number IS NOT NULL")
            .await
    }

    async fn set_summary_entity(&self, id: i64, entity_id: i64) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE session_summaries SET entity_id = ?1 WHERE id = ?2",
                params![entity_id, id],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldValue;
    use tempfile::TempDir;

    fn log_key(name: &str) -> FileKey {
        FileKey::new(name, "2024_01_01", FileFamily::Log)
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn message_fields(file_id: i64, session: &str, at: &str, message: &str) -> Vec<Field> {
        vec![
            Field::new("file_id", FieldValue::Integer(file_id)),
            Field::new("session_id", FieldValue::Text(session.to_string())),
            Field::new("timestamp", FieldValue::Timestamp(ts(at))),
            Field::new("message", FieldValue::Text(message.to_string())),
        ]
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_open_file_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("stat.db");
        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path();
        assert!(path.ends_with("update-stat-parser/stat.db"));
    }

    #[tokio::test]
    async fn test_get_or_create_position_is_stable() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let key = log_key("SOJ_42#a.log");
        let seed = FileSeed {
            server: "srv1".to_string(),
            system_code: Some("SOJ".to_string()),
            distributive_id: Some(7),
        };

        let first = store.get_or_create_position(&key, &seed).await.unwrap();
        let second = store
            .get_or_create_position(&key, &FileSeed::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.consumed, 0);
        assert_eq!(first.server, "srv1");
        assert_eq!(first.distributive_id, Some(7));
        assert!(!first.finished);
    }

    #[tokio::test]
    async fn test_find_position_absent() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.find_position(&log_key("x.log")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_name_different_family_is_distinct() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let seed = FileSeed::default();
        let log = store
            .get_or_create_position(&log_key("a.log"), &seed)
            .await
            .unwrap();
        let result = store
            .get_or_create_position(
                &FileKey::new("a.log", "2024_01_01", FileFamily::Result),
                &seed,
            )
            .await
            .unwrap();
        assert_ne!(log.id, result.id);
    }

    #[tokio::test]
    async fn test_advance_position_is_monotonic() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let key = log_key("a.log");
        let record = store
            .get_or_create_position(&key, &FileSeed::default())
            .await
            .unwrap();

        store.advance_position(record.id, 5).await.unwrap();
        store.advance_position(record.id, 3).await.unwrap();

        let record = store.find_position(&key).await.unwrap().unwrap();
        assert_eq!(record.consumed, 5);
    }

    #[tokio::test]
    async fn test_exists_after_insert() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let file = store
            .get_or_create_position(&log_key("a.log"), &FileSeed::default())
            .await
            .unwrap();
        let fields = message_fields(file.id, "S1", "2024-01-01 10:00:00", "hello");

        assert!(!store.exists(Table::Messages, &fields).await.unwrap());
        store.insert(Table::Messages, &fields).await.unwrap();
        assert!(store.exists(Table::Messages, &fields).await.unwrap());
        assert_eq!(store.count(Table::Messages).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exists_matches_null_key_parts() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let key = vec![
            Field::new("distr_number", FieldValue::Text("42".to_string())),
            Field::new("session_id", FieldValue::Text("S1".to_string())),
            Field::new("start_date", FieldValue::Null),
        ];
        store.insert(Table::Summaries, &key).await.unwrap();
        assert!(store.exists(Table::Summaries, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_column_is_rejected() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let fields = vec![Field::new("bogus", FieldValue::Integer(1))];
        let err = store.insert(Table::Messages, &fields).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));

        let err = store.exists(Table::Messages, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::NoColumns("session_messages")));
    }

    #[tokio::test]
    async fn test_earliest_event_timestamp() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let file = store
            .get_or_create_position(&log_key("a.log"), &FileSeed::default())
            .await
            .unwrap();
        for (at, msg) in [
            ("2024-01-01 10:05:00", "b"),
            ("2024-01-01 10:00:00", "a"),
            ("2024-01-01 10:10:00", "c"),
        ] {
            store
                .insert(Table::Messages, &message_fields(file.id, "S1", at, msg))
                .await
                .unwrap();
        }

        let earliest = store.earliest_event_timestamp("S1").await.unwrap();
        assert_eq!(earliest, Some(ts("2024-01-01 10:00:00")));
        assert_eq!(store.earliest_event_timestamp("S2").await.unwrap(), None);
        assert_eq!(store.file_id_for_session("S1").await.unwrap(), Some(file.id));
        assert_eq!(store.file_id_for_session("S2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_entity_prefers_active() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        for (id, support, connected) in [(1, "-", "2023-05-01"), (2, "+", "2020-01-01")] {
            store
                .upsert_distributive(&DistributiveRow {
                    id,
                    number: "42".to_string(),
                    support_type: Some(support.to_string()),
                    connected_on: Some(connected.parse().unwrap()),
                    installed_on: None,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.resolve_entity("42").await.unwrap(), Some(2));
        assert_eq!(store.resolve_entity("43").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_finished_and_archive_selection() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let seed = FileSeed::default();
        let a = store
            .get_or_create_position(&log_key("a.log"), &seed)
            .await
            .unwrap();
        let b = store
            .get_or_create_position(&log_key("b.log"), &seed)
            .await
            .unwrap();
        let c = store
            .get_or_create_position(&log_key("c.log"), &seed)
            .await
            .unwrap();

        store.mark_finished(a.id).await.unwrap();
        store.mark_finished(b.id).await.unwrap();
        store.set_report_archive(b.id, "CONS#x.zip").await.unwrap();

        let missing = store.finished_files_without_archive().await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, a.id);

        let open = store.unfinished_log_files().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, c.id);
    }

    #[tokio::test]
    async fn test_summary_repair_updates() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = store
            .insert(
                Table::Summaries,
                &[
                    Field::new("distr_number", FieldValue::Text("0042".to_string())),
                    Field::new("computer", FieldValue::Text("01".to_string())),
                    Field::new("session_id", FieldValue::Text("S1".to_string())),
                    Field::new("start_date", FieldValue::Null),
                ],
            )
            .await
            .unwrap();

        let pending = store.summaries_without_start().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].session_id.as_deref(), Some("S1"));

        store
            .set_summary_start(id, ts("2024-01-01 10:00:00"))
            .await
            .unwrap();
        assert!(store.summaries_without_start().await.unwrap().is_empty());

        assert_eq!(store.summaries_without_entity().await.unwrap().len(), 1);
        store.set_summary_entity(id, 9).await.unwrap();
        assert!(store.summaries_without_entity().await.unwrap().is_empty());
    }
}
