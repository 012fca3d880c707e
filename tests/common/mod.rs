//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use update_stat_parser::config::WatchRoot;
use update_stat_parser::ingest::Ingestor;
use update_stat_parser::parser::default_column_map;
use update_stat_parser::store::{DistributiveRow, SqliteStore};

pub const DAY: &str = "2024_01_01";

/// Server directory laid out as `<server>/Logs/<day>/` plus `<server>/Reports/`.
pub struct ServerTree {
    pub temp: TempDir,
}

impl ServerTree {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(temp.path().join("Logs").join(DAY)).unwrap();
        fs::create_dir_all(temp.path().join("Reports")).unwrap();
        Self { temp }
    }

    pub fn logs_root(&self) -> PathBuf {
        self.temp.path().join("Logs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.temp.path().join("Reports")
    }

    pub fn root(&self, server: &str) -> WatchRoot {
        WatchRoot::new(server, self.logs_root())
    }

    pub fn day_dir(&self, day: &str) -> PathBuf {
        let dir = self.logs_root().join(day);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write (or overwrite) a session file in the default day folder.
    pub fn write_log(&self, name: &str, content: &str) -> PathBuf {
        let path = self.day_dir(DAY).join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_archive(&self, name: &str) -> PathBuf {
        let path = self.reports_dir().join(name);
        fs::write(&path, b"PK").unwrap();
        path
    }

    pub fn write_file(&self, relative: &Path, content: &str) -> PathBuf {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

pub async fn store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::open_in_memory()
            .await
            .expect("Failed to open store"),
    )
}

pub fn ingestor(store: &Arc<SqliteStore>) -> Ingestor {
    Ingestor::new(store.clone(), default_column_map())
}

/// A session log line with four service fields.
pub fn log_line(at: &str, session: &str, message: &str) -> String {
    format!("{at} {session} x x x x {message}")
}

/// An export line in the stock column layout.
pub fn export_line(distr: &str, computer: &str, session: &str, start: (&str, &str)) -> String {
    let mut cells = vec![""; 34];
    cells[0] = "1";
    cells[1] = "SOJ";
    cells[2] = distr;
    cells[3] = computer;
    cells[4] = "10.0.0.5";
    cells[5] = session;
    cells[6] = start.0;
    cells[7] = start.1;
    cells[9] = "2048";
    cells[11] = "4096";
    cells[18] = "0";
    cells[26] = "0";
    cells[27] = "0";
    cells[30] = "1,5";
    cells[31] = "TRUE";
    cells[32] = "FALSE";
    cells.join(";")
}

pub async fn seed_distributive(
    store: &SqliteStore,
    id: i64,
    number: &str,
    support: &str,
    connected_on: &str,
) {
    store
        .upsert_distributive(&DistributiveRow {
            id,
            number: number.to_string(),
            support_type: Some(support.to_string()),
            connected_on: Some(connected_on.parse().unwrap()),
            installed_on: None,
        })
        .await
        .expect("Failed to seed distributive");
}
