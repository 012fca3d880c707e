//! Database schema for ingested update statistics.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// Insertable columns of `session_messages`.
pub const MESSAGE_COLUMNS: &[&str] = &["file_id", "session_id", "timestamp", "message"];

/// Insertable columns of `acknowledged_files`.
pub const ACKNOWLEDGEMENT_COLUMNS: &[&str] = &["file_id", "file_name", "status_code"];

/// Columns of `session_summaries` that are not taken from the column map.
pub const SUMMARY_EXTRA_COLUMNS: &[&str] = &["server", "entity_id", "update_file_id", "start_date"];

/// SQL schema for the statistics database.
///
/// `distributives` is owned by the billing side and is only read here; it is
/// created so that a fresh database is usable.
pub const SCHEMA: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Files seen by the watcher or a batch scan
CREATE TABLE IF NOT EXISTS watched_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    directory_name TEXT NOT NULL,
    family TEXT NOT NULL,
    server TEXT NOT NULL DEFAULT '',
    system_code TEXT,
    distributive_id INTEGER,
    last_read_position INTEGER NOT NULL DEFAULT 0,
    finished INTEGER NOT NULL DEFAULT 0,
    report_archive TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (file_name, directory_name, family)
);

-- One row per session log line
CREATE TABLE IF NOT EXISTS session_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL,
    session_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    message TEXT NOT NULL,
    FOREIGN KEY (file_id) REFERENCES watched_files(id) ON DELETE CASCADE
);

-- Files acknowledged in result logs
CREATE TABLE IF NOT EXISTS acknowledged_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL,
    file_name TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    FOREIGN KEY (file_id) REFERENCES watched_files(id) ON DELETE CASCADE
);

-- Rows of the aggregate statistics export
CREATE TABLE IF NOT EXISTS session_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    server TEXT,
    entity_id INTEGER,
    update_file_id INTEGER,
    system_code TEXT,
    distr_number TEXT,
    computer TEXT,
    ip_address TEXT,
    session_id TEXT,
    start_date TEXT,
    qst_received_time TEXT,
    qst_received_size INTEGER,
    update_create_time TEXT,
    update_size INTEGER,
    update_size_cache INTEGER,
    download_time TEXT,
    update_time TEXT,
    report_received_size INTEGER,
    end_date TEXT,
    log_files_folder TEXT,
    log_file_name TEXT,
    result_log_file_name TEXT,
    error_log_file_name TEXT,
    usr_archive_name TEXT,
    client_return_code INTEGER,
    server_return_code INTEGER,
    launch_method TEXT,
    res_version TEXT,
    download_speed REAL,
    send_anon_tech_info INTEGER,
    send_stt INTEGER,
    inet_ext_key TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Client installations, keyed by normalized number
CREATE TABLE IF NOT EXISTS distributives (
    id INTEGER PRIMARY KEY,
    number TEXT NOT NULL,
    support_type TEXT,
    connected_on TEXT,
    installed_on TEXT
);

-- Schema version table for migrations
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_messages_session_id ON session_messages(session_id);
CREATE INDEX IF NOT EXISTS idx_messages_file_timestamp ON session_messages(file_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_ack_file_id ON acknowledged_files(file_id);
CREATE INDEX IF NOT EXISTS idx_summaries_session_id ON session_summaries(session_id);
CREATE INDEX IF NOT EXISTS idx_summaries_distr_session ON session_summaries(distr_number, session_id);
CREATE INDEX IF NOT EXISTS idx_distributives_number ON distributives(number);
";
