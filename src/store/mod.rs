//! Persistence for watched-file positions, derived facts and entity lookups.

mod error;
mod fact;
mod schema;
mod sqlite;
mod storage;
mod types;

pub use error::StoreError;
pub use fact::{Fact, Field, FieldValue, Table};
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use sqlite::{default_database_path, SqliteStore};
pub use storage::Storage;
pub use types::{DistributiveRow, FileKey, FileRecord, FileSeed, SummaryRepair};
