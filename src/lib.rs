//! Update Stat Parser - incremental ingestion of update-server logs.

pub mod alert;
pub mod config;
pub mod display;
pub mod distributive;
pub mod ingest;
pub mod parser;
pub mod store;
pub mod watcher;
