//! Watching update-server log roots.
//!
//! Provides file classification, unseen-tail extraction, report archive lookup
//! and the event-driven scheduler.

mod classify;
mod error;
mod lines;
mod reports;
mod scheduler;

pub use classify::{classify, FileFamily, RootRole, LOG_EXTENSION};
pub use error::WatcherError;
pub use lines::{read_all, split_lines, unseen_tail, Tail};
pub use reports::{
    find_archive_for_log, find_report_archive, report_archive_prefix, reports_dir_for,
    REPORTS_DIR,
};
pub use scheduler::{compile_mask, WatchScheduler};
