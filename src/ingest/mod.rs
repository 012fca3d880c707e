//! Incremental ingestion of watched files into storage.

mod batch;
mod error;
mod facts;
mod guard;
mod locks;
mod orchestrator;
mod state;

pub use batch::{
    day_folders, find_missing_archives, recover_unfinished, repair, scan_all, scan_common_file,
    scan_folder, scan_recent_days, BatchSummary, RepairReport, DAY_FOLDER_FORMAT,
};
pub use error::IngestError;
pub use facts::{AckFact, EventFact, SummaryFact};
pub use guard::{insert_if_absent, Insertion};
pub use locks::FileLocks;
pub use orchestrator::{FileTask, IngestReport, Ingestor};
pub use state::FileState;
