//! Record parsers for the three update-server file families.

mod common;
mod error;
mod log;
mod result;
mod timestamp;

pub use common::{
    column_kind, default_column_map, is_header_or_blank, parse_summary, rewrite_flag,
    ColumnKind, ColumnMapping, SessionSummary, StartDate, HEADER_BANNER, REQUIRED_COLUMNS,
    SUMMARY_COLUMNS,
};
pub use error::ParseError;
pub use log::{parse_event, SessionEvent, SESSION_END_MARKER};
pub use result::{parse_acknowledgement, AcknowledgedFile, RESULT_HEADER_LINES};
pub use timestamp::{parse_split_timestamp, parse_timestamp};
