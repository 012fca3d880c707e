//! Colored CLI output for batch runs.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::ingest::{BatchSummary, IngestReport, RepairReport};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Plain counters line for a batch run.
#[must_use]
pub fn format_batch_counts(summary: &BatchSummary) -> String {
    format!(
        "files={} skipped={} failed={} inserted={} duplicates={} malformed={} finished={}",
        summary.files,
        summary.skipped,
        summary.failed,
        summary.inserted,
        summary.duplicates,
        summary.malformed,
        summary.finished
    )
}

/// Plain counters line for a single file.
#[must_use]
pub fn format_report_counts(report: &IngestReport) -> String {
    format!(
        "lines={} inserted={} duplicates={} malformed={}",
        report.lines, report.inserted, report.duplicates, report.malformed
    )
}

/// Print the totals of a batch run.
pub fn print_batch_summary(label: &str, summary: &BatchSummary) {
    let tag = if summary.failed > 0 {
        "[BATCH]".yellow().bold().to_string()
    } else {
        "[BATCH]".green().bold().to_string()
    };
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        tag,
        label.cyan(),
        format_batch_counts(summary)
    );
    let _ = io::stdout().flush();
}

/// Print the outcome of a single-file run.
pub fn print_ingest_report(path: &Path, report: &IngestReport) {
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        "[FILE]".blue().bold(),
        path.display().cyan(),
        format_report_counts(report)
    );
    let _ = io::stdout().flush();
}

/// Print the outcome of a repair run.
pub fn print_repair_report(report: &RepairReport) {
    println!(
        "{} {} start dates filled={} missing={}, entities filled={} missing={}",
        timestamp().dimmed(),
        "[REPAIR]".magenta().bold(),
        report.starts_filled.green(),
        report.starts_missing.yellow(),
        report.entities_filled.green(),
        report.entities_missing.yellow()
    );
    let _ = io::stdout().flush();
}

/// Print how many report archives were recorded.
pub fn print_archives_found(count: usize) {
    println!(
        "{} {} {} report archives recorded",
        timestamp().dimmed(),
        "[ARCHIVES]".blue().bold(),
        count.green()
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}
