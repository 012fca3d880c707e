//! Event-driven ingestion over watched roots.
//!
//! Each root gets a debounced notify subscription. Events are bridged into a
//! tokio channel and every event becomes one ingestion task. Tasks for the
//! same file are serialized inside the [`Ingestor`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use globset::{Glob, GlobMatcher};
use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::classify::{RootRole, LOG_EXTENSION};
use super::error::WatcherError;
use crate::alert::DeadManHandle;
use crate::config::{ParserConfig, WatchRoot};
use crate::ingest::{FileTask, Ingestor};

type RootDebouncer = Debouncer<RecommendedWatcher, RecommendedCache>;

/// Compile the aggregate export file mask.
///
/// # Errors
///
/// Returns an error if the mask is not a valid glob.
pub fn compile_mask(mask: &str) -> Result<GlobMatcher, WatcherError> {
    Glob::new(mask)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| WatcherError::InvalidMask {
            mask: mask.to_string(),
            source,
        })
}

/// Which changed paths of a root are forwarded.
#[derive(Debug, Clone)]
enum PathFilter {
    Extension(&'static str),
    FileName(GlobMatcher),
}

impl PathFilter {
    fn accepts(&self, path: &Path) -> bool {
        match self {
            Self::Extension(ext) => path.extension().is_some_and(|found| found == *ext),
            Self::FileName(mask) => path.file_name().is_some_and(|name| mask.is_match(name)),
        }
    }
}

/// Watches session and common roots and ingests changed files.
pub struct WatchScheduler {
    ingestor: Arc<Ingestor>,
    session_roots: Vec<WatchRoot>,
    common_roots: Vec<WatchRoot>,
    common_mask: GlobMatcher,
    debounce: Duration,
}

impl WatchScheduler {
    /// Create a scheduler for the roots in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the common file mask is invalid.
    pub fn new(ingestor: Arc<Ingestor>, config: &ParserConfig) -> Result<Self, WatcherError> {
        Ok(Self {
            ingestor,
            session_roots: config.session_roots.clone(),
            common_roots: config.common_roots.clone(),
            common_mask: compile_mask(&config.common.file_mask)?,
            debounce: Duration::from_millis(config.watch.debounce_ms),
        })
    }

    /// Run until `cancel` fires.
    ///
    /// Every event resets `deadman`. On shutdown the watch subscriptions are
    /// dropped and in-flight tasks are awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if a root cannot be watched.
    pub async fn run(
        self,
        deadman: Option<DeadManHandle>,
        cancel: CancellationToken,
    ) -> Result<(), WatcherError> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut debouncers = Vec::new();
        for root in &self.session_roots {
            debouncers.push(self.subscribe(
                root,
                RootRole::Session,
                RecursiveMode::Recursive,
                PathFilter::Extension(LOG_EXTENSION),
                tx.clone(),
            )?);
        }
        for root in &self.common_roots {
            debouncers.push(self.subscribe(
                root,
                RootRole::Common,
                RecursiveMode::NonRecursive,
                PathFilter::FileName(self.common_mask.clone()),
                tx.clone(),
            )?);
        }
        drop(tx);

        tracing::info!(
            session_roots = self.session_roots.len(),
            common_roots = self.common_roots.len(),
            "Watching for log changes"
        );

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = rx.recv() => {
                    let Some(task) = event else { break };
                    if let Some(deadman) = &deadman {
                        deadman.reset();
                    }
                    let ingestor = self.ingestor.clone();
                    tasks.spawn(async move { process(&ingestor, &task).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Ingestion task panicked");
                    }
                }
            }
        }

        drop(debouncers);
        tracing::info!(in_flight = tasks.len(), "Stopping watcher");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Ingestion task panicked");
            }
        }
        Ok(())
    }

    fn subscribe(
        &self,
        root: &WatchRoot,
        role: RootRole,
        mode: RecursiveMode,
        filter: PathFilter,
        tx: mpsc::UnboundedSender<FileTask>,
    ) -> Result<RootDebouncer, WatcherError> {
        let server = root.server.clone();
        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                            continue;
                        }
                        for path in &event.paths {
                            if path.is_file() && filter.accepts(path) {
                                let _ = tx.send(FileTask::new(path.clone(), role, server.clone()));
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(error = %error, "File watcher error");
                    }
                }
            }
        })?;

        debouncer.watch(&root.path, mode)?;
        tracing::debug!(server = %root.server, root = %root.path.display(), ?role, "Subscribed to root");
        Ok(debouncer)
    }
}

async fn process(ingestor: &Ingestor, task: &FileTask) {
    match ingestor.process_file(task).await {
        Ok(report) if report.is_skipped() => {}
        Ok(report) => {
            tracing::debug!(
                path = %task.path.display(),
                inserted = report.inserted,
                "Ingested change"
            );
        }
        Err(e) => {
            tracing::warn!(path = %task.path.display(), error = %e, "Failed to ingest change");
        }
    }
}
