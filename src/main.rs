//! Update Stat Parser - incremental ingestion of update-server logs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use update_stat_parser::alert::{AlertError, Alerter, DeadManSwitch, LogAlerter, WebhookAlerter};
use update_stat_parser::config::{ConfigError, ConfigLoader, ParserConfig};
use update_stat_parser::display;
use update_stat_parser::ingest::{self, IngestError, Ingestor};
use update_stat_parser::store::{SqliteStore, Storage, StoreError};
use update_stat_parser::watcher::{WatchScheduler, WatcherError};

#[derive(Parser)]
#[command(
    name = "update-stat-parser",
    about = "Incremental ingestion of update-server logs",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch configured roots and ingest changes as they happen.
    Watch,
    /// Ingest session logs under every session root.
    Scan {
        /// Only scan the day folders of the N days before today.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Ingest every file in one day folder.
    ScanFolder {
        dir: PathBuf,
        /// Server name to record for the files.
        #[arg(long, default_value = "")]
        server: String,
    },
    /// Ingest a whole aggregate statistics export.
    ScanCommon {
        file: PathBuf,
        /// Server name to record on summaries.
        #[arg(long)]
        server: Option<String>,
    },
    /// Look up report archives for ended sessions that have none.
    FindArchives,
    /// Re-ingest session logs whose session never ended.
    Recover,
    /// Fill missing summary start dates and entity ids.
    Repair,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<ParserConfig, ConfigError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load()
}

async fn watch(config: &ParserConfig, ingestor: Arc<Ingestor>) -> Result<(), AppError> {
    let alerter: Arc<dyn Alerter> = match &config.alert.webhook_url {
        Some(url) => Arc::new(WebhookAlerter::new(
            url.clone(),
            Duration::from_secs(config.alert.webhook_timeout_secs),
        )?),
        None => Arc::new(LogAlerter),
    };

    let cancel = CancellationToken::new();
    let deadman = DeadManSwitch::spawn(
        alerter,
        Duration::from_secs(config.alert.silence_minutes * 60),
        cancel.clone(),
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let scheduler = WatchScheduler::new(ingestor, config)?;
    let result = scheduler.run(Some(deadman.handle()), cancel.clone()).await;
    cancel.cancel();
    deadman.join().await;
    Ok(result?)
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(cli.config)?;
    let store = Arc::new(SqliteStore::open(&config.database).await?);
    let storage: Arc<dyn Storage> = store;
    let ingestor = Arc::new(Ingestor::new(
        storage.clone(),
        config.common.columns.clone(),
    ));

    match cli.command {
        Commands::Watch => watch(&config, ingestor).await?,
        Commands::Scan { days: None } => {
            let summary = ingest::scan_all(&ingestor, &config.session_roots).await;
            display::print_batch_summary("scan", &summary);
        }
        Commands::Scan { days: Some(days) } => {
            let today = chrono::Local::now().date_naive();
            let summary =
                ingest::scan_recent_days(&ingestor, &config.session_roots, days, today).await;
            display::print_batch_summary(&format!("scan last {days} days"), &summary);
        }
        Commands::ScanFolder { dir, server } => {
            let summary = ingest::scan_folder(&ingestor, &dir, &server).await;
            display::print_batch_summary(&dir.display().to_string(), &summary);
        }
        Commands::ScanCommon { file, server } => {
            let server = server
                .or_else(|| config.common_roots.first().map(|r| r.server.clone()))
                .unwrap_or_default();
            let report = ingest::scan_common_file(&ingestor, &file, &server).await?;
            display::print_ingest_report(&file, &report);
        }
        Commands::FindArchives => {
            let found =
                ingest::find_missing_archives(storage.as_ref(), &config.session_roots).await?;
            display::print_archives_found(found);
        }
        Commands::Recover => {
            let summary = ingest::recover_unfinished(&ingestor, &config.session_roots).await?;
            display::print_batch_summary("recover", &summary);
        }
        Commands::Repair => {
            let report = ingest::repair(storage.as_ref()).await?;
            display::print_repair_report(&report);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
