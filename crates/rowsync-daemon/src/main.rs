//! Rowsync daemon - entry point

use anyhow::Result;
use clap::Parser;
use rowsync_common::logging::{init_logging, LogConfig, LogLevel};
use rowsync_daemon::{config::SyncConfig, engine::SyncEngine, scheduler, store::CsvStore};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rowsync-daemon")]
#[command(author, version, about = "Approved-row sync daemon")]
struct Cli {
    /// Directory holding the sheet CSV files
    #[arg(short = 'd', long, default_value = "./sheets")]
    store_dir: String,

    /// Override the persisted state file path
    #[arg(short, long)]
    state: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("rowsync".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    // Configuration failures are fatal before the loop starts
    let mut config = SyncConfig::from_env().inspect_err(|e| {
        error!(error = %e, "Startup failed");
    })?;
    if let Some(state) = cli.state {
        config.state_path = state.into();
    }

    let store = CsvStore::new(&cli.store_dir);
    let mut engine = SyncEngine::new(config.clone(), store)?;

    info!("Rowsync daemon started");
    info!(spreadsheet = %config.spreadsheet_id, "Spreadsheet");
    info!(source = %config.source_sheet, target = %config.target_sheet, "Sheets");
    info!(
        interval_secs = config.poll_interval_secs,
        reconcile = config.reconcile_deleted,
        known_signatures = engine.processed_count(),
        "Polling configuration"
    );

    // Ctrl-C flips the shutdown signal; the loop finishes its cycle first
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler::run(
        &mut engine,
        config.poll_interval(),
        config.error_backoff(),
        shutdown_rx,
    )
    .await;

    info!("Rowsync daemon stopped");
    Ok(())
}
