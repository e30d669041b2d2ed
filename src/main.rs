mod analyzer;
mod config;
mod history;
mod ingest;
mod model;
mod pipeline;
mod storage;
mod utils;

use config::{load_config, AppConfig};
use history::HistoryStore;
use ingest::InboxSource;
use pipeline::Pipeline;
use storage::SqliteStorage;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    // Load configuration from file
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let storage = match &config.database_path {
        Some(path) => match SqliteStorage::new(path) {
            Ok(s) => {
                match s.count() {
                    Ok(n) => info!("Opened '{}' with {} persisted summaries", path, n),
                    Err(e) => warn!("Could not count persisted summaries: {}", e),
                }
                Some(s)
            }
            Err(e) => {
                error!("Failed to initialize storage: {}", e);
                return;
            }
        },
        None => None,
    };

    let store = match build_store(&config, storage.as_ref()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to create history store: {}", e);
            return;
        }
    };
    info!(
        "History store ready: {}/{} summaries",
        store.len(),
        store.capacity()
    );

    let source = InboxSource::new(&config.inbox_dir, &config.processed_dir, &config.rejected_dir);
    let pipeline = Pipeline::new(
        Arc::new(source),
        store,
        storage.map(|s| Arc::new(Mutex::new(s))),
    );

    info!("Watching '{}' for CSV uploads", config.inbox_dir);
    loop {
        match pipeline.run_cycle().await {
            Ok(report) if report.stored + report.rejected + report.failed > 0 => {
                info!(
                    "Cycle done: {} stored, {} rejected, {} failed",
                    report.stored, report.rejected, report.failed
                );
                log_recent(&pipeline, config.display_count);
            }
            Ok(_) => {}
            Err(e) => warn!("Listing uploads failed: {}", e),
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(config.check_interval_seconds)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down.");
                break;
            }
        }
    }
}

/// Builds the history store, replaying persisted summaries when a database is configured.
fn build_store(
    config: &AppConfig,
    storage: Option<&SqliteStorage>,
) -> Result<HistoryStore, model::ConfigError> {
    let Some(storage) = storage else {
        return HistoryStore::new(config.history_capacity);
    };
    let restored = match storage.load_recent(config.history_capacity) {
        Ok(records) => records,
        Err(e) => {
            warn!("Could not restore history, starting empty: {}", e);
            Vec::new()
        }
    };
    HistoryStore::restore(config.history_capacity, restored)
}

/// Logs the most recent summaries in the JSON shape the chart renderers consume.
fn log_recent(pipeline: &Pipeline, count: usize) {
    let recent = pipeline.store().recent(count);
    match serde_json::to_string_pretty(&recent) {
        Ok(json) => info!("Recent summaries:\n{}", json),
        Err(e) => warn!("Failed to encode recent summaries: {}", e),
    }
}
