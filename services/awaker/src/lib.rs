//! Awaker - Lead Awaker client core
//!
//! Backend connectivity monitoring, persisted selections and the paginated
//! activity feed, plus the preference and timeline state the UI builds on.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod feed;
pub mod health;
pub mod io;
pub mod preferences;
pub mod selection;
pub mod storage;
pub mod timeline;

pub use config::{load_config, Config};
pub use error::{AwakerError, Result};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::StorageConfig;
use crate::connectivity::{ConnectivityMachine, ConnectivityMonitor, ConnectivityState};
use crate::feed::{FeedLoader, FeedState, LoadOutcome};
use crate::health::{DbStatus, HttpHealthProbe, Probe, ProbeOutcome};
use crate::io::HttpClient;
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Open the configured key/value store, in memory when no path is set
pub fn open_store(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match &config.path {
        Some(path) => {
            tracing::debug!("Using JSON store at {:?}", path);
            Arc::new(JsonFileStore::open(path))
        }
        None => {
            tracing::debug!("No storage path configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

pub fn health_probe(config: &Config, http: Arc<dyn HttpClient>) -> HttpHealthProbe {
    HttpHealthProbe::new(
        &config.api.base_url,
        config.connectivity.probe_timeout(),
        http,
    )
}

pub fn feed_loader(config: &Config, http: Arc<dyn HttpClient>) -> FeedLoader {
    FeedLoader::new(
        &config.api.base_url,
        config.feed.page_size,
        config.feed.account_id.clone(),
        http,
    )
}

/// Result of a one-shot health check
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: ConnectivityState,
    pub db: DbStatus,
    pub outcome: ProbeOutcome,
}

/// Probe once and classify the result the way the monitor would
pub async fn check_status(probe: &dyn Probe, config: &Config) -> StatusReport {
    let outcome = probe.probe().await;
    let mut machine = ConnectivityMachine::new(config.connectivity.clone());
    machine.apply_probe(&outcome, 0);
    StatusReport {
        state: machine.state(),
        db: DbStatus::from_outcome(&outcome),
        outcome,
    }
}

/// Load the first page and then up to `pages - 1` more
///
/// A failing first page is an error. A failing later page ends paging and
/// leaves what was already loaded.
pub async fn load_feed(loader: &FeedLoader, pages: u32) -> Result<FeedState> {
    if let LoadOutcome::Failed(message) = loader.refresh().await {
        return Err(AwakerError::Http(message));
    }
    for _ in 1..pages {
        match loader.load_more().await {
            LoadOutcome::Loaded { .. } => {}
            LoadOutcome::Skipped => break,
            LoadOutcome::Failed(message) => {
                tracing::warn!("Stopped paging: {}", message);
                break;
            }
        }
    }
    Ok(loader.snapshot().await)
}

/// Run the connectivity monitor and log every status change until cancelled
pub async fn watch(config: &Config, probe: Arc<dyn Probe>, cancel: CancellationToken) {
    let handle = ConnectivityMonitor::new(probe, config.connectivity.clone()).start(cancel.clone());
    let mut status = handle.subscribe();
    tracing::info!("Watching {}", config.api.endpoint(health::HEALTH_PATH));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                tracing::info!(
                    "Connectivity: {} (retry_count={}, was_disconnected={})",
                    current.state,
                    current.retry_count,
                    current.was_disconnected
                );
            }
        }
    }

    handle.stop().await;
    tracing::debug!("Watch finished");
}
