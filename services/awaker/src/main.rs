//! Awaker CLI
//!
//! Drives the client core against a running Lead Awaker backend.

use std::path::PathBuf;
use std::sync::Arc;

use awaker::io::{HttpClient, ReqwestHttpClient};
use awaker::preferences::{dashboard_refresh_interval, refresh_period};
use awaker::{load_config, Config};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[derive(Parser)]
#[command(name = "awaker")]
#[command(about = "Lead Awaker client core")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the backend once and print connectivity and database status
    Status,
    /// Monitor connectivity until Ctrl-C
    Watch,
    /// Load and print the activity feed
    Feed {
        /// Page size (overrides config file)
        #[arg(long)]
        limit: Option<u32>,
        /// Restrict to one account
        #[arg(long)]
        account_id: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Read or change stored preferences
    Prefs {
        #[command(subcommand)]
        preference: PrefCommand,
    },
}

#[derive(Subcommand)]
enum PrefCommand {
    /// Dashboard refresh interval in seconds, 0 turns refreshing off
    RefreshInterval { seconds: Option<u64> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, base_url={:?}, log_level={:?}",
        args.config,
        args.base_url,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    match args.command {
        Command::Status => {
            let probe = awaker::health_probe(&config, http);
            let report = awaker::check_status(&probe, &config).await;
            println!("Connectivity: {}", report.state);
            println!("Database:     {}", report.db);
            match &report.outcome {
                awaker::health::ProbeOutcome::Reachable {
                    report: Some(health),
                } => println!("Tables:       {}", health.summary()),
                awaker::health::ProbeOutcome::Reachable { report: None } => {}
                awaker::health::ProbeOutcome::Unreachable { reason } => {
                    println!("Reason:       {}", reason)
                }
            }
        }
        Command::Watch => {
            let cancel = CancellationToken::new();
            let cancel_for_signal = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                    return;
                }
                tracing::info!("Shutdown signal received");
                cancel_for_signal.cancel();
            });

            let probe = Arc::new(awaker::health_probe(&config, http));
            awaker::watch(&config, probe, cancel).await;
        }
        Command::Feed {
            limit,
            account_id,
            pages,
        } => {
            if let Some(limit) = limit {
                config.feed.page_size = limit;
            }
            if account_id.is_some() {
                config.feed.account_id = account_id;
            }
            let loader = awaker::feed_loader(&config, http);
            let state = awaker::load_feed(&loader, pages).await?;
            for item in &state.items {
                println!(
                    "{:<25} [{}] {}",
                    item.timestamp.as_deref().unwrap_or("-"),
                    item.kind,
                    item.title
                );
            }
            println!(
                "{} of {} items{}",
                state.items.len(),
                state.total,
                if state.has_more { ", more available" } else { "" }
            );
        }
        Command::Prefs {
            preference: PrefCommand::RefreshInterval { seconds },
        } => {
            if config.storage.path.is_none() {
                tracing::warn!("No storage path configured, preferences will not be kept");
            }
            let store = awaker::open_store(&config.storage);
            let preference = dashboard_refresh_interval(store);
            if let Some(seconds) = seconds {
                preference.set(seconds);
            }
            match refresh_period(preference.get()) {
                Some(period) => println!("Dashboard refresh interval: {}s", period.as_secs()),
                None => println!("Dashboard refresh interval: off"),
            }
        }
    }

    Ok(())
}
