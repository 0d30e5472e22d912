//! Connectivity monitor: backend reachability with adaptive polling
//!
//! [`ConnectivityMachine`] holds the state and transition rules and knows
//! nothing about time sources. [`ConnectivityMonitor`] drives it from a tokio
//! task: it owns the grace delay, the poll interval and the recovered-state
//! expiry, and publishes every status change on a `watch` channel.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ConnectivityConfig;
use crate::health::{Probe, ProbeOutcome};

/// Reachability of the backend as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Checking,
    Connected,
    Disconnected,
    Reconnecting,
    Recovered,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Checking => write!(f, "Checking"),
            ConnectivityState::Connected => write!(f, "Connected"),
            ConnectivityState::Disconnected => write!(f, "Disconnected"),
            ConnectivityState::Reconnecting => write!(f, "Reconnecting"),
            ConnectivityState::Recovered => write!(f, "Recovered"),
        }
    }
}

/// Observable status of the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    pub state: ConnectivityState,
    pub retry_count: u32,
    /// Sticky flag: down at some point since the last successful probe
    pub was_disconnected: bool,
    pub last_probe_epoch_ms: Option<u64>,
}

impl Default for ConnectivityStatus {
    fn default() -> Self {
        Self {
            state: ConnectivityState::Checking,
            retry_count: 0,
            was_disconnected: false,
            last_probe_epoch_ms: None,
        }
    }
}

/// Connectivity state and its transition rules
#[derive(Debug, Clone)]
pub struct ConnectivityMachine {
    status: ConnectivityStatus,
    config: ConnectivityConfig,
}

impl ConnectivityMachine {
    pub fn new(config: ConnectivityConfig) -> Self {
        Self {
            status: ConnectivityStatus::default(),
            config,
        }
    }

    pub fn status(&self) -> &ConnectivityStatus {
        &self.status
    }

    pub fn state(&self) -> ConnectivityState {
        self.status.state
    }

    /// Visual feedback for a user-triggered retry, set before the probe runs
    pub fn begin_manual_retry(&mut self) -> bool {
        self.set_state(ConnectivityState::Reconnecting)
    }

    /// Apply a probe result. Returns true if the state changed.
    pub fn apply_probe(&mut self, outcome: &ProbeOutcome, now_ms: u64) -> bool {
        self.status.last_probe_epoch_ms = Some(now_ms);
        if outcome.is_reachable() {
            self.status.retry_count = 0;
            if self.status.was_disconnected {
                self.status.was_disconnected = false;
                self.set_state(ConnectivityState::Recovered)
            } else {
                self.set_state(ConnectivityState::Connected)
            }
        } else {
            self.status.was_disconnected = true;
            self.status.retry_count = self.status.retry_count.saturating_add(1);
            self.set_state(ConnectivityState::Disconnected)
        }
    }

    /// The recovered window has elapsed
    pub fn expire_recovered(&mut self) -> bool {
        if self.status.state == ConnectivityState::Recovered {
            self.set_state(ConnectivityState::Connected)
        } else {
            false
        }
    }

    /// Delay until the next automatic probe, measured from the last state change
    pub fn next_poll_delay(&self) -> Duration {
        match self.status.state {
            ConnectivityState::Disconnected => self.config.disconnected_interval(),
            _ => self.config.connected_interval(),
        }
    }

    /// How long the current state may be shown before it expires on its own
    pub fn recovered_expiry(&self) -> Option<Duration> {
        (self.status.state == ConnectivityState::Recovered)
            .then(|| self.config.recovered_display())
    }

    fn set_state(&mut self, state: ConnectivityState) -> bool {
        let changed = self.status.state != state;
        self.status.state = state;
        changed
    }
}

/// Spawns and drives a [`ConnectivityMachine`]
pub struct ConnectivityMonitor {
    probe: Arc<dyn Probe>,
    config: ConnectivityConfig,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn Probe>, config: ConnectivityConfig) -> Self {
        Self { probe, config }
    }

    /// Start polling. The task stops when `cancel` fires or the handle is
    /// stopped or dropped.
    pub fn start(self, cancel: CancellationToken) -> MonitorHandle {
        let machine = ConnectivityMachine::new(self.config.clone());
        let (status_tx, status_rx) = watch::channel(machine.status().clone());
        let (retry_tx, retry_rx) = mpsc::channel(1);

        tracing::debug!(
            "Starting connectivity monitor (first probe in {:?})",
            self.config.initial_delay()
        );

        let task = tokio::spawn(run_loop(
            machine,
            self.probe,
            self.config,
            status_tx,
            retry_rx,
            cancel.clone(),
        ));

        MonitorHandle {
            status: status_rx,
            retry: retry_tx,
            cancel,
            task,
        }
    }
}

/// Control surface of a running monitor
pub struct MonitorHandle {
    status: watch::Receiver<ConnectivityStatus>,
    retry: mpsc::Sender<()>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn status(&self) -> ConnectivityStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.clone()
    }

    /// Ask for an immediate manual probe
    pub fn retry(&self) {
        // A full queue already has a retry pending
        if self.retry.try_send(()).is_err() {
            tracing::debug!("Manual retry already queued");
        }
    }

    /// Cancel all timers and wait for the task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Connectivity monitor task ended abnormally: {}", e);
        }
    }
}

async fn run_loop(
    mut machine: ConnectivityMachine,
    probe: Arc<dyn Probe>,
    config: ConnectivityConfig,
    status_tx: watch::Sender<ConnectivityStatus>,
    mut retry_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mut next_poll = Instant::now() + config.initial_delay();
    let mut recovered_deadline: Option<Instant> = None;

    'monitor: loop {
        let manual = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Connectivity monitor cancelled");
                break;
            }
            _ = sleep_until(next_poll) => false,
            _ = sleep_until(recovered_deadline.unwrap_or(next_poll)), if recovered_deadline.is_some() => {
                recovered_deadline = None;
                if machine.expire_recovered() {
                    tracing::debug!("Recovered window elapsed");
                    publish(&status_tx, &machine);
                    next_poll = Instant::now() + machine.next_poll_delay();
                }
                continue;
            }
            request = retry_rx.recv() => {
                if request.is_none() {
                    tracing::debug!("Monitor handle dropped, stopping");
                    break;
                }
                true
            }
        };

        let previous = machine.state();
        if manual {
            tracing::info!("Manual reconnect requested");
            if machine.begin_manual_retry() {
                publish(&status_tx, &machine);
            }
        }

        // A retry arriving mid-check shows as reconnecting now and shares this check
        let probe_call = probe.probe();
        tokio::pin!(probe_call);
        let outcome = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Connectivity monitor cancelled during probe");
                    break 'monitor;
                }
                outcome = &mut probe_call => break outcome,
                request = retry_rx.recv() => {
                    if request.is_none() {
                        tracing::debug!("Monitor handle dropped, stopping");
                        break 'monitor;
                    }
                    tracing::info!("Manual reconnect requested during health check");
                    if machine.begin_manual_retry() {
                        publish(&status_tx, &machine);
                    }
                }
            }
        };

        let changed = machine.apply_probe(&outcome, current_epoch_ms());
        publish(&status_tx, &machine);

        let current = machine.state();
        if changed || previous != current {
            match &outcome {
                ProbeOutcome::Unreachable { reason } => tracing::warn!(
                    "Backend unreachable ({}), attempt {}",
                    reason,
                    machine.status().retry_count
                ),
                ProbeOutcome::Reachable { .. } => {
                    tracing::info!("Connectivity {} -> {}", previous, current)
                }
            }
        } else {
            tracing::debug!(
                "Probe complete: {} (retry_count={})",
                current,
                machine.status().retry_count
            );
        }

        recovered_deadline = machine.recovered_expiry().map(|d| Instant::now() + d);
        next_poll = Instant::now() + machine.next_poll_delay();
    }
}

fn publish(status_tx: &watch::Sender<ConnectivityStatus>, machine: &ConnectivityMachine) {
    status_tx.send_replace(machine.status().clone());
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
