//! Shared test doubles: a scripted health probe and a stub Lead Awaker API

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::time::Instant;

use awaker::connectivity::ConnectivityStatus;
use awaker::feed::{ActivityFeedPage, ActivityItem};
use awaker::health::{Probe, ProbeOutcome};

pub fn up() -> ProbeOutcome {
    ProbeOutcome::Reachable { report: None }
}

pub fn down() -> ProbeOutcome {
    ProbeOutcome::Unreachable {
        reason: "HTTP 503".to_string(),
    }
}

/// Probe that plays back a fixed list of outcomes, repeating the last one
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeOutcome>>,
    last: Mutex<ProbeOutcome>,
    latency: Duration,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedProbe {
    pub fn new(script: impl IntoIterator<Item = ProbeOutcome>) -> Arc<Self> {
        Self::with_latency(script, Duration::ZERO)
    }

    pub fn with_latency(
        script: impl IntoIterator<Item = ProbeOutcome>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(up()),
            latency,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Queue more outcomes after the current script
    pub fn push(&self, outcome: ProbeOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Start instants of every probe so far
    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self) -> ProbeOutcome {
        self.calls.lock().unwrap().push(Instant::now());
        let outcome = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }
}

/// Wait for the next published status
pub async fn next_status(
    rx: &mut tokio::sync::watch::Receiver<ConnectivityStatus>,
) -> ConnectivityStatus {
    rx.changed().await.expect("monitor stopped");
    rx.borrow_and_update().clone()
}

pub fn activity(n: usize) -> ActivityItem {
    ActivityItem {
        kind: if n % 2 == 0 { "message" } else { "call" }.to_string(),
        title: format!("Activity {}", n),
        description: format!("Detail for activity {}", n),
        lead_id: Some(n as i64),
        timestamp: Some(format!("2024-03-01T10:{:02}:00Z", n % 60)),
        icon: "bell".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub limit: usize,
    pub offset: usize,
    pub account_id: Option<String>,
}

struct ApiState {
    items: Vec<ActivityItem>,
    health_status: u16,
    health_body: String,
    feed_status: u16,
    feed_queries: Vec<FeedQuery>,
    health_hits: usize,
}

/// In-process stand-in for the Lead Awaker REST API
pub struct StubApi {
    pub addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl StubApi {
    /// Serve `item_count` feed items and a healthy health endpoint
    pub async fn start(item_count: usize) -> Self {
        let state = Arc::new(Mutex::new(ApiState {
            items: (0..item_count).map(activity).collect(),
            health_status: 200,
            health_body: r#"{"status":"healthy","database":"connected","totalTables":12,"accessibleTables":12}"#
                .to_string(),
            feed_status: 200,
            feed_queries: Vec::new(),
            health_hits: 0,
        }));
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/activity-feed", get(feed))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub API");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_health(&self, status: u16, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.health_status = status;
        state.health_body = body.to_string();
    }

    pub fn set_feed_status(&self, status: u16) {
        self.state.lock().unwrap().feed_status = status;
    }

    pub fn set_item_count(&self, count: usize) {
        self.state.lock().unwrap().items = (0..count).map(activity).collect();
    }

    pub fn feed_queries(&self) -> Vec<FeedQuery> {
        self.state.lock().unwrap().feed_queries.clone()
    }

    pub fn health_hits(&self) -> usize {
        self.state.lock().unwrap().health_hits
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn health(State(state): State<Arc<Mutex<ApiState>>>) -> (StatusCode, String) {
    let mut state = state.lock().unwrap();
    state.health_hits += 1;
    (
        StatusCode::from_u16(state.health_status).unwrap(),
        state.health_body.clone(),
    )
}

async fn feed(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ActivityFeedPage>, StatusCode> {
    let mut state = state.lock().unwrap();
    state.feed_queries.push(query.clone());
    if state.feed_status != 200 {
        return Err(StatusCode::from_u16(state.feed_status).unwrap());
    }

    let total = state.items.len();
    let start = query.offset.min(total);
    let end = (start + query.limit).min(total);
    Ok(Json(ActivityFeedPage {
        items: state.items[start..end].to_vec(),
        total: total as u64,
        has_more: end < total,
    }))
}
