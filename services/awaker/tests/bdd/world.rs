//! BDD test world for the awaker client core

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cucumber::World;

use awaker::connectivity::{ConnectivityMachine, ConnectivityState};
use awaker::feed::{ActivityFeedPage, ActivityItem, FeedLoader, LoadOutcome};
use awaker::health::DbStatus;
use awaker::io::{HttpClient, HttpResponse};
use awaker::selection::PersistedSelection;
use awaker::storage::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: u32,
    pub name: String,
}

/// Feed endpoint double serving numbered items
#[derive(Debug, Default)]
pub struct FakeFeedApi {
    pub total: AtomicUsize,
    pub failing: AtomicBool,
}

#[async_trait]
impl HttpClient for FakeFeedApi {
    async fn get(&self, url: &str) -> awaker::Result<HttpResponse> {
        if self.failing.load(Ordering::SeqCst) {
            return Ok(HttpResponse {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        let url = reqwest::Url::parse(url).map_err(|e| awaker::AwakerError::Http(e.to_string()))?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0)
        };
        let total = self.total.load(Ordering::SeqCst);
        let start = param("offset").min(total);
        let end = (start + param("limit")).min(total);
        let page = ActivityFeedPage {
            items: (start..end)
                .map(|n| ActivityItem {
                    kind: "message".to_string(),
                    title: format!("Activity {}", n),
                    description: String::new(),
                    lead_id: Some(n as i64),
                    timestamp: None,
                    icon: "message-circle".to_string(),
                })
                .collect(),
            total: total as u64,
            has_more: end < total,
        };
        Ok(HttpResponse {
            status: 200,
            body: serde_json::to_string(&page)?,
        })
    }
}

#[derive(Debug, Default, World)]
pub struct AwakerWorld {
    // Connectivity testing
    pub machine: Option<ConnectivityMachine>,
    pub states_seen: Vec<ConnectivityState>,
    pub db_status: Option<DbStatus>,

    // Feed testing
    pub feed_api: Arc<FakeFeedApi>,
    pub feed: Option<FeedLoader>,
    pub last_load: Option<LoadOutcome>,

    // Selection testing
    pub store: Option<Arc<MemoryStore>>,
    pub selection: Option<PersistedSelection<Campaign>>,
}
