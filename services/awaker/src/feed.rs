//! Paginated activity feed loader
//!
//! Offset-based paging over `GET /api/activity-feed`. A reset load replaces
//! the accumulated items, an append load extends them. Failures land in
//! [`FeedState::error`] and never touch items that are already loaded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AwakerError, Result};
use crate::io::HttpClient;

pub const FEED_PATH: &str = "/api/activity-feed";

/// One entry of the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lead_id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub icon: String,
}

/// Response body of the feed endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeedPage {
    pub items: Vec<ActivityItem>,
    pub total: u64,
    pub has_more: bool,
}

/// Everything a caller renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub items: Vec<ActivityItem>,
    pub total: u64,
    pub has_more: bool,
    pub offset: usize,
    /// A reset load is in flight
    pub loading: bool,
    /// An append load is in flight
    pub loading_more: bool,
    pub error: Option<String>,
}

/// What a load call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// Not issued: a load of the same kind is in flight, or nothing more to load
    Skipped,
    Failed(String),
}

pub struct FeedLoader {
    http: Arc<dyn HttpClient>,
    base_url: String,
    limit: u32,
    account_id: RwLock<Option<String>>,
    state: Arc<RwLock<FeedState>>,
}

impl std::fmt::Debug for FeedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLoader")
            .field("base_url", &self.base_url)
            .field("limit", &self.limit)
            .finish()
    }
}

impl FeedLoader {
    pub fn new(
        base_url: &str,
        limit: u32,
        account_id: Option<String>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            account_id: RwLock::new(account_id),
            state: Arc::new(RwLock::new(FeedState::default())),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> FeedState {
        self.state.read().await.clone()
    }

    /// Change the account filter used by subsequent requests
    pub async fn set_account_filter(&self, account_id: Option<String>) {
        tracing::debug!("Feed account filter set to {:?}", account_id);
        *self.account_id.write().await = account_id;
    }

    /// Fetch one page: from offset 0 replacing everything when `reset`,
    /// otherwise from the end of what is loaded
    pub async fn load(&self, reset: bool) -> LoadOutcome {
        let offset = {
            let mut state = self.state.write().await;
            let in_flight = if reset {
                &mut state.loading
            } else {
                &mut state.loading_more
            };
            if *in_flight {
                tracing::debug!("Feed load (reset={}) already in flight", reset);
                return LoadOutcome::Skipped;
            }
            *in_flight = true;
            state.error = None;
            if reset {
                0
            } else {
                state.items.len()
            }
        };

        let result = self.fetch_page(offset).await;

        let mut state = self.state.write().await;
        if reset {
            state.loading = false;
        } else {
            state.loading_more = false;
        }

        match result {
            Ok(page) => {
                let count = page.items.len();
                apply_page(&mut state, page, reset);
                tracing::debug!(
                    "Feed page at offset {}: {} items (total {}, has_more {})",
                    offset,
                    count,
                    state.total,
                    state.has_more
                );
                LoadOutcome::Loaded { count }
            }
            Err(e) => {
                let message = format!("Failed to load activity feed: {}", e);
                tracing::warn!("{}", message);
                state.error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Append the next page unless a load is in flight or the server said there is no more
    pub async fn load_more(&self) -> LoadOutcome {
        {
            let state = self.state.read().await;
            if state.loading || state.loading_more || !state.has_more {
                return LoadOutcome::Skipped;
            }
        }
        self.load(false).await
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.load(true).await
    }

    async fn fetch_page(&self, offset: usize) -> Result<ActivityFeedPage> {
        let account_id = self.account_id.read().await.clone();
        let url = page_url(&self.base_url, self.limit, offset, account_id.as_deref())?;
        let response = self.http.get(&url).await?;
        if !response.is_success() {
            return Err(AwakerError::Http(format!("HTTP {}", response.status)));
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

fn apply_page(state: &mut FeedState, page: ActivityFeedPage, reset: bool) {
    if reset {
        state.items = page.items;
    } else {
        state.items.extend(page.items);
    }
    state.total = page.total;
    state.has_more = page.has_more;

    let total = usize::try_from(state.total).unwrap_or(usize::MAX);
    if state.items.len() > total {
        tracing::warn!(
            "Feed holds {} items but server reports total {}, trimming",
            state.items.len(),
            total
        );
        state.items.truncate(total);
    }
    state.offset = state.items.len();
}

/// Build the request URL for one page
pub fn page_url(
    base_url: &str,
    limit: u32,
    offset: usize,
    account_id: Option<&str>,
) -> Result<String> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), FEED_PATH);
    let mut url = reqwest::Url::parse(&endpoint)
        .map_err(|e| AwakerError::Config(format!("Invalid API URL {}: {}", endpoint, e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", &limit.to_string());
        query.append_pair("offset", &offset.to_string());
        if let Some(account_id) = account_id {
            query.append_pair("accountId", account_id);
        }
    }
    Ok(url.to_string())
}
