//! Health probe against `/api/health`

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::io::HttpClient;

pub const HEALTH_PATH: &str = "/api/health";

/// Overall status reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    Healthy,
    Degraded,
    Error,
    #[serde(other)]
    Unknown,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: ReportedStatus,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub total_tables: u32,
    #[serde(default)]
    pub accessible_tables: u32,
    #[serde(default)]
    pub tables: Option<BTreeMap<String, serde_json::Value>>,
}

impl HealthReport {
    pub fn summary(&self) -> String {
        format!(
            "{}/{} tables accessible",
            self.accessible_tables, self.total_tables
        )
    }
}

/// Database indicator derived from a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStatus {
    Healthy,
    Degraded,
    Error,
    Unreachable,
}

impl DbStatus {
    pub fn from_outcome(outcome: &ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Reachable { report: Some(report) } => match report.status {
                ReportedStatus::Healthy => DbStatus::Healthy,
                ReportedStatus::Degraded => DbStatus::Degraded,
                ReportedStatus::Error | ReportedStatus::Unknown => DbStatus::Error,
            },
            // 2xx without a parseable body: the API is up, the database state is not known
            ProbeOutcome::Reachable { report: None } => DbStatus::Degraded,
            ProbeOutcome::Unreachable { .. } => DbStatus::Unreachable,
        }
    }
}

impl fmt::Display for DbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbStatus::Healthy => write!(f, "Healthy"),
            DbStatus::Degraded => write!(f, "Degraded"),
            DbStatus::Error => write!(f, "Error"),
            DbStatus::Unreachable => write!(f, "Unreachable"),
        }
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The endpoint answered with a 2xx status
    Reachable { report: Option<HealthReport> },
    /// Non-2xx, network error or timeout
    Unreachable { reason: String },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }
}

/// A single reachability check
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;
}

/// Probe issuing one bounded GET to the health endpoint
pub struct HttpHealthProbe {
    url: String,
    timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl fmt::Debug for HttpHealthProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHealthProbe")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpHealthProbe {
    pub fn new(base_url: &str, timeout: Duration, http: Arc<dyn HttpClient>) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH);
        tracing::debug!("Created HttpHealthProbe at {} (timeout {:?})", url, timeout);
        Self { url, timeout, http }
    }
}

#[async_trait]
impl Probe for HttpHealthProbe {
    async fn probe(&self) -> ProbeOutcome {
        let response = match tokio::time::timeout(self.timeout, self.http.get(&self.url)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!("Health probe failed: {}", e);
                return ProbeOutcome::Unreachable {
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                let e = crate::AwakerError::Timeout(self.timeout);
                tracing::debug!("Health probe failed: {}", e);
                return ProbeOutcome::Unreachable {
                    reason: e.to_string(),
                };
            }
        };

        if !response.is_success() {
            tracing::debug!("Health probe got status {}", response.status);
            return ProbeOutcome::Unreachable {
                reason: format!("HTTP {}", response.status),
            };
        }

        let report = match serde_json::from_str::<HealthReport>(&response.body) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::debug!("Unparseable health body: {}", e);
                None
            }
        };
        ProbeOutcome::Reachable { report }
    }
}
