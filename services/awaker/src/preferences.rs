//! Durable user preferences with change notification
//!
//! Each [`Preference`] owns one storage key and one `watch` channel. Writers
//! call [`Preference::set`]; every component that cares holds a receiver
//! from [`Preference::subscribe`] instead of polling storage.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::storage::{read_key, remove_key, scoped_key, write_key, KeyValueStore};

/// Seconds between dashboard refreshes when nothing is stored
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// A typed value stored as JSON under a single key
pub struct Preference<T> {
    key: String,
    default: T,
    storage: Arc<dyn KeyValueStore>,
    tx: watch::Sender<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Preference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preference")
            .field("key", &self.key)
            .field("value", &*self.tx.borrow())
            .finish()
    }
}

impl<T> Preference<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let value = match read_key(storage.as_ref(), &key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Ignoring malformed preference '{}': {}", key, e);
                    default.clone()
                }
            },
            None => default.clone(),
        };
        let (tx, _) = watch::channel(value);
        Self {
            key,
            default,
            storage,
            tx,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Persist and publish a new value
    pub fn set(&self, value: T) {
        match serde_json::to_string(&value) {
            Ok(raw) => write_key(self.storage.as_ref(), &self.key, &raw),
            Err(e) => tracing::warn!("Cannot encode preference '{}': {}", self.key, e),
        }
        self.tx.send_replace(value);
    }

    /// Forget the stored value and publish the default
    pub fn reset(&self) {
        remove_key(self.storage.as_ref(), &self.key);
        self.tx.send_replace(self.default.clone());
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

/// Dashboard auto-refresh interval in seconds, 0 disables refreshing
pub fn dashboard_refresh_interval(storage: Arc<dyn KeyValueStore>) -> Preference<u64> {
    Preference::new(
        storage,
        scoped_key("dashboard", "refresh_interval"),
        DEFAULT_REFRESH_INTERVAL_SECONDS,
    )
}

/// Refresh period for a stored interval, `None` when refreshing is off
pub fn refresh_period(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}
