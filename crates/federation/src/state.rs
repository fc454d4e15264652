//! Short-lived state tokens for connection-linking flows
//!
//! An injected store abstraction instead of a process-global map, so
//! multi-process deployments can swap in a shared backend. Tokens are
//! single-use and expire after the configured TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Store for pending link-flow state, keyed by a random nonce
#[async_trait]
pub trait StateTokenStore: Send + Sync {
    /// Store a payload and return its single-use token
    async fn issue(&self, payload: serde_json::Value) -> String;

    /// Take a payload by token; `None` if unknown, expired or already used
    async fn consume(&self, token: &str) -> Option<serde_json::Value>;
}

/// In-memory token store with TTL eviction
pub struct MemoryStateTokenStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, serde_json::Value)>>,
}

impl MemoryStateTokenStore {
    /// Create a store whose tokens expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StateTokenStore for MemoryStateTokenStore {
    async fn issue(&self, payload: serde_json::Value) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (issued, _)| issued.elapsed() < self.ttl);
        entries.insert(token.clone(), (Instant::now(), payload));
        token
    }

    async fn consume(&self, token: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().await;
        let (issued, payload) = entries.remove(token)?;
        if issued.elapsed() >= self.ttl {
            return None;
        }
        Some(payload)
    }
}
