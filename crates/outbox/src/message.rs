//! Outbox message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of an outbox message
///
/// `pending/failed -> sending -> sent`, with `failed` re-entering the
/// cycle once due and `dead` terminal after the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Dead,
}

/// One queued outbound federation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Message id
    pub id: String,

    /// Base URL of the target instance
    pub target_base_url: String,

    /// Receiving endpoint path, e.g. `/federation/hub/notify`
    pub endpoint_path: String,

    /// HTTP method for delivery
    pub http_method: String,

    /// JSON payload to deliver
    pub payload: serde_json::Value,

    /// Current delivery state
    pub status: OutboxStatus,

    /// Delivery attempts so far; increments on every attempt
    pub attempts: u32,

    /// Retry budget
    pub max_attempts: u32,

    /// When the message is next due for delivery
    pub next_attempt_at: DateTime<Utc>,

    /// Last delivery error, truncated, for operational visibility
    pub last_error: Option<String>,

    /// When the message was enqueued
    pub created_at: DateTime<Utc>,

    /// When the message was successfully delivered
    pub sent_at: Option<DateTime<Utc>>,

    /// When the message reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Create a pending message, due immediately
    pub fn new(
        target_base_url: &str,
        endpoint_path: &str,
        http_method: &str,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            target_base_url: target_base_url.to_string(),
            endpoint_path: endpoint_path.to_string(),
            http_method: http_method.to_string(),
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            max_attempts,
            next_attempt_at: now,
            last_error: None,
            created_at: now,
            sent_at: None,
            completed_at: None,
        }
    }

    /// Whether the message can be claimed for delivery
    pub fn claimable(&self) -> bool {
        matches!(self.status, OutboxStatus::Pending | OutboxStatus::Failed)
    }

    /// Full delivery URL
    pub fn delivery_url(&self) -> String {
        format!(
            "{}{}",
            self.target_base_url.trim_end_matches('/'),
            self.endpoint_path
        )
    }
}
