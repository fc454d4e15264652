//! Outbox persistence
//!
//! The `pending/failed -> sending` claim is the concurrency boundary for
//! the whole pipeline and must be a single atomic transition; everything
//! else relies on idempotent upserts and monotonic status changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coopnet_common::Result;
use coopnet_storage::{Storage, StorageExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::message::{OutboxMessage, OutboxStatus};

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt
    pub base: Duration,
    /// Upper bound on the delay
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            max: Duration::from_secs(3600),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt: `base * 2^(attempts-1)`, capped
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(31);
        let delay = self.base.saturating_mul(1u32 << exponent);
        delay.min(self.max)
    }
}

/// Persistence contract for the delivery pipeline
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persist a new message
    async fn enqueue(&self, message: OutboxMessage) -> Result<()>;

    /// Load a message by id
    async fn get(&self, id: &str) -> Result<Option<OutboxMessage>>;

    /// Messages due for delivery, ordered by due time
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// Atomically transition a claimable message to `sending`
    ///
    /// Returns the claimed message with its attempt counter already
    /// incremented, or `None` if the message is not claimable.
    async fn claim(&self, id: &str) -> Result<Option<OutboxMessage>>;

    /// Record a successful delivery
    async fn mark_sent(&self, id: &str) -> Result<()>;

    /// Record a failed delivery attempt
    ///
    /// Schedules a retry, or dead-letters the message once the retry
    /// budget is spent. Returns the resulting status.
    async fn mark_failed(&self, id: &str, error: &str) -> Result<OutboxStatus>;

    /// Return messages stuck in `sending` beyond the grace period to the
    /// retry cycle; returns how many were reclaimed
    async fn reclaim_stale(&self, grace: Duration) -> Result<usize>;

    /// List messages, optionally filtered by status
    async fn list(&self, status: Option<OutboxStatus>) -> Result<Vec<OutboxMessage>>;
}

/// Outbox store over the record store abstraction
pub struct StorageOutboxStore {
    storage: Arc<dyn Storage>,
    backoff: BackoffPolicy,
    // Serializes claims so the status transition is a single atomic update
    claim_lock: Mutex<()>,
}

impl StorageOutboxStore {
    /// Create an outbox store with the given backoff policy
    pub fn new(storage: Arc<dyn Storage>, backoff: BackoffPolicy) -> Self {
        Self {
            storage,
            backoff,
            claim_lock: Mutex::new(()),
        }
    }

    async fn load(&self, id: &str) -> Result<Option<OutboxMessage>> {
        self.storage.get(&message_key(id)).await
    }

    async fn save(&self, message: &OutboxMessage) -> Result<()> {
        self.storage.put(&message_key(&message.id), message).await
    }
}

#[async_trait]
impl OutboxStore for StorageOutboxStore {
    async fn enqueue(&self, message: OutboxMessage) -> Result<()> {
        self.save(&message).await
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxMessage>> {
        self.load(id).await
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxMessage>> {
        let mut due: Vec<OutboxMessage> = self
            .list(None)
            .await?
            .into_iter()
            .filter(|m| m.claimable() && m.next_attempt_at <= now)
            .collect();

        due.sort_by_key(|m| m.next_attempt_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn claim(&self, id: &str) -> Result<Option<OutboxMessage>> {
        let _guard = self.claim_lock.lock().await;

        let mut message = match self.load(id).await? {
            Some(message) if message.claimable() => message,
            _ => return Ok(None),
        };

        message.status = OutboxStatus::Sending;
        message.attempts += 1;
        self.save(&message).await?;
        Ok(Some(message))
    }

    async fn mark_sent(&self, id: &str) -> Result<()> {
        if let Some(mut message) = self.load(id).await? {
            let now = Utc::now();
            message.status = OutboxStatus::Sent;
            message.last_error = None;
            message.sent_at = Some(now);
            message.completed_at = Some(now);
            self.save(&message).await?;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<OutboxStatus> {
        let mut message = match self.load(id).await? {
            Some(message) => message,
            None => return Ok(OutboxStatus::Dead),
        };

        message.last_error = Some(error.to_string());

        let status = if message.attempts >= message.max_attempts {
            message.status = OutboxStatus::Dead;
            message.completed_at = Some(Utc::now());
            OutboxStatus::Dead
        } else {
            message.status = OutboxStatus::Failed;
            message.next_attempt_at =
                Utc::now() + chrono::Duration::from_std(self.backoff.delay_after(message.attempts))
                    .unwrap_or_else(|_| chrono::Duration::seconds(3600));
            OutboxStatus::Failed
        };

        self.save(&message).await?;
        Ok(status)
    }

    async fn reclaim_stale(&self, grace: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::seconds(120));

        let mut reclaimed = 0;
        for mut message in self.list(Some(OutboxStatus::Sending)).await? {
            // A sending message was due when it was claimed; if that due
            // time is past the grace window the claimer is gone.
            if message.next_attempt_at < cutoff {
                warn!(id = %message.id, "Reclaiming message stuck in sending");
                message.status = OutboxStatus::Failed;
                message.next_attempt_at = Utc::now();
                message.last_error = Some("Reclaimed after stale sending state".to_string());
                self.save(&message).await?;
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            info!(count = reclaimed, "Reclaimed stale sending messages");
        }
        Ok(reclaimed)
    }

    async fn list(&self, status: Option<OutboxStatus>) -> Result<Vec<OutboxMessage>> {
        let mut messages = Vec::new();
        for key in self.storage.list_keys("outbox/").await? {
            if let Some(message) = self.storage.get::<OutboxMessage>(&key).await? {
                if status.is_none() || status == Some(message.status) {
                    messages.push(message);
                }
            }
        }
        Ok(messages)
    }
}

fn message_key(id: &str) -> String {
    format!("outbox/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coopnet_storage::MemoryStorage;
    use serde_json::json;

    fn store_with_backoff(base_secs: u64) -> StorageOutboxStore {
        StorageOutboxStore::new(
            Arc::new(MemoryStorage::new()),
            BackoffPolicy {
                base: Duration::from_secs(base_secs),
                max: Duration::from_secs(8 * base_secs.max(1)),
            },
        )
    }

    fn message(max_attempts: u32) -> OutboxMessage {
        OutboxMessage::new(
            "https://hub.example",
            "/federation/hub/notify",
            "POST",
            json!({"event": "member.joined"}),
            max_attempts,
        )
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = BackoffPolicy {
            base: Duration::from_secs(30),
            max: Duration::from_secs(120),
        };

        assert_eq!(policy.delay_after(1), Duration::from_secs(30));
        assert_eq!(policy.delay_after(2), Duration::from_secs(60));
        assert_eq!(policy.delay_after(3), Duration::from_secs(120));
        assert_eq!(policy.delay_after(10), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_resolution() {
        let store = store_with_backoff(30);
        let msg = message(3);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();

        let claimed = store.claim(&id).await.unwrap().unwrap();
        assert_eq!(claimed.status, OutboxStatus::Sending);
        assert_eq!(claimed.attempts, 1);

        // A second claim while sending yields nothing
        assert!(store.claim(&id).await.unwrap().is_none());

        // After a failure the message is claimable again
        store.mark_failed(&id, "connection refused").await.unwrap();
        assert!(store.claim(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failures_then_success_converge_to_sent() {
        let store = store_with_backoff(0);
        let msg = message(5);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();

        for _ in 0..3 {
            store.claim(&id).await.unwrap().unwrap();
            let status = store.mark_failed(&id, "HTTP 503").await.unwrap();
            assert_eq!(status, OutboxStatus::Failed);
        }

        store.claim(&id).await.unwrap().unwrap();
        store.mark_sent(&id).await.unwrap();

        let settled = store.get(&id).await.unwrap().unwrap();
        assert_eq!(settled.status, OutboxStatus::Sent);
        assert_eq!(settled.attempts, 4);
        assert!(settled.sent_at.is_some());
        assert!(settled.completed_at.is_some());
        assert!(settled.last_error.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_budget_dead_letters() {
        let store = store_with_backoff(0);
        let msg = message(2);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();

        store.claim(&id).await.unwrap().unwrap();
        assert_eq!(
            store.mark_failed(&id, "HTTP 500").await.unwrap(),
            OutboxStatus::Failed
        );

        store.claim(&id).await.unwrap().unwrap();
        assert_eq!(
            store.mark_failed(&id, "HTTP 500").await.unwrap(),
            OutboxStatus::Dead
        );

        let dead = store.get(&id).await.unwrap().unwrap();
        assert_eq!(dead.status, OutboxStatus::Dead);
        assert!(dead.completed_at.is_some());
        assert_eq!(dead.last_error.as_deref(), Some("HTTP 500"));

        // Dead messages are never claimable again
        assert!(store.claim(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_delay_is_future_and_grows() {
        let store = store_with_backoff(30);
        let msg = message(10);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();

        let mut last_delay = chrono::Duration::zero();
        for _ in 0..3 {
            // Force claimability regardless of the scheduled delay
            let mut m = store.get(&id).await.unwrap().unwrap();
            m.next_attempt_at = Utc::now();
            store.save(&m).await.unwrap();

            store.claim(&id).await.unwrap().unwrap();
            store.mark_failed(&id, "HTTP 503").await.unwrap();

            let m = store.get(&id).await.unwrap().unwrap();
            let delay = m.next_attempt_at - Utc::now();
            assert!(delay > chrono::Duration::zero());
            assert!(delay > last_delay);
            last_delay = delay;
        }
    }

    #[tokio::test]
    async fn test_due_is_ordered_and_bounded() {
        let store = store_with_backoff(30);

        let mut first = message(3);
        first.next_attempt_at = Utc::now() - chrono::Duration::seconds(60);
        let first_id = first.id.clone();

        let mut second = message(3);
        second.next_attempt_at = Utc::now() - chrono::Duration::seconds(30);

        let mut future = message(3);
        future.next_attempt_at = Utc::now() + chrono::Duration::seconds(600);

        store.enqueue(first).await.unwrap();
        store.enqueue(second).await.unwrap();
        store.enqueue(future).await.unwrap();

        let due = store.due(Utc::now(), 10).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, first_id);

        let limited = store.due(Utc::now(), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, first_id);
    }

    #[tokio::test]
    async fn test_stale_sending_is_reclaimed() {
        let store = store_with_backoff(30);
        let msg = message(3);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();

        // Simulate a crash mid-delivery: claimed long ago, never resolved
        let mut m = store.claim(&id).await.unwrap().unwrap();
        m.next_attempt_at = Utc::now() - chrono::Duration::seconds(600);
        store.save(&m).await.unwrap();

        let reclaimed = store.reclaim_stale(Duration::from_secs(120)).await.unwrap();
        assert_eq!(reclaimed, 1);

        let m = store.get(&id).await.unwrap().unwrap();
        assert_eq!(m.status, OutboxStatus::Failed);
        assert!(store.claim(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recent_sending_is_left_alone() {
        let store = store_with_backoff(30);
        let msg = message(3);
        let id = msg.id.clone();
        store.enqueue(msg).await.unwrap();
        store.claim(&id).await.unwrap().unwrap();

        let reclaimed = store.reclaim_stale(Duration::from_secs(120)).await.unwrap();
        assert_eq!(reclaimed, 0);
        assert_eq!(
            store.get(&id).await.unwrap().unwrap().status,
            OutboxStatus::Sending
        );
    }
}
