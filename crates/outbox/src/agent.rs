//! Background delivery agent
//!
//! Polls the outbox on a fixed interval (and once at startup), claims due
//! messages, signs and sends each one, and settles the outcome. The
//! processing guard keeps poll cycles from overlapping; the store's
//! atomic claim is the per-message concurrency boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use coopnet_common::Result;
use coopnet_identity::Keystore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::message::{OutboxMessage, OutboxStatus};
use crate::store::OutboxStore;

/// Longest error-body excerpt captured into `last_error`
const ERROR_EXCERPT_LEN: usize = 512;

/// Delivery agent configuration
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Poll interval
    pub poll_interval: Duration,
    /// Most messages processed per poll cycle
    pub batch_size: usize,
    /// How long a message may sit in `sending` before it is reclaimed
    pub sending_grace: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 20,
            sending_grace: Duration::from_secs(120),
        }
    }
}

/// Drains the outbox and delivers messages as signed requests
pub struct DeliveryAgent {
    store: Arc<dyn OutboxStore>,
    keystore: Arc<Keystore>,
    instance_did: String,
    key_fragment: String,
    client: reqwest::Client,
    config: DeliveryConfig,
    processing: AtomicBool,
}

impl DeliveryAgent {
    /// Create a delivery agent signing as the given instance identifier
    pub fn new(
        store: Arc<dyn OutboxStore>,
        keystore: Arc<Keystore>,
        instance_did: String,
        config: DeliveryConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            keystore,
            instance_did,
            key_fragment: coopnet_identity::FEDERATION_KEY_FRAGMENT.to_string(),
            client: reqwest::Client::new(),
            config,
            processing: AtomicBool::new(false),
        })
    }

    /// Spawn the poll loop; ticks immediately, then on the interval
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.poll_interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.tick().await {
                    error!(error = %e, "Outbox poll cycle failed");
                }
            }
        })
    }

    /// Run one poll cycle
    ///
    /// A cycle that finds another cycle in flight returns immediately.
    pub async fn tick(&self) -> Result<()> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Skipping poll cycle, previous cycle still running");
            return Ok(());
        }

        let result = self.drain().await;
        self.processing.store(false, Ordering::SeqCst);
        result
    }

    async fn drain(&self) -> Result<()> {
        self.store.reclaim_stale(self.config.sending_grace).await?;

        let due = self
            .store
            .due(chrono::Utc::now(), self.config.batch_size)
            .await?;
        if due.is_empty() {
            return Ok(());
        }
        debug!(count = due.len(), "Delivering due outbox messages");

        for message in due {
            let claimed = match self.store.claim(&message.id).await? {
                Some(claimed) => claimed,
                None => continue,
            };

            match self.deliver(&claimed).await {
                Ok(()) => {
                    self.store.mark_sent(&claimed.id).await?;
                    info!(id = %claimed.id, url = %claimed.delivery_url(), "Delivered outbox message");
                }
                Err(reason) => {
                    let status = self.store.mark_failed(&claimed.id, &reason).await?;
                    match status {
                        OutboxStatus::Dead => {
                            error!(
                                id = %claimed.id,
                                url = %claimed.delivery_url(),
                                attempts = claimed.attempts,
                                reason = %reason,
                                "Outbox message dead-lettered, operator attention required"
                            );
                        }
                        _ => {
                            warn!(
                                id = %claimed.id,
                                attempts = claimed.attempts,
                                reason = %reason,
                                "Delivery failed, scheduled for retry"
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Attempt one signed delivery; any failure is reduced to a reason
    /// string for `last_error`
    async fn deliver(&self, message: &OutboxMessage) -> std::result::Result<(), String> {
        let url = message.delivery_url();
        let body = serde_json::to_vec(&message.payload)
            .map_err(|e| format!("Unserializable payload: {}", e))?;

        let keypair = self
            .keystore
            .signing_key(&self.instance_did)
            .await
            .map_err(|e| format!("Signing key unavailable: {}", e))?;
        let key_id = format!("{}#{}", self.instance_did, self.key_fragment);

        let signed_headers = coopnet_httpsig::sign(
            &message.http_method,
            &url,
            Some(&body),
            &keypair,
            &key_id,
        )
        .map_err(|e| format!("Signing failed: {}", e))?;

        let method = reqwest::Method::from_bytes(message.http_method.as_bytes())
            .map_err(|e| format!("Invalid HTTP method: {}", e))?;

        let mut request = self
            .client
            .request(method, &url)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in signed_headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let excerpt: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(ERROR_EXCERPT_LEN)
            .collect();
        Err(format!("HTTP {}: {}", status.as_u16(), excerpt))
    }
}
