//! Durable outbound delivery pipeline
//!
//! Federation messages that must propagate to other instances are queued
//! here and drained by a background poller that signs and sends each one,
//! moving it through a retry/backoff/dead-letter state machine. Delivery
//! is decoupled from the original caller: failures drive retries, never
//! surface back to request handling.

pub mod agent;
pub mod message;
pub mod store;

pub use agent::{DeliveryAgent, DeliveryConfig};
pub use message::{OutboxMessage, OutboxStatus};
pub use store::{BackoffPolicy, OutboxStore, StorageOutboxStore};
