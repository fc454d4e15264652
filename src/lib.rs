//! Coopnet - federation substrate for cooperative governance platforms
//!
//! Each instance owns a primary record store; cross-instance state moves
//! through signed HTTP calls and a replicated event stream. This crate
//! wires the substrate together: identifier resolution, the signed
//! request protocol, the firehose decoder, read-model indexers, the
//! outbox delivery pipeline and the topology-selected federation client.

pub mod config;
pub mod node;

pub use config::{NodeConfig, Topology};
pub use node::Node;

// Re-export the substrate crates under one roof
pub use coopnet_common as common;
pub use coopnet_crypto as crypto;
pub use coopnet_federation as federation;
pub use coopnet_firehose as firehose;
pub use coopnet_httpsig as httpsig;
pub use coopnet_identity as identity;
pub use coopnet_indexer as indexer;
pub use coopnet_outbox as outbox;
pub use coopnet_storage as storage;
