//! Event-stream wire decoder for the Coopnet federation substrate
//!
//! Turns binary firehose frames into structured change events, optionally
//! resolving full record payloads from the embedded content-addressed
//! block container.

pub mod car;
pub mod consumer;
pub mod decoder;
pub mod event;
pub mod frame;

#[cfg(test)]
pub(crate) mod testutil;

pub use consumer::{EventSink, FirehoseConsumer};
pub use decoder::{decode_frame, decode_frame_with_records};
pub use event::{ChangeAction, ChangeEvent};
