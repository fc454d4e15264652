//! Long-lived firehose consumption
//!
//! Reads discrete frames from a channel, decodes them and pushes the
//! resulting events into a sink. Decode failures drop the frame and the
//! consumer keeps running.

use std::sync::Arc;

use async_trait::async_trait;
use coopnet_common::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::decoder::decode_frame_with_records;
use crate::event::ChangeEvent;

/// Receives decoded change events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Handle one decoded event
    async fn handle(&self, event: ChangeEvent) -> Result<()>;
}

/// Consumer task over a frame channel
pub struct FirehoseConsumer {
    sink: Arc<dyn EventSink>,
}

impl FirehoseConsumer {
    /// Create a consumer pushing events into the given sink
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Spawn the consumption loop; runs until the channel closes
    pub fn spawn(self, mut frames: mpsc::Receiver<Vec<u8>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let events = match decode_frame_with_records(&frame) {
                    Ok(events) => events,
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed frame");
                        continue;
                    }
                };

                for event in events {
                    if let Err(e) = self.sink.handle(event).await {
                        warn!(error = %e, "Event sink failed, continuing");
                    }
                }
            }
            info!("Firehose channel closed, consumer stopping");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_commit_frame, build_container, build_frame, RawOp};
    use tokio::sync::Mutex;

    struct CollectingSink {
        events: Mutex<Vec<ChangeEvent>>,
    }

    #[async_trait]
    impl EventSink for CollectingSink {
        async fn handle(&self, event: ChangeEvent) -> Result<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_consumer_survives_malformed_frames() {
        let sink = Arc::new(CollectingSink {
            events: Mutex::new(Vec::new()),
        });
        let consumer = FirehoseConsumer::new(sink.clone());
        let (tx, rx) = mpsc::channel(8);
        let handle = consumer.spawn(rx);

        // Malformed frame, then a skippable frame, then a real commit
        tx.send(vec![0x00, 0xff]).await.unwrap();
        tx.send(build_frame(1, Some("#identity"), &serde_json::json!({})))
            .await
            .unwrap();

        let (_, container) = build_container(&[]);
        tx.send(build_commit_frame(
            1,
            "did:plc:member1",
            vec![RawOp {
                action: "delete".to_string(),
                path: "coop.membership.request/rkey1".to_string(),
                cid: None,
            }],
            container,
        ))
        .await
        .unwrap();

        drop(tx);
        handle.await.unwrap();

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "did:plc:member1");
    }
}
