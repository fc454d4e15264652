//! Read-model indexers
//!
//! Consume decoded change events and idempotently upsert denormalized
//! local views. Events may be re-delivered and may arrive in either
//! order for two-sided records; every indexer tolerates both.

pub mod agreement;
pub mod membership;
pub mod notify;
pub mod profile;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coopnet_common::Result;
use coopnet_firehose::{ChangeEvent, EventSink};
use tracing::{debug, warn};

pub use agreement::{AgreementIndexer, AgreementSignatureView};
pub use membership::{MembershipIndexer, MembershipStatus, MembershipView};
pub use notify::{ChangeNotifier, Notification};
pub use profile::{CoopProfileView, ProfileIndexer};

/// Collection of membership requests, authored by the joining member
pub const COLLECTION_MEMBERSHIP_REQUEST: &str = "coop.membership.request";

/// Collection of membership approvals, authored by the cooperative
pub const COLLECTION_MEMBERSHIP_APPROVAL: &str = "coop.membership.approval";

/// Collection of agreement signature records
pub const COLLECTION_AGREEMENT_SIGNATURE: &str = "coop.agreement.signature";

/// Collection of cooperative profiles
pub const COLLECTION_PROFILE: &str = "coop.profile";

/// Materializes one or more record collections into a local view
#[async_trait]
pub trait RecordIndexer: Send + Sync {
    /// Collections this indexer consumes
    fn collections(&self) -> &'static [&'static str];

    /// Apply one decoded change event; must be idempotent
    async fn apply(&self, event: &ChangeEvent) -> Result<()>;
}

/// Routes change events to indexers by collection
pub struct IndexerDispatch {
    indexers: HashMap<&'static str, Arc<dyn RecordIndexer>>,
}

impl IndexerDispatch {
    /// Build a dispatch over the given indexers
    pub fn new(indexers: Vec<Arc<dyn RecordIndexer>>) -> Self {
        let mut by_collection = HashMap::new();
        for indexer in indexers {
            for collection in indexer.collections() {
                by_collection.insert(*collection, indexer.clone());
            }
        }
        Self {
            indexers: by_collection,
        }
    }

    /// Apply one event; unknown collections are skipped
    pub async fn apply(&self, event: &ChangeEvent) -> Result<()> {
        let collection = match event.collection() {
            Some(collection) => collection,
            None => {
                warn!(location = %event.location, "Event without a collection segment");
                return Ok(());
            }
        };

        match self.indexers.get(collection) {
            Some(indexer) => indexer.apply(event).await,
            None => {
                debug!(collection = %collection, "No indexer for collection");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl EventSink for IndexerDispatch {
    async fn handle(&self, event: ChangeEvent) -> Result<()> {
        self.apply(&event).await
    }
}
