//! Agreement signature materialization
//!
//! Signature records move through requested/signed/rejected/cancelled/
//! retracted states authored by either party. Rows are keyed on record
//! location and tombstoned on delete, never removed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coopnet_common::Result;
use coopnet_firehose::{ChangeAction, ChangeEvent};
use coopnet_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::notify::{ChangeNotifier, Notification};
use crate::{RecordIndexer, COLLECTION_AGREEMENT_SIGNATURE};

/// One materialized agreement signature row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementSignatureView {
    /// The agreement being signed
    pub agreement: String,
    /// The signing party
    pub signer_did: String,
    /// requested, signed, rejected, cancelled or retracted
    pub status: String,
    /// Record location this row materializes
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

/// Indexer for agreement signature records
pub struct AgreementIndexer {
    storage: Arc<dyn Storage>,
    notifier: Arc<ChangeNotifier>,
}

impl AgreementIndexer {
    /// Create an agreement indexer over the given storage
    pub fn new(storage: Arc<dyn Storage>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// Load a signature row by its record location
    pub async fn by_location(&self, location: &str) -> Result<Option<AgreementSignatureView>> {
        self.storage.get(&row_key(location)).await
    }

    /// All signature rows for an agreement, history included
    pub async fn for_agreement(&self, agreement: &str) -> Result<Vec<AgreementSignatureView>> {
        let mut rows = Vec::new();
        for key in self.storage.list_keys("agreements/rows/").await? {
            if let Some(row) = self.storage.get::<AgreementSignatureView>(&key).await? {
                if row.agreement == agreement {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl RecordIndexer for AgreementIndexer {
    fn collections(&self) -> &'static [&'static str] {
        &[COLLECTION_AGREEMENT_SIGNATURE]
    }

    async fn apply(&self, event: &ChangeEvent) -> Result<()> {
        match event.action {
            ChangeAction::Create | ChangeAction::Update => {
                let record = match &event.record {
                    Some(record) => record,
                    None => {
                        warn!(location = %event.location, "Signature record without payload");
                        return Ok(());
                    }
                };

                let agreement = record.get("agreement").and_then(|v| v.as_str());
                let signer = record.get("signer").and_then(|v| v.as_str());
                let (agreement, signer) = match (agreement, signer) {
                    (Some(a), Some(s)) => (a.to_string(), s.to_string()),
                    _ => {
                        warn!(location = %event.location, "Signature record missing agreement or signer");
                        return Ok(());
                    }
                };
                let status = record
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("requested")
                    .to_string();

                let existing: Option<AgreementSignatureView> =
                    self.storage.get(&row_key(&event.location)).await?;
                let changed = existing.as_ref().map(|r| r.status.as_str()) != Some(status.as_str());

                let row = AgreementSignatureView {
                    agreement: agreement.clone(),
                    signer_did: signer.clone(),
                    status: status.clone(),
                    location: event.location.clone(),
                    created_at: existing.map(|r| r.created_at).unwrap_or(event.time),
                    updated_at: event.time,
                    invalidated_at: None,
                };
                self.storage.put(&row_key(&event.location), &row).await?;

                if changed {
                    self.notifier.emit(Notification::AgreementSignature {
                        agreement,
                        signer_did: signer,
                        status,
                    });
                }
                Ok(())
            }
            ChangeAction::Delete => {
                if let Some(mut row) = self
                    .storage
                    .get::<AgreementSignatureView>(&row_key(&event.location))
                    .await?
                {
                    row.status = "retracted".to_string();
                    row.invalidated_at = Some(Utc::now());
                    row.updated_at = Utc::now();
                    self.storage.put(&row_key(&event.location), &row).await?;
                }
                Ok(())
            }
        }
    }
}

fn row_key(location: &str) -> String {
    format!("agreements/rows/{}", location.replace("://", "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::event;
    use coopnet_storage::MemoryStorage;
    use serde_json::json;

    const SIGNER: &str = "did:plc:member1";

    fn indexer() -> AgreementIndexer {
        AgreementIndexer::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(ChangeNotifier::new(16)),
        )
    }

    fn signature_event(seq: i64, action: ChangeAction, status: &str) -> ChangeEvent {
        let record = matches!(action, ChangeAction::Create | ChangeAction::Update).then(|| {
            json!({
                "$type": COLLECTION_AGREEMENT_SIGNATURE,
                "agreement": "agreement-1",
                "signer": SIGNER,
                "status": status,
                "createdAt": "2026-08-07T11:00:00Z",
            })
        });
        event(seq, SIGNER, action, COLLECTION_AGREEMENT_SIGNATURE, "sig1", record)
    }

    #[tokio::test]
    async fn test_signature_lifecycle() {
        let indexer = indexer();

        indexer
            .apply(&signature_event(1, ChangeAction::Create, "requested"))
            .await
            .unwrap();
        indexer
            .apply(&signature_event(2, ChangeAction::Update, "signed"))
            .await
            .unwrap();

        let rows = indexer.for_agreement("agreement-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "signed");
        assert_eq!(rows[0].signer_did, SIGNER);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let indexer = indexer();
        let event = signature_event(1, ChangeAction::Create, "requested");

        indexer.apply(&event).await.unwrap();
        indexer.apply(&event).await.unwrap();

        assert_eq!(indexer.for_agreement("agreement-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_tombstones_the_row() {
        let indexer = indexer();

        indexer
            .apply(&signature_event(1, ChangeAction::Create, "signed"))
            .await
            .unwrap();
        indexer
            .apply(&signature_event(2, ChangeAction::Delete, ""))
            .await
            .unwrap();

        let rows = indexer.for_agreement("agreement-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "retracted");
        assert!(rows[0].invalidated_at.is_some());
    }
}
