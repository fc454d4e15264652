//! Cooperative profile materialization

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coopnet_common::Result;
use coopnet_firehose::{ChangeAction, ChangeEvent};
use coopnet_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{RecordIndexer, COLLECTION_PROFILE};

/// One materialized cooperative profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoopProfileView {
    /// Identifier of the cooperative
    pub did: String,
    pub name: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Indexer for cooperative profile records, keyed on author identifier
pub struct ProfileIndexer {
    storage: Arc<dyn Storage>,
}

impl ProfileIndexer {
    /// Create a profile indexer over the given storage
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Load a profile by cooperative identifier
    pub async fn get(&self, did: &str) -> Result<Option<CoopProfileView>> {
        let profile: Option<CoopProfileView> = self.storage.get(&row_key(did)).await?;
        Ok(profile.filter(|p| p.deleted_at.is_none()))
    }

    /// Case-insensitive substring search over name and description
    pub async fn search(&self, query: &str) -> Result<Vec<CoopProfileView>> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();

        for key in self.storage.list_keys("profiles/").await? {
            if let Some(profile) = self.storage.get::<CoopProfileView>(&key).await? {
                if profile.deleted_at.is_some() {
                    continue;
                }
                let haystack = format!(
                    "{} {}",
                    profile.name.to_lowercase(),
                    profile.description.as_deref().unwrap_or("").to_lowercase()
                );
                if haystack.contains(&needle) {
                    matches.push(profile);
                }
            }
        }

        Ok(matches)
    }
}

#[async_trait]
impl RecordIndexer for ProfileIndexer {
    fn collections(&self) -> &'static [&'static str] {
        &[COLLECTION_PROFILE]
    }

    async fn apply(&self, event: &ChangeEvent) -> Result<()> {
        match event.action {
            ChangeAction::Create | ChangeAction::Update => {
                let record = match &event.record {
                    Some(record) => record,
                    None => {
                        warn!(location = %event.location, "Profile record without payload");
                        return Ok(());
                    }
                };

                let name = match record.get("name").and_then(|v| v.as_str()) {
                    Some(name) => name.to_string(),
                    None => {
                        warn!(location = %event.location, "Profile record without a name");
                        return Ok(());
                    }
                };

                let profile = CoopProfileView {
                    did: event.author.clone(),
                    name,
                    description: record
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    updated_at: event.time,
                    deleted_at: None,
                };
                self.storage.put(&row_key(&event.author), &profile).await
            }
            ChangeAction::Delete => {
                if let Some(mut profile) = self
                    .storage
                    .get::<CoopProfileView>(&row_key(&event.author))
                    .await?
                {
                    profile.deleted_at = Some(Utc::now());
                    self.storage.put(&row_key(&event.author), &profile).await?;
                }
                Ok(())
            }
        }
    }
}

fn row_key(did: &str) -> String {
    format!("profiles/{}", did)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::event;
    use serde_json::json;
    use coopnet_storage::MemoryStorage;

    const COOP: &str = "did:web:coop.example";

    fn indexer() -> ProfileIndexer {
        ProfileIndexer::new(Arc::new(MemoryStorage::new()))
    }

    fn profile_event(seq: i64, action: ChangeAction, name: &str) -> ChangeEvent {
        let record = matches!(action, ChangeAction::Create | ChangeAction::Update).then(|| {
            json!({
                "$type": COLLECTION_PROFILE,
                "name": name,
                "description": "A worker cooperative for solar installs",
            })
        });
        event(seq, COOP, action, COLLECTION_PROFILE, "self", record)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let indexer = indexer();

        indexer
            .apply(&profile_event(1, ChangeAction::Create, "Solar Co-op"))
            .await
            .unwrap();
        indexer
            .apply(&profile_event(2, ChangeAction::Update, "Solar Workers Co-op"))
            .await
            .unwrap();

        let profile = indexer.get(COOP).await.unwrap().unwrap();
        assert_eq!(profile.name, "Solar Workers Co-op");
    }

    #[tokio::test]
    async fn test_search_matches_name_and_description() {
        let indexer = indexer();
        indexer
            .apply(&profile_event(1, ChangeAction::Create, "Solar Co-op"))
            .await
            .unwrap();

        assert_eq!(indexer.search("solar").await.unwrap().len(), 1);
        assert_eq!(indexer.search("installs").await.unwrap().len(), 1);
        assert!(indexer.search("bakery").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_hides_profile() {
        let indexer = indexer();
        indexer
            .apply(&profile_event(1, ChangeAction::Create, "Solar Co-op"))
            .await
            .unwrap();
        indexer
            .apply(&profile_event(2, ChangeAction::Delete, ""))
            .await
            .unwrap();

        assert!(indexer.get(COOP).await.unwrap().is_none());
        assert!(indexer.search("solar").await.unwrap().is_empty());
    }
}
