//! Record store abstraction for the Coopnet federation substrate
//!
//! Read models, the outbox, and the identifier registry all persist through
//! the same async key-value interface so deployments can swap the backing
//! store without touching the federation logic.

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use coopnet_common::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

pub use file::{FileStorage, StorageConfig};
pub use memory::MemoryStorage;

/// Storage interface for persistent data
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a value with the given key
    async fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Get a value by key
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a value by key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// List all keys with the given prefix, sorted
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Extension methods for Storage trait
#[async_trait]
pub trait StorageExt: Storage {
    /// Store a serializable value with the given key
    async fn put<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_vec(value)
            .map_err(|e| Error::serialization(format!("Failed to serialize value: {}", e)))?;
        self.put_bytes(key, &serialized).await
    }

    /// Get a deserialized value by key
    async fn get<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Result<Option<T>> {
        match self.get_bytes(key).await? {
            Some(data) => {
                let value = serde_json::from_slice(&data).map_err(|e| {
                    Error::deserialization(format!("Failed to deserialize value: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<T: Storage + ?Sized> StorageExt for T {}

/// Create an in-memory storage instance, used for standalone deployments
/// and tests
pub fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

/// Create a file-backed storage instance rooted at the configured directory
pub async fn file_storage(config: StorageConfig) -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(FileStorage::new(config).await?))
}
