//! In-memory storage backend

use std::collections::BTreeMap;

use async_trait::async_trait;
use coopnet_common::Result;
use tokio::sync::RwLock;

use crate::Storage;

/// In-memory storage, keyed lexicographically
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageExt;

    #[tokio::test]
    async fn test_basic_operations() {
        let storage = MemoryStorage::new();

        storage.put_bytes("a/1", b"one").await.unwrap();
        assert_eq!(storage.get_bytes("a/1").await.unwrap().unwrap(), b"one");
        assert!(storage.exists("a/1").await.unwrap());

        storage.delete("a/1").await.unwrap();
        assert!(!storage.exists("a/1").await.unwrap());
        assert!(storage.get_bytes("a/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keys_is_prefix_scoped_and_sorted() {
        let storage = MemoryStorage::new();

        storage.put_bytes("m/2", b"x").await.unwrap();
        storage.put_bytes("m/1", b"x").await.unwrap();
        storage.put_bytes("n/1", b"x").await.unwrap();

        let keys = storage.list_keys("m/").await.unwrap();
        assert_eq!(keys, vec!["m/1".to_string(), "m/2".to_string()]);
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let storage = MemoryStorage::new();

        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Row {
            id: String,
            n: u32,
        }

        let row = Row {
            id: "abc".into(),
            n: 7,
        };
        storage.put("rows/abc", &row).await.unwrap();
        let back: Row = storage.get("rows/abc").await.unwrap().unwrap();
        assert_eq!(back, row);
    }
}
