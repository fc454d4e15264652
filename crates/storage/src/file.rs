//! File-backed storage backend
//!
//! Keys map to paths under the configured base directory. Keys are expected
//! to be `/`-separated relative paths; callers own key hygiene.

use std::path::PathBuf;

use async_trait::async_trait;
use coopnet_common::{Error, Result};
use tokio::fs;

use crate::Storage;

/// Configuration for file-backed storage
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for storage
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
        }
    }
}

/// File-based storage implementation
pub struct FileStorage {
    config: StorageConfig,
}

impl FileStorage {
    /// Create a new file storage instance
    pub async fn new(config: StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_dir)
            .await
            .map_err(|e| Error::internal(format!("Failed to create storage directory: {}", e)))?;
        Ok(Self { config })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.config.base_dir.join(key)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::internal(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&path, value)
            .await
            .map_err(|e| Error::internal(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::internal(format!("Failed to delete file: {}", e))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).exists())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut stack = vec![self.config.base_dir.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::internal(format!("Failed to list keys: {}", e))),
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.config.base_dir) {
                    if let Some(key) = rel.to_str() {
                        if key.starts_with(prefix) {
                            keys.push(key.to_string());
                        }
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
