//! Payment-proof blob storage.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::ProofStore;

/// Errors that can occur when storing a proof.
#[derive(Debug, Error)]
pub enum ProofStoreError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key would escape the store.
    #[error("invalid proof key: {0}")]
    InvalidKey(String),
}

/// Keys are flat file names: `[A-Za-z0-9_-]` plus dots, no leading dot.
fn check_key(key: &str) -> Result<(), ProofStoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ProofStoreError::InvalidKey(key.to_owned()))
    }
}

/// Stores proofs as files in one directory.
#[derive(Debug, Clone)]
pub struct FsProofStore {
    dir: PathBuf,
}

impl FsProofStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a key is written to.
    ///
    /// # Errors
    ///
    /// Returns [`ProofStoreError::InvalidKey`] for keys that are not plain
    /// file names.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, ProofStoreError> {
        check_key(key)?;
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl ProofStore for FsProofStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ProofStoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(key, content_type, size = bytes.len(), "Stored payment proof");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ProofStoreError> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A stored proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProof {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Keeps proofs in memory. For tests and local development.
#[derive(Debug, Default)]
pub struct MemoryProofStore {
    blobs: RwLock<HashMap<String, StoredProof>>,
}

impl MemoryProofStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredProof> {
        self.blobs.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ProofStore for MemoryProofStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ProofStoreError> {
        check_key(key)?;
        self.blobs.write().await.insert(
            key.to_owned(),
            StoredProof {
                content_type: content_type.to_owned(),
                bytes,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ProofStoreError> {
        check_key(key)?;
        self.blobs.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(check_key("AB1234567-1700000000000.png").is_ok());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key(".hidden").is_err());
        assert!(check_key("").is_err());
    }

    #[tokio::test]
    async fn test_fs_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("orderflow-proofs-{}", uuid::Uuid::new_v4()));
        let store = FsProofStore::new(&dir);
        store
            .put("order-1.png", "image/png", b"png-bytes".to_vec())
            .await
            .unwrap();
        let written = tokio::fs::read(dir.join("order-1.png")).await.unwrap();
        assert_eq!(written, b"png-bytes");

        store.delete("order-1.png").await.unwrap();
        assert!(!dir.join("order-1.png").exists());
        store.delete("order-1.png").await.unwrap();
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryProofStore::new();
        store.put("k.jpeg", "image/jpeg", vec![1, 2, 3]).await.unwrap();
        let proof = store.get("k.jpeg").await.unwrap();
        assert_eq!(proof.content_type, "image/jpeg");
        assert_eq!(store.keys().await, vec!["k.jpeg"]);
        assert!(store.put("a/b", "image/png", Vec::new()).await.is_err());

        store.delete("k.jpeg").await.unwrap();
        assert!(store.keys().await.is_empty());
        assert!(store.delete("../k").await.is_err());
    }
}
