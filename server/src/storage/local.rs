//! Local-disk object store

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ObjectStore, StorageError};

/// Object store backed by a directory on local disk.
///
/// Keys are flat file names of the form `<uuid>-<sha256 prefix>.<ext>`, so
/// repeated uploads of the same content still get distinct blobs while the
/// hash prefix keeps the content identifiable in logs.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Keys are flat file names; anything that could escape the root
    /// directory is rejected.
    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let digest = hex::encode(Sha256::digest(data));
        let ext = extension_of(original_name);
        let key = format!("{}-{}.{}", Uuid::new_v4(), &digest[..12], ext);

        let path = self.root.join(&key);
        tokio::fs::write(&path, data).await?;

        info!(
            key = %key,
            size = data.len(),
            sha256 = %&digest[..16],
            "stored original upload"
        );
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        tokio::fs::remove_file(self.root.join(key)).await?;
        debug!(key = %key, "removed stored upload");
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        if Self::validate_key(key).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.root.join(key))
            .await
            .unwrap_or(false)
    }
}

/// File extension for the stored blob, defaulting to `geojson` when the
/// original name has none.
fn extension_of(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "geojson".to_string())
}

/// Simple hex encoding for SHA256 hashes
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
