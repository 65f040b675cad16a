//! Persistent storage for original uploaded files
//!
//! Layers keep the extracted geometry in PostGIS; the raw uploaded GeoJSON
//! file is additionally kept as a blob so the master copy survives. Storage
//! failures are never fatal to layer creation.

pub mod local;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the object store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Blob storage for original uploads
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the raw bytes of an uploaded file under a collision-safe key
    /// derived from its content. Returns the key.
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Remove a previously stored blob.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> bool;
}

pub use local::LocalObjectStore;
