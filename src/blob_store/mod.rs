/// Blob Storage System
///
/// Durable binary storage for uploaded images, keyed by generated
/// filename. Supports multiple backend implementations (disk today,
/// object storage later).

pub mod disk;
pub mod store;

pub use store::{BlobStore, StoredImage};

use crate::error::DropResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob data.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store a blob under the given filename
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> DropResult<()>;

    /// Retrieve a blob by filename
    async fn get(&self, name: &str) -> DropResult<Option<Vec<u8>>>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> DropResult<bool>;
}

/// Configuration for blob storage
#[derive(Debug, Clone)]
pub struct BlobStorageConfig {
    /// Backend type
    pub backend: BlobBackendType,

    /// Maximum blob size in bytes
    pub max_blob_size: usize,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackendType::Disk {
                location: PathBuf::from("./data/uploads"),
            },
            max_blob_size: 15 * 1024 * 1024, // 15 MiB
        }
    }
}

/// Backend types for blob storage
#[derive(Debug, Clone)]
pub enum BlobBackendType {
    /// Store blobs on local disk
    Disk { location: PathBuf },
}
