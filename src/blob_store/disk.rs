/// Disk-based blob storage backend
use crate::{
    blob_store::BlobBackend,
    error::{DropError, DropResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores blobs on the local filesystem with directory sharding based on
/// a filename prefix to prevent too many files in one directory.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a filename
    ///
    /// Filenames are `{unix_millis}-{suffix}.{ext}`; the leading digits
    /// cluster by era, so the shard is taken from the random suffix:
    /// {base}/{first 2 chars after the dash}/{name}.
    fn blob_path(&self, name: &str) -> PathBuf {
        // Filenames arrive from request paths too, so slice on char
        // boundaries; anything that doesn't fit goes to the catch-all.
        let shard = name
            .split_once('-')
            .and_then(|(_, rest)| rest.get(0..2))
            .unwrap_or("_");
        self.base_path.join(shard).join(name)
    }

    /// Ensure the directory for a blob exists
    async fn ensure_blob_dir(&self, name: &str) -> DropResult<PathBuf> {
        let blob_path = self.blob_path(name);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DropError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })?;
        }
        Ok(blob_path)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, name: &str, data: Vec<u8>, _content_type: &str) -> DropResult<()> {
        let blob_path = self.ensure_blob_dir(name).await?;

        fs::write(&blob_path, data)
            .await
            .map_err(|e| DropError::BlobStorage(format!("Failed to write blob {}: {}", name, e)))?;

        Ok(())
    }

    async fn get(&self, name: &str) -> DropResult<Option<Vec<u8>>> {
        let blob_path = self.blob_path(name);

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DropError::BlobStorage(format!(
                "Failed to read blob {}: {}",
                name, e
            ))),
        }
    }

    async fn exists(&self, name: &str) -> DropResult<bool> {
        Ok(self.blob_path(name).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let name = "1700000000000-abc123.jpg";
        let data = b"test blob data".to_vec();

        backend.put(name, data.clone(), "image/jpeg").await.unwrap();

        let retrieved = backend.get(name).await.unwrap();
        assert_eq!(retrieved, Some(data));
    }

    #[tokio::test]
    async fn test_get_nonexistent_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let result = backend.get("1700000000000-nope.jpg").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_exists_tracks_stored_blobs() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let name = "1700000000000-here99.png";
        assert!(!backend.exists(name).await.unwrap());

        backend.put(name, b"stored".to_vec(), "image/png").await.unwrap();
        assert!(backend.exists(name).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        // Shard comes from the random suffix, not the timestamp prefix
        let path = backend.blob_path("1700000000000-xy1234.jpg");
        assert!(path.to_string_lossy().contains("/xy/"));

        // Degenerate names fall into the catch-all shard
        let odd = backend.blob_path("noformat");
        assert!(odd.to_string_lossy().contains("/_/"));
    }

    #[tokio::test]
    async fn test_multibyte_names_shard_without_panicking() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        // A multibyte char straddling the shard cut must not panic
        let path = backend.blob_path("1-✓a.jpg");
        assert!(path.to_string_lossy().contains("/_/"));

        assert_eq!(backend.get("1-✓a.jpg").await.unwrap(), None);
        assert!(!backend.exists("1-✓a.jpg").await.unwrap());

        // Multibyte chars clear of the cut shard normally
        let path = backend.blob_path("1-ab✓.jpg");
        assert!(path.to_string_lossy().contains("/ab/"));
    }
}
