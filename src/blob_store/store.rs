/// Blob Store Manager
///
/// Coordinates blob storage backends, generating filenames for uploaded
/// images and enforcing the size cap before any write is attempted.
use crate::{
    blob_store::{disk::DiskBlobBackend, BlobBackend, BlobBackendType, BlobStorageConfig},
    error::{DropError, DropResult},
};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;

const FILENAME_SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Reference to a stored image
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    /// Generated storage filename, e.g. `1700000000000-k3x9qa.jpg`
    pub filename: String,
    /// Public path for the record, e.g. `/uploads/1700000000000-k3x9qa.jpg`
    pub image_path: String,
    pub content_type: String,
}

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStorageConfig,
    backend: Arc<dyn BlobBackend>,
}

impl BlobStore {
    /// Create a new blob store
    pub fn new(config: BlobStorageConfig) -> Self {
        let backend: Arc<dyn BlobBackend> = match &config.backend {
            BlobBackendType::Disk { location } => {
                Arc::new(DiskBlobBackend::new(location.clone()))
            }
        };

        Self { config, backend }
    }

    /// Create a blob store over an explicit backend (used by tests)
    pub fn with_backend(config: BlobStorageConfig, backend: Arc<dyn BlobBackend>) -> Self {
        Self { config, backend }
    }

    /// Store uploaded image bytes under a freshly generated filename.
    ///
    /// Filenames are time-prefixed with a random suffix and the original
    /// extension lower-cased; there is no content-based dedup.
    pub async fn store_image(
        &self,
        data: Vec<u8>,
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> DropResult<StoredImage> {
        self.check_size(data.len())?;

        let ext = extension_of(original_name);
        let filename = generate_filename(&ext);
        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .map(String::from)
            .unwrap_or_else(|| content_type_for_extension(&ext).to_string());

        self.backend.put(&filename, data, &content_type).await?;

        Ok(StoredImage {
            image_path: format!("/uploads/{}", filename),
            filename,
            content_type,
        })
    }

    /// Retrieve a stored image with its content type (derived from the
    /// filename extension, which is authoritative for serving).
    pub async fn open(&self, filename: &str) -> DropResult<Option<(Vec<u8>, String)>> {
        let data = self.backend.get(filename).await?;
        Ok(data.map(|bytes| {
            let ext = extension_of(Some(filename));
            (bytes, content_type_for_extension(&ext).to_string())
        }))
    }

    /// Check whether a stored image exists
    pub async fn exists(&self, filename: &str) -> DropResult<bool> {
        self.backend.exists(filename).await
    }

    /// Reject data over the configured cap before any storage write
    pub fn check_size(&self, len: usize) -> DropResult<()> {
        if len > self.config.max_blob_size {
            return Err(DropError::PayloadTooLarge(format!(
                "Image is {} bytes; limit is {} bytes",
                len, self.config.max_blob_size
            )));
        }
        Ok(())
    }
}

/// Generate a `{unix_millis}-{rand6}.{ext}` filename
pub fn generate_filename(ext: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..FILENAME_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET[idx] as char
        })
        .collect();
    format!("{}-{}.{}", millis, suffix, ext)
}

/// Lower-cased extension of an original filename, defaulting to jpg
fn extension_of(name: Option<&str>) -> String {
    name.and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string())
}

/// Content type for a filename extension
fn content_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store(max: usize) -> (BlobStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = BlobStorageConfig {
            backend: BlobBackendType::Disk {
                location: dir.path().to_path_buf(),
            },
            max_blob_size: max,
        };
        (BlobStore::new(config), dir)
    }

    #[tokio::test]
    async fn test_store_and_open_image() {
        let (store, _dir) = test_store(1024);

        let stored = store
            .store_image(b"jpeg bytes".to_vec(), Some("Photo.JPG"), None)
            .await
            .unwrap();

        assert!(stored.filename.ends_with(".jpg"));
        assert_eq!(stored.image_path, format!("/uploads/{}", stored.filename));
        assert_eq!(stored.content_type, "image/jpeg");

        let (data, content_type) = store.open(&stored.filename).await.unwrap().unwrap();
        assert_eq!(data, b"jpeg bytes");
        assert_eq!(content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_oversized_image_rejected_without_write() {
        let (store, dir) = test_store(8);

        let result = store
            .store_image(vec![0u8; 16], Some("big.png"), None)
            .await;
        assert!(matches!(result, Err(DropError::PayloadTooLarge(_))));

        // Nothing landed on disk
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_extension_defaults_to_jpg() {
        let (store, _dir) = test_store(1024);

        let stored = store
            .store_image(b"bytes".to_vec(), Some("noext"), None)
            .await
            .unwrap();
        assert!(stored.filename.ends_with(".jpg"));

        let stored = store.store_image(b"bytes".to_vec(), None, None).await.unwrap();
        assert!(stored.filename.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_explicit_content_type_wins() {
        let (store, _dir) = test_store(1024);

        let stored = store
            .store_image(b"bytes".to_vec(), Some("pic.bin"), Some("image/webp"))
            .await
            .unwrap();
        assert_eq!(stored.content_type, "image/webp");
    }

    #[test]
    fn test_generated_filenames_are_distinct() {
        let a = generate_filename("jpg");
        let b = generate_filename("jpg");
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }

    #[test]
    fn test_extension_lowercased() {
        assert_eq!(extension_of(Some("IMG_0042.HEIC")), "heic");
        assert_eq!(extension_of(Some("a.b.PNG")), "png");
        assert_eq!(extension_of(Some("trailingdot.")), "jpg");
    }
}
