/// Application context and dependency injection
use crate::{
    blob_store::{BlobBackendType, BlobStorageConfig, BlobStore},
    config::{BlobstoreConfig, ServerConfig},
    drops::{DropQueryService, DropService},
    error::{DropError, DropResult},
    location::{AnthropicVisionClient, LocationResolver, NominatimClient},
    record_store::{sqlite::SqliteRecordBackend, RecordStore},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub blob_store: BlobStore,
    pub resolver: Arc<LocationResolver>,
    pub drop_service: Arc<DropService>,
    pub query_service: Arc<DropQueryService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> DropResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize record storage
        let record_backend = SqliteRecordBackend::connect(&config.storage.record_db).await?;
        let record_store = RecordStore::new(Arc::new(record_backend));

        // Initialize blob storage
        let BlobstoreConfig::Disk { location } = &config.storage.blobstore;
        let blob_store = BlobStore::new(BlobStorageConfig {
            backend: BlobBackendType::Disk {
                location: location.clone(),
            },
            max_blob_size: config.service.max_image_bytes,
        });

        // Initialize the location resolution chain
        let vision = AnthropicVisionClient::new(
            config.inference.clone(),
            config.resolver.city_name.clone(),
        )?;
        if config.inference.api_key.is_none() {
            tracing::info!(
                "No inference API key configured; photo resolution will fall back to the map center"
            );
        }
        let geocoder = NominatimClient::new(
            config.geocoding.clone(),
            config.resolver.city_name.clone(),
        )?;
        let resolver = Arc::new(LocationResolver::new(
            config.resolver.clone(),
            blob_store.clone(),
            Arc::new(vision),
            Arc::new(geocoder),
        ));

        // Initialize drop services
        let drop_service = Arc::new(DropService::new(blob_store.clone(), record_store.clone()));
        let query_service = Arc::new(DropQueryService::new(record_store));

        Ok(Self {
            config: Arc::new(config),
            blob_store,
            resolver,
            drop_service,
            query_service,
        })
    }

    /// Ensure all required directories exist
    async fn ensure_directories(config: &ServerConfig) -> DropResult<()> {
        let mut dirs = vec![config.storage.data_directory.clone()];

        if let Some(parent) = config.storage.record_db.parent() {
            dirs.push(parent.to_path_buf());
        }

        let BlobstoreConfig::Disk { location } = &config.storage.blobstore;
        dirs.push(location.clone());

        for dir in dirs {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                    DropError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }
}
