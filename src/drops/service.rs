/// Drop Service — the write path
///
/// Validates upload input, persists the image, builds the drop record,
/// and writes it with bounded retries. When the record write fails after
/// the image is already durable, the caller still gets the fully-formed
/// drop flagged as unsaved (partial success) rather than losing it.
use crate::{
    blob_store::BlobStore,
    drops::models::{self, Drop},
    error::{DropError, DropResult},
    record_store::RecordStore,
    retry::{retry_with_backoff, RetryPolicy},
};
use chrono::Utc;
use tracing::error;

/// Placeholder label when no location name was resolved
const DEFAULT_LOCATION_NAME: &str = "Unknown";

/// Fresh image bytes from the client
#[derive(Debug, Clone)]
pub struct UploadImage {
    pub data: Vec<u8>,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
}

/// Input to the write path, already parsed off the wire
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Fresh bytes; preferred when present
    pub image: Option<UploadImage>,
    /// Path materialized by a prior resolver step, used when no fresh
    /// bytes are supplied
    pub existing_image_path: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub location_name: String,
    pub contributor_handle: String,
    pub visitor_id: String,
}

/// Main drop service
#[derive(Clone)]
pub struct DropService {
    blob_store: BlobStore,
    record_store: RecordStore,
    retry_policy: RetryPolicy,
}

impl DropService {
    pub fn new(blob_store: BlobStore, record_store: RecordStore) -> Self {
        Self {
            blob_store,
            record_store,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Create a drop from an upload.
    ///
    /// Returns the persisted drop, or a drop with `unsaved` set when the
    /// record store stayed down through the whole retry budget while the
    /// image itself was already stored.
    pub async fn upload(&self, request: UploadRequest) -> DropResult<Drop> {
        models::validate_coordinates(request.lat, request.lng)?;

        let image_path = self.materialize_image(&request).await?;

        let location_name = if request.location_name.trim().is_empty() {
            DEFAULT_LOCATION_NAME.to_string()
        } else {
            request.location_name.trim().to_string()
        };

        let mut drop = Drop {
            id: models::generate_id(),
            lat: request.lat,
            lng: request.lng,
            location_name,
            contributor_handle: models::normalize_handle(&request.contributor_handle),
            visitor_id: request.visitor_id.trim().to_string(),
            image_path,
            timestamp: Utc::now(),
            unsaved: false,
        };

        let json = serde_json::to_string(&drop)
            .map_err(|e| DropError::Internal(format!("Failed to serialize drop: {}", e)))?;

        let write = retry_with_backoff(self.retry_policy, "record_put", || {
            let store = self.record_store.clone();
            let id = drop.id.clone();
            let json = json.clone();
            async move { store.put_drop(&id, &json).await }
        })
        .await;

        if let Err(e) = write {
            // The image is already durable; hand the drop back so the
            // user at least sees it in their session.
            error!(drop_id = %drop.id, "Record write failed after retries: {}", e);
            drop.unsaved = true;
        }

        Ok(drop)
    }

    /// Resolve the image reference for this upload: store fresh bytes,
    /// or accept a path from a prior resolver step.
    async fn materialize_image(&self, request: &UploadRequest) -> DropResult<String> {
        if let Some(image) = request.image.as_ref().filter(|img| !img.data.is_empty()) {
            let stored = self
                .blob_store
                .store_image(
                    image.data.clone(),
                    image.original_name.as_deref(),
                    image.content_type.as_deref(),
                )
                .await?;
            return Ok(stored.image_path);
        }

        if let Some(path) = request
            .existing_image_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let filename = path.strip_prefix("/uploads/").ok_or_else(|| {
                DropError::Validation("Invalid existing image path.".to_string())
            })?;
            if !self.blob_store.exists(filename).await? {
                return Err(DropError::Validation(
                    "Referenced image does not exist.".to_string(),
                ));
            }
            return Ok(path.to_string());
        }

        Err(DropError::Validation(
            "No image provided. Please select a photo to upload.".to_string(),
        ))
    }
}
