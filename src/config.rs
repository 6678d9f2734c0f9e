/// Configuration management for the Petaldrop server
use crate::error::{DropError, DropResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub geocoding: GeocodingConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Maximum accepted image upload size in bytes
    pub max_image_bytes: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub record_db: PathBuf,
    pub blobstore: BlobstoreConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobstoreConfig {
    Disk { location: PathBuf },
}

/// Vision inference configuration
///
/// The API key is optional; when absent the vision fallback is skipped
/// entirely and resolution proceeds to the manual-pin path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Geocoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// Fixed client identifier sent as User-Agent (provider usage policy)
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Location resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// City the map is scoped to; used in the vision prompt and as the
    /// reverse-geocode fallback name
    pub city_name: String,
    pub city_center_lat: f64,
    pub city_center_lng: f64,
    /// Maximum jitter applied per axis when a drop lands on the default center
    pub jitter_degrees: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DropResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PETAL_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("PETAL_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| DropError::Validation("Invalid port number".to_string()))?;
        let max_image_bytes = env::var("PETAL_MAX_IMAGE_BYTES")
            .unwrap_or_else(|_| (15 * 1024 * 1024).to_string())
            .parse()
            .unwrap_or(15 * 1024 * 1024);

        let data_directory: PathBuf = env::var("PETAL_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let record_db = env::var("PETAL_RECORD_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("records.sqlite"));
        let blobstore = BlobstoreConfig::Disk {
            location: env::var("PETAL_BLOBSTORE_DISK_LOCATION")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_directory.join("uploads")),
        };

        let inference = InferenceConfig {
            api_key: env::var("PETAL_ANTHROPIC_API_KEY").ok(),
            api_url: env::var("PETAL_INFERENCE_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            model: env::var("PETAL_INFERENCE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            timeout_secs: env::var("PETAL_INFERENCE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "25".to_string())
                .parse()
                .unwrap_or(25),
        };

        let geocoding = GeocodingConfig {
            base_url: env::var("PETAL_GEOCODING_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            user_agent: env::var("PETAL_GEOCODING_USER_AGENT")
                .unwrap_or_else(|_| "Petaldrop/0.1".to_string()),
            timeout_secs: env::var("PETAL_GEOCODING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
        };

        let resolver = ResolverConfig {
            city_name: env::var("PETAL_CITY_NAME").unwrap_or_else(|_| "Bangalore".to_string()),
            city_center_lat: env::var("PETAL_CITY_CENTER_LAT")
                .unwrap_or_else(|_| "12.9716".to_string())
                .parse()
                .unwrap_or(12.9716),
            city_center_lng: env::var("PETAL_CITY_CENTER_LNG")
                .unwrap_or_else(|_| "77.5946".to_string())
                .parse()
                .unwrap_or(77.5946),
            jitter_degrees: env::var("PETAL_JITTER_DEGREES")
                .unwrap_or_else(|_| "0.025".to_string())
                .parse()
                .unwrap_or(0.025),
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                max_image_bytes,
            },
            storage: StorageConfig {
                data_directory,
                record_db,
                blobstore,
            },
            inference,
            geocoding,
            resolver,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> DropResult<()> {
        if self.service.hostname.is_empty() {
            return Err(DropError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.service.max_image_bytes == 0 {
            return Err(DropError::Validation(
                "Image size cap must be non-zero".to_string(),
            ));
        }

        if !(-90.0..=90.0).contains(&self.resolver.city_center_lat)
            || !(-180.0..=180.0).contains(&self.resolver.city_center_lng)
        {
            return Err(DropError::Validation(
                "City center coordinates out of range".to_string(),
            ));
        }

        if self.resolver.jitter_degrees < 0.0 {
            return Err(DropError::Validation(
                "Jitter must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
