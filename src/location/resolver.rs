/// Location resolver
///
/// Orchestrates EXIF extraction, vision inference, and geocoding into a
/// single resolved location. First reliable signal wins; every failure
/// degrades to the next strategy and the chain always terminates with a
/// usable location. Nothing here ever surfaces a hard error to the
/// caller.
use crate::{
    blob_store::BlobStore,
    config::ResolverConfig,
    drops::models::{validate_coordinates, Confidence, ResolvedLocation},
    location::{exif, Geocoder, VisionInference},
};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// Soft outcome flag for UI messaging; never a hard failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStatus {
    Ok,
    Fallback { reason: String },
}

/// A resolved location plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub location: ResolvedLocation,
    pub status: ResolveStatus,
}

/// Main location resolver
pub struct LocationResolver {
    config: ResolverConfig,
    blob_store: BlobStore,
    vision: Arc<dyn VisionInference>,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(
        config: ResolverConfig,
        blob_store: BlobStore,
        vision: Arc<dyn VisionInference>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            config,
            blob_store,
            vision,
            geocoder,
        }
    }

    /// Resolve a location for uploaded image bytes.
    ///
    /// Order: embedded GPS metadata, then vision inference (which
    /// uploads the image as a side effect, since the inference call
    /// already required the bytes), then the jittered city-center
    /// terminal fallback.
    pub async fn resolve_image(
        &self,
        data: &[u8],
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Resolution {
        // Embedded GPS is the strongest automatic signal and needs no
        // upload side effect.
        if let Some((lat, lng)) = exif::extract_gps(data) {
            if validate_coordinates(lat, lng).is_ok() {
                info!(lat, lng, "Resolved location from embedded GPS");
                let location_name = self.geocoder.reverse(lat, lng).await;
                return Resolution {
                    location: ResolvedLocation {
                        lat,
                        lng,
                        location_name,
                        confidence: Confidence::High,
                        image_path: None,
                    },
                    status: ResolveStatus::Ok,
                };
            }
            warn!(lat, lng, "Ignoring out-of-range embedded GPS coordinates");
        }

        if !self.vision.is_configured() {
            return self.terminal_fallback("api_key_missing");
        }

        // The bytes are already in hand for inference, so store them now
        // and hand the path back so the caller can skip re-uploading.
        let image_path = match self
            .blob_store
            .store_image(data.to_vec(), original_name, content_type)
            .await
        {
            Ok(stored) => Some(stored.image_path),
            Err(e) => {
                warn!("Image store failed during resolution, continuing without: {}", e);
                None
            }
        };

        let media_type = media_type_for(original_name, content_type);
        match self.vision.infer(data, &media_type).await {
            Ok(guess) => {
                let named_area = !guess.area.is_empty() && guess.area != self.config.city_name;
                if named_area {
                    let query = format!("{}, {}", guess.area, self.config.city_name);
                    if let Some((lat, lng)) = self.geocoder.forward(&query).await {
                        info!(area = %guess.area, "Resolved location via vision inference");
                        return Resolution {
                            location: ResolvedLocation {
                                lat,
                                lng,
                                location_name: guess.area,
                                confidence: guess.confidence,
                                image_path,
                            },
                            status: ResolveStatus::Ok,
                        };
                    }
                    // Named but unlocatable: keep the name, land near the
                    // center so the drop still shows somewhere sensible.
                    let (lat, lng) = self.jittered_center();
                    return Resolution {
                        location: ResolvedLocation {
                            lat,
                            lng,
                            location_name: guess.area,
                            confidence: guess.confidence,
                            image_path,
                        },
                        status: ResolveStatus::Fallback {
                            reason: "geocode_no_match".to_string(),
                        },
                    };
                }

                let (lat, lng) = self.jittered_center();
                Resolution {
                    location: ResolvedLocation {
                        lat,
                        lng,
                        location_name: self.config.city_name.clone(),
                        confidence: guess.confidence,
                        image_path,
                    },
                    status: ResolveStatus::Ok,
                }
            }
            Err(failure) => {
                let reason = failure.reason_code();
                warn!(reason = %reason, "Vision inference failed, falling back");
                let mut resolution = self.terminal_fallback(&reason);
                resolution.location.image_path = image_path;
                resolution
            }
        }
    }

    /// Resolve a manually pinned coordinate.
    ///
    /// A supplied name is taken verbatim, with no geocoding round trip;
    /// otherwise the point is reverse-geocoded for a label.
    pub async fn resolve_manual(
        &self,
        lat: f64,
        lng: f64,
        name: Option<&str>,
    ) -> Resolution {
        let location_name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(supplied) => supplied.to_string(),
            None => self.geocoder.reverse(lat, lng).await,
        };

        Resolution {
            location: ResolvedLocation {
                lat,
                lng,
                location_name,
                confidence: Confidence::High,
                image_path: None,
            },
            status: ResolveStatus::Ok,
        }
    }

    /// Last-resort location: the configured city center with a small
    /// random jitter so repeated unresolved drops don't stack.
    pub fn terminal_fallback(&self, reason: &str) -> Resolution {
        let (lat, lng) = self.jittered_center();
        Resolution {
            location: ResolvedLocation {
                lat,
                lng,
                location_name: self.config.city_name.clone(),
                confidence: Confidence::None,
                image_path: None,
            },
            status: ResolveStatus::Fallback {
                reason: reason.to_string(),
            },
        }
    }

    fn jittered_center(&self) -> (f64, f64) {
        let mut rng = rand::thread_rng();
        let spread = self.config.jitter_degrees;
        (
            self.config.city_center_lat + (rng.gen::<f64>() - 0.5) * 2.0 * spread,
            self.config.city_center_lng + (rng.gen::<f64>() - 0.5) * 2.0 * spread,
        )
    }
}

/// Media type for the inference payload: explicit content type first,
/// then the filename extension.
fn media_type_for(original_name: Option<&str>, content_type: Option<&str>) -> String {
    if let Some(ct) = content_type.filter(|ct| !ct.is_empty()) {
        return ct.to_string();
    }
    let ext = original_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_else(|| "jpeg".to_string());
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{BlobBackendType, BlobStorageConfig};
    use crate::location::vision::{AreaGuess, InferenceFailure};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StubVision {
        configured: bool,
        reply: Result<AreaGuess, InferenceFailure>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VisionInference for StubVision {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn infer(
            &self,
            _image: &[u8],
            _media_type: &str,
        ) -> Result<AreaGuess, InferenceFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct StubGeocoder {
        forward_result: Option<(f64, f64)>,
        forward_calls: AtomicUsize,
        reverse_calls: AtomicUsize,
    }

    impl StubGeocoder {
        fn new(forward_result: Option<(f64, f64)>) -> Self {
            Self {
                forward_result,
                forward_calls: AtomicUsize::new(0),
                reverse_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn forward(&self, _query: &str) -> Option<(f64, f64)> {
            self.forward_calls.fetch_add(1, Ordering::SeqCst);
            self.forward_result
        }

        async fn reverse(&self, _lat: f64, _lng: f64) -> String {
            self.reverse_calls.fetch_add(1, Ordering::SeqCst);
            "Reverse Result".to_string()
        }
    }

    fn test_config() -> ResolverConfig {
        ResolverConfig {
            city_name: "Bangalore".to_string(),
            city_center_lat: 12.9716,
            city_center_lng: 77.5946,
            jitter_degrees: 0.025,
        }
    }

    fn test_resolver(
        vision: Arc<StubVision>,
        geocoder: Arc<StubGeocoder>,
    ) -> (LocationResolver, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let blob_store = BlobStore::new(BlobStorageConfig {
            backend: BlobBackendType::Disk {
                location: dir.path().to_path_buf(),
            },
            max_blob_size: 1024 * 1024,
        });
        (
            LocationResolver::new(test_config(), blob_store, vision, geocoder),
            dir,
        )
    }

    fn unconfigured_vision() -> Arc<StubVision> {
        Arc::new(StubVision {
            configured: false,
            reply: Err(InferenceFailure::ApiKeyMissing),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_manual_pin_with_name_skips_geocoding() {
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, _dir) = test_resolver(unconfigured_vision(), Arc::clone(&geocoder));

        let resolution = resolver
            .resolve_manual(12.98, 77.64, Some("Cubbon Park"))
            .await;

        assert_eq!(resolution.location.lat, 12.98);
        assert_eq!(resolution.location.lng, 77.64);
        assert_eq!(resolution.location.location_name, "Cubbon Park");
        assert_eq!(resolution.location.confidence, Confidence::High);
        assert_eq!(resolution.status, ResolveStatus::Ok);
        assert_eq!(geocoder.forward_calls.load(Ordering::SeqCst), 0);
        assert_eq!(geocoder.reverse_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_manual_pin_without_name_reverse_geocodes() {
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, _dir) = test_resolver(unconfigured_vision(), Arc::clone(&geocoder));

        let resolution = resolver.resolve_manual(12.98, 77.64, None).await;

        assert_eq!(resolution.location.location_name, "Reverse Result");
        assert_eq!(geocoder.reverse_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_gps_unconfigured_vision_lands_near_center() {
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, dir) = test_resolver(unconfigured_vision(), geocoder);

        let resolution = resolver
            .resolve_image(b"not a real image", Some("photo.jpg"), None)
            .await;

        let config = test_config();
        assert!((resolution.location.lat - config.city_center_lat).abs() <= config.jitter_degrees);
        assert!((resolution.location.lng - config.city_center_lng).abs() <= config.jitter_degrees);
        assert_eq!(resolution.location.confidence, Confidence::None);
        assert_eq!(
            resolution.status,
            ResolveStatus::Fallback {
                reason: "api_key_missing".to_string()
            }
        );

        // Unconfigured inference means no upload side effect at all
        assert!(resolution.location.image_path.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_consecutive_terminal_fallbacks_differ() {
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, _dir) = test_resolver(unconfigured_vision(), geocoder);

        let first = resolver.terminal_fallback("timeout");
        let second = resolver.terminal_fallback("timeout");

        assert_ne!(
            (first.location.lat, first.location.lng),
            (second.location.lat, second.location.lng)
        );
    }

    #[tokio::test]
    async fn test_vision_guess_forward_geocoded() {
        let vision = Arc::new(StubVision {
            configured: true,
            reply: Ok(AreaGuess {
                area: "Indiranagar".to_string(),
                confidence: Confidence::Medium,
            }),
            calls: AtomicUsize::new(0),
        });
        let geocoder = Arc::new(StubGeocoder::new(Some((12.9784, 77.6408))));
        let (resolver, _dir) = test_resolver(Arc::clone(&vision), Arc::clone(&geocoder));

        let resolution = resolver
            .resolve_image(b"image bytes", Some("photo.jpg"), None)
            .await;

        assert_eq!(resolution.location.lat, 12.9784);
        assert_eq!(resolution.location.lng, 77.6408);
        assert_eq!(resolution.location.location_name, "Indiranagar");
        assert_eq!(resolution.location.confidence, Confidence::Medium);
        assert_eq!(resolution.status, ResolveStatus::Ok);
        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
        assert_eq!(geocoder.forward_calls.load(Ordering::SeqCst), 1);

        // Vision path uploads the image and reports the path back
        assert!(resolution
            .location
            .image_path
            .as_deref()
            .is_some_and(|p| p.starts_with("/uploads/")));
    }

    #[tokio::test]
    async fn test_vision_guess_without_geocode_match_jitters_center() {
        let vision = Arc::new(StubVision {
            configured: true,
            reply: Ok(AreaGuess {
                area: "Somewhere Obscure".to_string(),
                confidence: Confidence::Low,
            }),
            calls: AtomicUsize::new(0),
        });
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, _dir) = test_resolver(vision, geocoder);

        let resolution = resolver
            .resolve_image(b"image bytes", Some("photo.jpg"), None)
            .await;

        let config = test_config();
        assert!((resolution.location.lat - config.city_center_lat).abs() <= config.jitter_degrees);
        assert_eq!(resolution.location.location_name, "Somewhere Obscure");
        assert_eq!(
            resolution.status,
            ResolveStatus::Fallback {
                reason: "geocode_no_match".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_vision_failure_reason_propagates_to_status() {
        let vision = Arc::new(StubVision {
            configured: true,
            reply: Err(InferenceFailure::Timeout),
            calls: AtomicUsize::new(0),
        });
        let geocoder = Arc::new(StubGeocoder::new(None));
        let (resolver, _dir) = test_resolver(vision, geocoder);

        let resolution = resolver
            .resolve_image(b"image bytes", Some("photo.jpg"), None)
            .await;

        assert_eq!(resolution.location.confidence, Confidence::None);
        assert_eq!(
            resolution.status,
            ResolveStatus::Fallback {
                reason: "timeout".to_string()
            }
        );
        // The upload happened before inference, so the path survives
        assert!(resolution.location.image_path.is_some());
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Some("a.jpg"), None), "image/jpeg");
        assert_eq!(media_type_for(Some("a.PNG"), None), "image/png");
        assert_eq!(media_type_for(None, None), "image/jpeg");
        assert_eq!(media_type_for(Some("a.png"), Some("image/webp")), "image/webp");
    }
}
