/// Drop record model and validation helpers
use crate::error::{DropError, DropResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_SUFFIX_LEN: usize = 6;
const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A persisted drop record.
///
/// Created exactly once on a successful upload, never updated in place,
/// never deleted. Serde aliases keep the struct readable for records in
/// the legacy aggregate layout, which used `twitterHandle` and sometimes
/// omitted `visitorId` entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drop {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub location_name: String,
    #[serde(default, alias = "twitterHandle")]
    pub contributor_handle: String,
    #[serde(default)]
    pub visitor_id: String,
    pub image_path: String,
    pub timestamp: DateTime<Utc>,
    /// Transient partial-success flag: the image persisted but the
    /// record write failed after retries. Never stored as true.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsaved: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Coarse reliability label for a resolved location, derived from which
/// resolution strategy produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Parse the value reported by the inference service; anything
    /// unrecognized degrades to low rather than failing.
    pub fn parse_lenient(s: &str) -> Confidence {
        match s.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            "none" => Confidence::None,
            _ => Confidence::Low,
        }
    }
}

/// Ephemeral output of the location resolver, consumed immediately by
/// the drop service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lng: f64,
    pub location_name: String,
    pub confidence: Confidence,
    /// Set when the vision path already uploaded the image, so the
    /// caller can skip re-uploading.
    pub image_path: Option<String>,
}

/// Generate a fresh drop id: `{unix_millis}-{6 lowercase alphanumerics}`
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ID_CHARSET.len());
            ID_CHARSET[idx] as char
        })
        .collect();
    format!("{}-{}", millis, suffix)
}

/// Validate a coordinate pair: both finite, lat in [-90, 90], lng in
/// [-180, 180]. Runs before any storage write.
pub fn validate_coordinates(lat: f64, lng: f64) -> DropResult<()> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(DropError::Validation(
            "Invalid location data. Please try again.".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(DropError::Validation(format!(
            "Coordinates out of range: ({}, {})",
            lat, lng
        )));
    }
    Ok(())
}

/// Normalize a contributor handle: strip a leading sigil and surrounding
/// whitespace. May legitimately end up empty.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_string()
}
