/// Geocoding client
///
/// Forward and reverse geocoding against a Nominatim-compatible service.
/// Both directions are timeout-bounded and identify the caller with a
/// fixed User-Agent (a provider usage-policy requirement). Forward
/// signals "no coordinates" rather than inventing any; reverse degrades
/// to the configured default city name.
use crate::{
    config::GeocodingConfig,
    error::{DropError, DropResult},
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

/// Geocoding contract
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Forward geocode a free-text query to coordinates; `None` on
    /// no-match or any failure.
    async fn forward(&self, query: &str) -> Option<(f64, f64)>;

    /// Reverse geocode coordinates to an area name; the default city
    /// name on failure or when the response has no usable address.
    async fn reverse(&self, lat: f64, lng: f64) -> String;
}

/// Nominatim-backed geocoder
pub struct NominatimClient {
    config: GeocodingConfig,
    default_name: String,
    http_client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(config: GeocodingConfig, default_name: String) -> DropResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DropError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            default_name,
            http_client,
        })
    }

    fn failure_reason(e: &reqwest::Error) -> &'static str {
        if e.is_timeout() {
            "timeout"
        } else {
            "network"
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn forward(&self, query: &str) -> Option<(f64, f64)> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.config.base_url,
            urlencoding::encode(query)
        );

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(reason = Self::failure_reason(&e), "Forward geocode failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            error!("Forward geocode returned status: {}", response.status());
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => parse_forward_reply(&body),
            Err(e) => {
                error!("Forward geocode reply unreadable: {}", e);
                None
            }
        }
    }

    async fn reverse(&self, lat: f64, lng: f64) -> String {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&zoom=16",
            self.config.base_url, lat, lng
        );

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(reason = Self::failure_reason(&e), "Reverse geocode failed: {}", e);
                return self.default_name.clone();
            }
        };

        if !response.status().is_success() {
            error!("Reverse geocode returned status: {}", response.status());
            return self.default_name.clone();
        }

        match response.json::<Value>().await {
            Ok(body) => pick_area_name(&body, &self.default_name),
            Err(e) => {
                error!("Reverse geocode reply unreadable: {}", e);
                self.default_name.clone()
            }
        }
    }
}

/// First match of a forward geocode reply; Nominatim encodes coordinates
/// as strings.
fn parse_forward_reply(body: &Value) -> Option<(f64, f64)> {
    let first = body.as_array()?.first()?;
    let lat = first["lat"].as_str()?.parse::<f64>().ok()?;
    let lng = first["lon"].as_str()?.parse::<f64>().ok()?;
    (lat.is_finite() && lng.is_finite()).then_some((lat, lng))
}

/// Preferred address field, most specific first
fn pick_area_name(body: &Value, default_name: &str) -> String {
    let address = &body["address"];
    for field in ["suburb", "neighbourhood", "city_district", "city"] {
        if let Some(name) = address[field].as_str() {
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    default_name.to_string()
}
