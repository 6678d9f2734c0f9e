/// Vision inference client
///
/// Asks a multimodal inference service to name the locality visible in a
/// photo. One attempt per invocation; retries, if any, belong to the
/// caller. Every failure mode carries a distinct reason code because the
/// resolver's fallback messaging depends on it.
use crate::{
    config::InferenceConfig,
    drops::models::Confidence,
    error::{DropError, DropResult},
};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::error;

/// A locality guess from the inference service
#[derive(Debug, Clone, PartialEq)]
pub struct AreaGuess {
    /// Named area, or empty when the reply carried nothing usable
    pub area: String,
    pub confidence: Confidence,
}

/// Inference failure reasons, each a distinct code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceFailure {
    ApiKeyMissing,
    RateLimited,
    Status(u16),
    Timeout,
    Network,
}

impl InferenceFailure {
    /// Stable reason code for logging and soft status reporting
    pub fn reason_code(&self) -> String {
        match self {
            InferenceFailure::ApiKeyMissing => "api_key_missing".to_string(),
            InferenceFailure::RateLimited => "rate_limited".to_string(),
            InferenceFailure::Status(code) => format!("status_{}", code),
            InferenceFailure::Timeout => "timeout".to_string(),
            InferenceFailure::Network => "network".to_string(),
        }
    }
}

/// Vision inference contract
#[async_trait]
pub trait VisionInference: Send + Sync {
    /// Whether the client has credentials to attempt inference at all.
    /// Unconfigured clients are skipped without a request.
    fn is_configured(&self) -> bool;

    /// One inference attempt for one image
    async fn infer(&self, image: &[u8], media_type: &str)
        -> Result<AreaGuess, InferenceFailure>;
}

/// Anthropic-messages-API-backed vision client
pub struct AnthropicVisionClient {
    config: InferenceConfig,
    city_name: String,
    http_client: reqwest::Client,
}

impl AnthropicVisionClient {
    pub fn new(config: InferenceConfig, city_name: String) -> DropResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DropError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            city_name,
            http_client,
        })
    }

    /// The instruction text is a contract the reply parser depends on;
    /// do not change one without the other.
    fn prompt(&self) -> String {
        format!(
            "This photo was taken somewhere in {city}. Based on any visual clues \
             (landmarks, signs, architecture, vegetation, road style, shops), identify \
             the most likely neighborhood or area of {city}.\n\n\
             Reply in this exact JSON format only, nothing else:\n\
             {{\"area\": \"area name\", \"confidence\": \"high/medium/low\"}}",
            city = self.city_name
        )
    }
}

#[async_trait]
impl VisionInference for AnthropicVisionClient {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn infer(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<AreaGuess, InferenceFailure> {
        let api_key = match &self.config.api_key {
            Some(key) => key,
            None => return Err(InferenceFailure::ApiKeyMissing),
        };

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.config.model,
            "max_tokens": 300,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": { "type": "base64", "media_type": media_type, "data": encoded }
                    },
                    { "type": "text", "text": self.prompt() }
                ]
            }]
        });

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("Inference request timed out after {}s", self.config.timeout_secs);
                    InferenceFailure::Timeout
                } else {
                    error!("Inference network error: {}", e);
                    InferenceFailure::Network
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            error!("Inference API returned {}: {}", status, err_body);
            if status.as_u16() == 429 {
                return Err(InferenceFailure::RateLimited);
            }
            return Err(InferenceFailure::Status(status.as_u16()));
        }

        let reply: serde_json::Value = response.json().await.map_err(|e| {
            error!("Inference reply was not valid JSON: {}", e);
            InferenceFailure::Network
        })?;

        let text = reply["content"][0]["text"].as_str().unwrap_or("").trim();
        Ok(parse_reply(text))
    }
}

#[derive(Deserialize)]
struct StructuredReply {
    area: Option<String>,
    confidence: Option<String>,
}

/// Parse the model's reply defensively.
///
/// Structured parse first; on failure strip JSON punctuation and treat
/// whatever text remains as the area name with confidence forced to low.
pub fn parse_reply(text: &str) -> AreaGuess {
    if let Ok(parsed) = serde_json::from_str::<StructuredReply>(text) {
        return AreaGuess {
            area: parsed.area.unwrap_or_default().trim().to_string(),
            confidence: parsed
                .confidence
                .map(|c| Confidence::parse_lenient(&c))
                .unwrap_or(Confidence::Low),
        };
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '"' | '{' | '}' | '\n'))
        .collect();
    AreaGuess {
        area: cleaned.trim().to_string(),
        confidence: Confidence::Low,
    }
}
