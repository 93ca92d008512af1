//! HTTP speech engine driven by a provider descriptor
//! (endpoint, request shape, response decoder).

use crate::config::{RequestShape, ResponseShape, SpeechProviderConfig};
use crate::engines::{SpeechEngine, SpeechResult};
use crate::error::SpeechError;
use async_trait::async_trait;
use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig},
        DecodePaddingMode,
    },
    Engine as _,
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const MAX_TEXT_BYTES: usize = 100_000;

/// Standard alphabet; padding optional, as browsers accept in `data:` URLs.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

impl RequestShape {
    /// JSON body sent to the provider for `text`.
    pub fn body(&self, text: &str) -> Value {
        match self {
            RequestShape::OpenAiSpeech {
                model,
                voice,
                response_format,
            } => {
                let mut body = json!({
                    "model": model,
                    "input": text,
                    "voice": voice,
                });
                if let Some(format) = response_format {
                    body["response_format"] = json!(format);
                }
                body
            }
            RequestShape::PlainText => json!({ "text": text }),
        }
    }
}

impl ResponseShape {
    /// Turn a successful response body into audio.
    pub fn decode(&self, body: Bytes) -> Result<SpeechResult, SpeechError> {
        match self {
            ResponseShape::Binary => {
                if body.is_empty() {
                    return Err(SpeechError::Decode("empty audio body".to_string()));
                }
                Ok(SpeechResult {
                    audio: body,
                    mime: None,
                })
            }
            ResponseShape::JsonBase64 => {
                let envelope: Value = serde_json::from_slice(&body)
                    .map_err(|e| SpeechError::Decode(format!("body is not JSON: {}", e)))?;

                let encoded = envelope
                    .get("audio")
                    .and_then(Value::as_str)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| SpeechError::Decode("missing audio field".to_string()))?;

                // MIME-style line wrapping is tolerated
                let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                let audio = LENIENT_BASE64
                    .decode(compact)
                    .map_err(|e| SpeechError::Decode(format!("invalid base64 audio: {}", e)))?;

                if audio.is_empty() {
                    return Err(SpeechError::Decode("empty audio payload".to_string()));
                }

                let mime = envelope
                    .get("mime")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);

                Ok(SpeechResult {
                    audio: Bytes::from(audio),
                    mime,
                })
            }
        }
    }
}

/// API speech engine
pub struct ApiSpeechEngine {
    name: String,
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    api_key_required: bool,
    request: RequestShape,
    response: ResponseShape,
    mime: Option<String>,
}

impl ApiSpeechEngine {
    /// Build an engine from an already env-resolved descriptor
    pub fn from_config(config: &SpeechProviderConfig, timeout: Duration) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::Engine(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name.clone(),
            client,
            endpoint: config
                .endpoint
                .as_ref()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            api_key_required: config.api_key_required,
            request: config.request.clone(),
            response: config.response,
            mime: config.mime.clone(),
        })
    }
}

#[async_trait]
impl SpeechEngine for ApiSpeechEngine {
    async fn synthesize(&self, text: &str) -> Result<SpeechResult, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        if text.len() > MAX_TEXT_BYTES {
            return Err(SpeechError::Engine("Text too long (max 100KB)".to_string()));
        }

        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| SpeechError::Config(format!("{} has no endpoint", self.name)))?;

        if self.api_key_required && self.api_key.is_none() {
            return Err(SpeechError::Config(format!("{} API key not provided", self.name)));
        }

        let mut request = self.client.post(endpoint).json(&self.request.body(text));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!("Requesting speech from {} ({} chars)", self.name, text.chars().count());

        let response = request
            .send()
            .await
            .map_err(|e| SpeechError::Engine(format!("{} request failed: {}", self.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SpeechError::Api {
                provider: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to read audio response: {}", e)))?;

        let mut result = self.response.decode(body)?;
        if result.mime.is_none() {
            result.mime = self.mime.clone();
        }
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && (!self.api_key_required || self.api_key.is_some())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
