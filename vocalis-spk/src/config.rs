//! Configuration for speech synthesis

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

pub const DEFAULT_MIME: &str = "audio/mp3";

/// Speech section: the ordered provider chain plus shared defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Mime type reported when the winning provider declares none
    pub default_mime: String,

    /// Upper bound for a single provider attempt, in seconds
    pub attempt_timeout_secs: u64,

    /// Providers in preference order
    pub providers: Vec<SpeechProviderConfig>,
}

/// One entry of the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechProviderConfig {
    pub name: String,

    /// Full URL the request is POSTed to
    pub endpoint: Option<String>,

    /// Environment variable consulted when `endpoint` is unset
    pub endpoint_env: Option<String>,

    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset
    pub api_key_env: Option<String>,

    /// Skip the provider when no key is configured
    pub api_key_required: bool,

    pub request: RequestShape,

    pub response: ResponseShape,

    /// Mime type of the audio this provider returns, if known
    pub mime: Option<String>,
}

/// How the reply text is put on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestShape {
    /// `{ "model", "input", "voice", "response_format"? }`
    #[serde(rename = "openai_speech")]
    OpenAiSpeech {
        model: String,
        voice: String,
        #[serde(default)]
        response_format: Option<String>,
    },
    /// `{ "text" }`
    PlainText,
}

/// How the audio comes back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Raw audio bytes in the body
    Binary,
    /// `{ "audio": "<base64>", "mime"? }`
    JsonBase64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            default_mime: DEFAULT_MIME.to_string(),
            attempt_timeout_secs: 30,
            providers: SpeechProviderConfig::default_chain(),
        }
    }
}

impl Default for SpeechProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            endpoint: None,
            endpoint_env: None,
            api_key: None,
            api_key_env: None,
            api_key_required: true,
            request: RequestShape::PlainText,
            response: ResponseShape::Binary,
            mime: None,
        }
    }
}

impl SpeechProviderConfig {
    /// Zhipu CogTTS, billed together with the chat model.
    pub fn zhipu_cogtts() -> Self {
        Self {
            name: "zhipu-cogtts".to_string(),
            endpoint: Some("https://open.bigmodel.cn/api/paas/v4/audio/speech".to_string()),
            api_key_env: Some("ZHIPU_API_KEY".to_string()),
            request: RequestShape::OpenAiSpeech {
                model: "cogtts".to_string(),
                voice: "tongtong".to_string(),
                response_format: Some("wav".to_string()),
            },
            response: ResponseShape::Binary,
            mime: Some("audio/wav".to_string()),
            ..Self::default()
        }
    }

    /// Self-hosted endpoint answering with a base64 JSON envelope.
    pub fn custom_endpoint() -> Self {
        Self {
            name: "custom".to_string(),
            endpoint_env: Some("TTS_URL".to_string()),
            api_key_env: Some("TTS_API_KEY".to_string()),
            api_key_required: false,
            request: RequestShape::PlainText,
            response: ResponseShape::JsonBase64,
            ..Self::default()
        }
    }

    /// OpenAI speech, last resort.
    pub fn openai() -> Self {
        Self {
            name: "openai".to_string(),
            endpoint: Some("https://api.openai.com/v1/audio/speech".to_string()),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            request: RequestShape::OpenAiSpeech {
                model: "gpt-4o-mini-tts".to_string(),
                voice: "alloy".to_string(),
                response_format: None,
            },
            response: ResponseShape::Binary,
            ..Self::default()
        }
    }

    pub fn default_chain() -> Vec<Self> {
        vec![Self::zhipu_cogtts(), Self::custom_endpoint(), Self::openai()]
    }

    /// Fill `endpoint` and `api_key` from their `*_env` variables when unset.
    pub fn resolve_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_blank(&self.endpoint) {
            let from_env = self.endpoint_env.as_deref().and_then(&lookup);
            self.endpoint = match from_env.filter(|v| !v.trim().is_empty()) {
                Some(endpoint) => match check_endpoint(&self.name, &endpoint) {
                    Ok(()) => Some(endpoint),
                    Err(e) => {
                        warn!("{}, leaving it unconfigured", e);
                        None
                    }
                },
                None => None,
            };
        }
        if is_blank(&self.api_key) {
            self.api_key = self.api_key_env.as_deref().and_then(&lookup);
        }
        self.endpoint = self.endpoint.take().filter(|v| !v.trim().is_empty());
        self.api_key = self.api_key.take().filter(|v| !v.trim().is_empty());
    }

    /// True when the provider can be invoked without a guaranteed failure.
    pub fn is_configured(&self) -> bool {
        !is_blank(&self.endpoint) && (!self.api_key_required || !is_blank(&self.api_key))
    }

    /// Validate the descriptor
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Speech provider name cannot be empty".to_string());
        }

        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            check_endpoint(&self.name, endpoint)?;
        }

        if let Some(mime) = &self.mime {
            if !mime.contains('/') {
                return Err(format!("Speech provider '{}' has an invalid mime type", self.name));
            }
        }

        if let RequestShape::OpenAiSpeech { model, voice, .. } = &self.request {
            if model.trim().is_empty() || voice.trim().is_empty() {
                return Err(format!(
                    "Speech provider '{}' needs both a model and a voice",
                    self.name
                ));
            }
        }

        Ok(())
    }
}

impl SpeechConfig {
    /// Resolve every provider's `*_env` references.
    pub fn resolve_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for provider in &mut self.providers {
            provider.resolve_env(&lookup);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_mime.contains('/') {
            return Err("Default mime type must look like 'audio/<format>'".to_string());
        }

        if self.attempt_timeout_secs == 0 {
            return Err("Speech attempt timeout must be greater than 0".to_string());
        }

        if self.attempt_timeout_secs > 300 {
            return Err("Speech attempt timeout too large (max 300 seconds)".to_string());
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen.insert(provider.name.as_str()) {
                return Err(format!("Duplicate speech provider name '{}'", provider.name));
            }
        }

        Ok(())
    }
}

fn check_endpoint(name: &str, endpoint: &str) -> Result<(), String> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| format!("Speech provider '{}' has an invalid endpoint: {}", name, e))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(format!("Speech provider '{}' endpoint must use http or https", name));
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
