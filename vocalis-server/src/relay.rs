//! Relay core: one chat completion, then the speech fallback chain.

use crate::error::{RelayError, Result};
use crate::settings::Settings;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vocalis_llm::{ChatProvider, LLMError, OpenAiCompatibleProvider};
use vocalis_spk::{SpeechChain, SpeechResult, DEFAULT_MIME};

/// Inbound user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Accept any JSON body; `message` must be a string.
    pub fn from_json(body: &Value) -> Result<Self> {
        body.get("message")
            .and_then(Value::as_str)
            .map(Self::new)
            .ok_or(RelayError::InvalidMessage)
    }

    fn validated(&self) -> Result<&str> {
        if self.message.trim().is_empty() {
            return Err(RelayError::InvalidMessage);
        }
        Ok(&self.message)
    }
}

/// What the presentation layer renders. `audio` is base64 or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub text: String,
    pub audio: Option<String>,
    pub mime: String,
}

pub struct Relay {
    chat: Arc<dyn ChatProvider>,
    speech: SpeechChain,
    system_prompt: String,
    fallback_reply: String,
    default_mime: String,
    credential_hint: String,
}

impl Relay {
    pub fn new(chat: Arc<dyn ChatProvider>, speech: SpeechChain) -> Self {
        let defaults = crate::settings::ChatSettings::default();
        let credential_hint = defaults.credential_hint();
        Self {
            chat,
            speech,
            system_prompt: defaults.system_prompt,
            fallback_reply: defaults.fallback_reply,
            default_mime: DEFAULT_MIME.to_string(),
            credential_hint,
        }
    }

    /// Build the chat provider and speech chain described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let chat = OpenAiCompatibleProvider::new(
            "chat",
            settings.chat.endpoint.clone(),
            Duration::from_secs(settings.chat.timeout_secs),
        )
        .map_err(|e| RelayError::Setup(e.to_string()))?
        .with_api_key(settings.chat.api_key.clone())
        .with_model(settings.chat.model.clone());

        let speech = SpeechChain::from_config(&settings.speech)
            .map_err(|e| RelayError::Setup(e.to_string()))?;

        Ok(Self::new(Arc::new(chat), speech)
            .with_system_prompt(settings.chat.system_prompt.clone())
            .with_fallback_reply(settings.chat.fallback_reply.clone())
            .with_default_mime(settings.speech.default_mime.clone())
            .with_credential_hint(settings.chat.credential_hint()))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    pub fn with_default_mime(mut self, mime: impl Into<String>) -> Self {
        self.default_mime = mime.into();
        self
    }

    pub fn with_credential_hint(mut self, hint: impl Into<String>) -> Self {
        self.credential_hint = hint.into();
        self
    }

    pub fn chat_configured(&self) -> bool {
        self.chat.has_api_key()
    }

    /// Speech providers that will be attempted, in order.
    pub fn speech_providers(&self) -> Vec<String> {
        self.speech.available_engines()
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<RelayResponse> {
        let message = request.validated()?;

        if !self.chat.has_api_key() {
            error!("Chat provider {} has no API key configured", self.chat.name());
            return Err(self.missing_credential());
        }

        let reply = self.complete(message).await?;
        let speech = self.speech.synthesize(&reply).await;
        if speech.is_none() {
            info!("No speech provider produced audio, replying with text only");
        }

        Ok(self.package(reply, speech))
    }

    async fn complete(&self, message: &str) -> Result<String> {
        let request = vocalis_llm::ChatRequest::single_turn(&self.system_prompt, message);

        match self.chat.chat(request).await {
            Ok(response) => match response.content.filter(|c| !c.trim().is_empty()) {
                Some(content) => Ok(content),
                None => {
                    warn!("Chat provider returned no reply content, using fallback reply");
                    Ok(self.fallback_reply.clone())
                }
            },
            Err(LLMError::InvalidResponse(detail)) => {
                warn!("Chat provider returned a malformed body ({}), using fallback reply", detail);
                Ok(self.fallback_reply.clone())
            }
            Err(LLMError::Upstream { status, body }) => {
                error!("Chat provider error: HTTP {} {}", status, body);
                Err(RelayError::ChatProviderFailed {
                    status,
                    detail: body,
                })
            }
            Err(LLMError::MissingApiKey(_)) => Err(self.missing_credential()),
            Err(e) => {
                error!("Chat request failed: {}", e);
                Err(RelayError::Internal(e.to_string()))
            }
        }
    }

    fn package(&self, text: String, speech: Option<SpeechResult>) -> RelayResponse {
        match speech {
            Some(result) => RelayResponse {
                text,
                audio: Some(general_purpose::STANDARD.encode(&result.audio)),
                mime: result.mime.unwrap_or_else(|| self.default_mime.clone()),
            },
            None => RelayResponse {
                text,
                audio: None,
                mime: self.default_mime.clone(),
            },
        }
    }

    fn missing_credential(&self) -> RelayError {
        RelayError::MissingCredential {
            hint: self.credential_hint.clone(),
        }
    }
}
