use async_trait::async_trait;
use crate::config::*;
use crate::error::{LLMError, Result};
use crate::providers::trait_impl::ChatProvider;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Chat provider for any endpoint speaking the OpenAI `chat/completions`
/// dialect (Zhipu GLM, OpenAI, most self-hosted gateways).
pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: Option<String>,
    client: Client,
    base_url: String,
    default_model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            name: name.into(),
            api_key: None,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: DEFAULT_CHAT_MODEL.to_string(),
        })
    }

    /// Empty keys count as unset.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn get_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| LLMError::MissingApiKey(self.name.clone()))
    }
}

/// Never log full keys.
fn key_prefix(api_key: &str) -> String {
    if api_key.chars().count() > 8 {
        api_key.chars().take(8).collect()
    } else {
        "***".to_string()
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let api_key = self.get_api_key()?;
        let body = json!({
            "model": self.default_model,
            "messages": request.messages.iter().map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            }).collect::<Vec<_>>(),
        });

        tracing::debug!(
            "Making chat request to {} with key {}...",
            self.name,
            key_prefix(api_key)
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = response.text().await?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| LLMError::InvalidResponse(format!("body is not JSON: {}", e)))?;

        let content = json
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|c| c.pointer("/message/content"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(ChatResponse { content })
    }
}
