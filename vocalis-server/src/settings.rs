// Layered runtime configuration: defaults, optional file, environment

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;
use vocalis_llm::{DEFAULT_CHAT_MODEL, ZHIPU_BASE_URL};
use vocalis_spk::SpeechConfig;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_NAME: &str = "vocalis";

pub const ENV_PREFIX: &str = "VOCALIS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub chat: ChatSettings,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatSettings {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended)
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub model: String,
    pub system_prompt: String,
    /// Reply used when the provider answers without usable content
    pub fallback_reply: String,
    pub timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: ZHIPU_BASE_URL.to_string(),
            api_key: None,
            api_key_env: Some("ZHIPU_API_KEY".to_string()),
            model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: "你是一个有帮助的中文助手。".to_string(),
            fallback_reply: "抱歉，我暂时无法回答。".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ChatSettings {
    /// Operator-facing instruction for a missing chat key.
    pub fn credential_hint(&self) -> String {
        match &self.api_key_env {
            Some(var) => format!(
                "Set {} (or {}__CHAT__API_KEY) in the server environment and restart",
                var, ENV_PREFIX
            ),
            None => format!(
                "Set chat.api_key in the config file (or {}__CHAT__API_KEY) and restart",
                ENV_PREFIX
            ),
        }
    }
}

/// Command-line values; they take precedence over every other source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Settings {
    /// Load from the process environment.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, overrides, |name| std::env::var(name).ok())
    }

    /// Load, resolving `PORT` and every `*_env` reference through `lookup`.
    ///
    /// An explicit `path` must exist; the default `vocalis.*` file is optional.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_with_overrides(path, &Overrides::default(), lookup)
    }

    pub fn load_with_overrides<F>(
        path: Option<&Path>,
        overrides: &Overrides,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let mut settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", lookup("PORT"))?
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .build()?
            .try_deserialize()?;

        settings.resolve_env(&lookup);
        settings.validate().map_err(ConfigError::Message)?;
        Ok(settings)
    }

    pub fn resolve_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.chat.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.chat.api_key = self.chat.api_key_env.as_deref().and_then(&lookup);
        }
        self.chat.api_key = self.chat.api_key.take().filter(|k| !k.trim().is_empty());
        self.speech.resolve_env(&lookup);

        // A speech provider keyed by the chat variable shares the chat key
        let chat_key_env = self.chat.api_key_env.as_deref();
        for provider in &mut self.speech.providers {
            if provider.api_key.is_none()
                && chat_key_env.is_some()
                && provider.api_key_env.as_deref() == chat_key_env
            {
                provider.api_key = self.chat.api_key.clone();
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.trim().is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.server.body_limit_bytes == 0 {
            return Err("Body limit must be greater than 0".to_string());
        }

        Url::parse(&self.chat.endpoint)
            .map_err(|e| format!("Invalid chat endpoint: {}", e))?;

        if self.chat.model.trim().is_empty() {
            return Err("Chat model cannot be empty".to_string());
        }

        if self.chat.fallback_reply.trim().is_empty() {
            return Err("Chat fallback reply cannot be empty".to_string());
        }

        if self.chat.timeout_secs == 0 {
            return Err("Chat timeout must be greater than 0".to_string());
        }

        if self.chat.timeout_secs > 600 {
            return Err("Chat timeout too large (max 600 seconds)".to_string());
        }

        self.speech.validate()
    }
}
