//! Ordered fallback over speech engines

use crate::config::SpeechConfig;
use crate::engines::api::ApiSpeechEngine;
use crate::engines::{SpeechEngine, SpeechResult};
use crate::error::SpeechError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tries each engine once, in order, and keeps the first audio produced.
///
/// Unavailable engines are skipped without a call. Failures and timeouts are
/// logged and never leave the chain.
#[derive(Clone)]
pub struct SpeechChain {
    engines: Vec<Arc<dyn SpeechEngine>>,
    attempt_timeout: Duration,
}

impl SpeechChain {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            engines: Vec::new(),
            attempt_timeout,
        }
    }

    /// Build API engines for every configured provider, preserving order
    pub fn from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let attempt_timeout = Duration::from_secs(config.attempt_timeout_secs);
        let mut chain = Self::new(attempt_timeout);
        for provider in &config.providers {
            let engine = ApiSpeechEngine::from_config(provider, attempt_timeout)?;
            chain = chain.with_engine(Arc::new(engine));
        }
        Ok(chain)
    }

    /// Append an engine at the lowest priority
    pub fn with_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    /// Names of engines that would be attempted, in order
    pub fn available_engines(&self) -> Vec<String> {
        self.engines
            .iter()
            .filter(|e| e.is_available())
            .map(|e| e.name().to_string())
            .collect()
    }

    /// First successful synthesis, or `None` when every engine was skipped or failed
    pub async fn synthesize(&self, text: &str) -> Option<SpeechResult> {
        for engine in &self.engines {
            if !engine.is_available() {
                debug!("Speech provider {} not configured, skipping", engine.name());
                continue;
            }

            let attempt = tokio::time::timeout(self.attempt_timeout, engine.synthesize(text))
                .await
                .unwrap_or(Err(SpeechError::Timeout(self.attempt_timeout)));

            match attempt {
                Ok(result) => {
                    info!(
                        "Speech provider {} produced {} bytes",
                        engine.name(),
                        result.audio.len()
                    );
                    return Some(result);
                }
                Err(e) => {
                    warn!("Speech provider {} failed, falling back: {}", engine.name(), e);
                }
            }
        }

        None
    }
}
