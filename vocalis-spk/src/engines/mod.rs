//! Speech engine implementations

pub mod api;

use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;

/// Audio produced by a single engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub audio: Bytes,
    /// Declared mime type; `None` lets the caller apply its default
    pub mime: Option<String>,
}

/// Trait for speech engines
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize text to speech audio
    async fn synthesize(&self, text: &str) -> Result<SpeechResult, SpeechError>;

    /// Check if engine has everything it needs to be attempted
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}
