//! vocalis-spk: Speech synthesis fallback for the avatar relay
//!
//! Provides:
//! - A uniform `SpeechEngine` capability
//! - HTTP engines described declaratively (endpoint, request shape, decoder)
//! - An ordered `SpeechChain` that keeps the first engine that succeeds

pub mod error;
pub mod config;
pub mod engines;
pub mod chain;

pub use error::SpeechError;
pub use config::{RequestShape, ResponseShape, SpeechConfig, SpeechProviderConfig, DEFAULT_MIME};
pub use engines::{SpeechEngine, SpeechResult};
pub use engines::api::ApiSpeechEngine;
pub use chain::SpeechChain;
