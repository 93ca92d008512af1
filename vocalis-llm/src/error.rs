use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("API key not set for provider: {0}")]
    MissingApiKey(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;
