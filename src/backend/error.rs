use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI error: {0}")]
    OpenAi(String),

    #[error("Anthropic error: {0}")]
    Anthropic(String),

    #[error("Gemini error: {0}")]
    Gemini(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
