pub mod anthropic;

use async_trait::async_trait;
use thiserror::Error;

pub use anthropic::AnthropicClient;

/// A language model that answers a single-turn text prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` as one user message, bounded to `max_tokens` output
    /// tokens. Returns the text of the first content block, or `None` when
    /// the response carried no text block.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Option<String>, ModelError>;
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model client could not be built: {0}")]
    Client(String),

    #[error("Model request failed: {0}")]
    Network(String),

    #[error("Model rate limit exceeded")]
    RateLimited,

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}
