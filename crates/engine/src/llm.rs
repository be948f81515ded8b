//! Language-model collaborator used by the natural-language converter.
//!
//! The converter needs a single "send prompt, await full text" round trip.
//! Transport, streaming and credentials belong to the implementation.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a language model may report. Every variant degrades to the converter's fallback chain.
#[derive(Debug, Error)]
pub enum LanguageModelError {
    #[error("language model unavailable: {message}")]
    Unavailable { message: String },

    #[error("language model request failed: {message}")]
    Request { message: String },

    #[error("language model timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("language model task aborted: {message}")]
    Aborted { message: String },
}

impl LanguageModelError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request { message: message.into() }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted { message: message.into() }
    }
}

/// Text completion capability.
///
/// The trait is object-safe for use as `Arc<dyn LanguageModel>`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends `prompt` and returns the complete reply text.
    async fn complete(&self, prompt: &str) -> Result<String, LanguageModelError>;
}
