//! Error types for natural-language conversion.

use parley_types::Domain;
use thiserror::Error;

use crate::llm::LanguageModelError;

/// Raised only when a domain offers nothing to fall back to.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("no command in '{domain}' matches '{text}' and the domain declares no default command")]
    Unresolved { domain: Domain, text: String },

    #[error("nothing to convert for '{domain}'")]
    EmptyInput { domain: Domain },
}

/// Why the language-model tier produced no usable conversion.
#[derive(Debug, Error)]
pub(crate) enum ModelTierError {
    #[error(transparent)]
    Model(#[from] LanguageModelError),

    #[error("reply is not valid conversion JSON: {0}")]
    Unparsable(String),
}
