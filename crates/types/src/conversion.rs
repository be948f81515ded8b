//! Natural-language conversion output.

use serde::{Deserialize, Serialize};

/// Which resolution tier produced a conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    #[default]
    Heuristic,
    Llm,
    /// The domain default command, used when nothing else resolved.
    Fallback,
}

/// A lower-confidence candidate offered for "did you mean" prompts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversionAlternative {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub confidence: f64,
}

/// Free text resolved into a concrete command of one domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandConversion {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub alternatives: Vec<ConversionAlternative>,
    #[serde(default)]
    pub source: ConversionSource,
}

impl CommandConversion {
    pub fn new(command: impl Into<String>, args: Vec<String>, confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args,
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
            alternatives: Vec::new(),
            source: ConversionSource::Heuristic,
        }
    }

    pub fn with_source(mut self, source: ConversionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<ConversionAlternative>) -> Self {
        self.alternatives = alternatives;
        self
    }
}
