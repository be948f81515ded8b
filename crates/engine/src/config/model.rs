//! Data models for Parley configuration.

use std::time::Duration;

use indexmap::IndexSet;
use parley_types::Domain;
use serde::{Deserialize, Serialize};

/// Top-level configuration. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleyConfig {
    pub converter: ConverterConfig,
    pub dispatcher: DispatcherConfig,
    pub plugins: PluginsConfig,
}

/// Natural-language converter tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Heuristic confidence strictly above this skips the language model.
    pub fast_path_threshold: f64,
    /// Multiplier applied to the phrase-coverage score of a heuristic match.
    pub heuristic_discount: f64,
    /// Confidence reported when the domain default command is used; clamped to `[0.3, 0.5]`.
    pub fallback_confidence: f64,
    /// Upper bound for one language-model call, in milliseconds.
    pub llm_timeout_ms: u64,
}

impl ConverterConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    pub fn effective_fallback_confidence(&self) -> f64 {
        self.fallback_confidence.clamp(0.3, 0.5)
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            fast_path_threshold: 0.8,
            heuristic_discount: 0.8,
            fallback_confidence: 0.4,
            llm_timeout_ms: 15_000,
        }
    }
}

/// Dispatcher behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Number of execution records kept in memory.
    pub history_limit: usize,
    /// Conversions below this confidence carry a warning in the result message.
    pub low_confidence_threshold: f64,
    pub max_suggestions: usize,
    /// Domain token that receives plain text (no `@` or `/`) as natural language.
    pub default_domain: Option<String>,
}

impl DispatcherConfig {
    /// The configured default domain, if it names a known domain.
    pub fn default_domain(&self) -> Option<Domain> {
        self.default_domain.as_deref().and_then(Domain::from_token)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            low_confidence_threshold: 0.3,
            max_suggestions: 5,
            default_domain: None,
        }
    }
}

/// Plugin host settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PluginsConfig {
    /// Plugin ids that are registered but contribute no commands.
    pub disabled: IndexSet<String>,
}
