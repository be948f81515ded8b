//! Configuration validation.

use parley_types::Domain;
use thiserror::Error;
use tracing::debug;

use crate::config::ParleyConfig;

/// Validate the entire configuration.
pub fn validate_config(config: &ParleyConfig) -> Result<(), ValidationError> {
    let converter = &config.converter;
    validate_unit_interval("converter.fastPathThreshold", converter.fast_path_threshold)?;
    validate_unit_interval("converter.heuristicDiscount", converter.heuristic_discount)?;
    validate_unit_interval("converter.fallbackConfidence", converter.fallback_confidence)?;
    if converter.llm_timeout_ms == 0 {
        return Err(ValidationError::NotPositive {
            field: "converter.llmTimeoutMs",
        });
    }

    let dispatcher = &config.dispatcher;
    validate_unit_interval("dispatcher.lowConfidenceThreshold", dispatcher.low_confidence_threshold)?;
    if dispatcher.history_limit == 0 {
        return Err(ValidationError::NotPositive {
            field: "dispatcher.historyLimit",
        });
    }
    if dispatcher.max_suggestions == 0 {
        return Err(ValidationError::NotPositive {
            field: "dispatcher.maxSuggestions",
        });
    }
    if let Some(token) = &dispatcher.default_domain
        && Domain::from_token(token).is_none()
    {
        return Err(ValidationError::UnknownDomain { token: token.clone() });
    }

    for plugin_id in &config.plugins.disabled {
        if plugin_id.trim().is_empty() {
            return Err(ValidationError::EmptyPluginId);
        }
    }

    debug!("Validated configuration");
    Ok(())
}

fn validate_unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("'{field}' must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("'{field}' must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("Unknown default domain '{token}'")]
    UnknownDomain { token: String },

    #[error("Disabled plugin ids cannot be empty")]
    EmptyPluginId,
}
