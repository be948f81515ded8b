//! Decoding of language-model replies into conversions.
//!
//! The reply is treated as untrusted text: the JSON object is recovered
//! from a fenced block or the first balanced `{...}`, decoded against a
//! strict shape, then checked for an empty command or out-of-range confidence.

use parley_types::{CommandConversion, ConversionAlternative, ConversionSource};
use parley_util::extract_json_object;
use serde::Deserialize;
use serde_json::Value;

use super::error::ModelTierError;

#[derive(Debug, Deserialize)]
struct ReplyShape {
    command: String,
    args: Vec<Value>,
    confidence: f64,
    explanation: String,
    #[serde(default)]
    alternatives: Vec<AlternativeShape>,
}

#[derive(Debug, Deserialize)]
struct AlternativeShape {
    command: String,
    #[serde(default)]
    args: Vec<Value>,
    confidence: f64,
}

/// Parses a reply into a conversion sourced from the model.
pub(crate) fn parse_reply(reply: &str) -> Result<CommandConversion, ModelTierError> {
    let value = extract_json_object(reply).map_err(|error| ModelTierError::Unparsable(error.to_string()))?;
    let shape: ReplyShape = serde_json::from_value(value).map_err(|error| ModelTierError::Unparsable(error.to_string()))?;

    let command = shape.command.trim().to_lowercase();
    if command.is_empty() {
        return Err(ModelTierError::Unparsable("empty command".into()));
    }
    if !is_unit_interval(shape.confidence) {
        return Err(ModelTierError::Unparsable(format!("confidence {} outside [0, 1]", shape.confidence)));
    }

    let alternatives = shape
        .alternatives
        .into_iter()
        .filter(|alternative| !alternative.command.trim().is_empty() && is_unit_interval(alternative.confidence))
        .map(|alternative| ConversionAlternative {
            command: alternative.command.trim().to_lowercase(),
            args: stringify_args(alternative.args),
            confidence: alternative.confidence,
        })
        .collect();

    Ok(CommandConversion::new(command, stringify_args(shape.args), shape.confidence, shape.explanation)
        .with_alternatives(alternatives)
        .with_source(ConversionSource::Llm))
}

fn is_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Models occasionally emit numbers or booleans as args.
fn stringify_args(args: Vec<Value>) -> Vec<String> {
    args.into_iter()
        .filter(|value| !value.is_null())
        .map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .collect()
}
