//! Dispatch results and execution history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;
use crate::conversion::CommandConversion;

/// How the host should render a result payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Text,
    Markdown,
    Json,
    Html,
    None,
}

/// Outcome of one dispatch. Created fresh per invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Opaque payload for the host UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_next_commands: Vec<String>,
    /// Natural-language resolution that produced the executed command, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<CommandConversion>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn markdown(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            display_mode: DisplayMode::Markdown,
            ..Default::default()
        }
    }

    pub fn json(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            display_mode: DisplayMode::Json,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggested_next_commands = suggestions;
        self
    }
}

/// One entry of the dispatcher's in-memory history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub command: Command,
    pub result: CommandResult,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_without_empty_fields() {
        let result = CommandResult::failure("boom").with_suggestions(vec!["/help".into()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert_eq!(json["displayMode"], "text");
        assert_eq!(json["suggestedNextCommands"][0], "/help");
        assert!(json.get("message").is_none());
    }
}
