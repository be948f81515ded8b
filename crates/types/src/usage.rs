//! Static command metadata published by the registry.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Documentation for a positional argument.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// Documentation for a `--flag` or `--key=value` option.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `None` for boolean flags.
    #[serde(default)]
    pub value_hint: Option<String>,
}

/// Read-only usage entry created when a command is registered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUsage {
    pub agent_id: String,
    /// `None` for system commands.
    pub domain: Option<Domain>,
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub syntax: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub args: Vec<ArgumentDoc>,
    #[serde(default)]
    pub options: Vec<OptionDoc>,
}

impl CommandUsage {
    /// One line of the catalog handed to the language model and `/help`.
    pub fn catalog_line(&self) -> String {
        let syntax = if self.syntax.is_empty() { self.command.as_str() } else { self.syntax.as_str() };
        format!("- {}: {} (syntax: {})", self.command, self.description, syntax)
    }
}
