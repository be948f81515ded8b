//! Registration records binding command names to handlers.

use std::fmt;
use std::sync::Arc;

use parley_types::{ArgumentDoc, CommandType, CommandUsage, Domain, OptionDoc, SYSTEM_AGENT_ID};

use crate::handler::CommandHandler;

/// Optional metadata supplied alongside a handler.
#[derive(Debug, Clone, Default)]
pub struct CommandMeta {
    /// Registration id. Defaults to `<agent_id>:<command>`.
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: String,
    pub syntax: String,
    pub examples: Vec<String>,
    pub args: Vec<ArgumentDoc>,
    pub options: Vec<OptionDoc>,
}

impl CommandMeta {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax = syntax.into();
        self
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.args.push(ArgumentDoc {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, description: impl Into<String>, value_hint: Option<&str>) -> Self {
        self.options.push(OptionDoc {
            name: name.into(),
            description: description.into(),
            value_hint: value_hint.map(str::to_string),
        });
        self
    }

    /// Builds the read-only usage entry published by the registry.
    pub(crate) fn to_usage(&self, agent_id: &str, domain: Option<Domain>, command: &str) -> CommandUsage {
        CommandUsage {
            agent_id: agent_id.to_string(),
            domain,
            command: command.to_string(),
            description: self.description.clone(),
            syntax: self.syntax.clone(),
            examples: self.examples.clone(),
            args: self.args.clone(),
            options: self.options.clone(),
        }
    }
}

/// A command contributed by a plugin.
///
/// When `handler` is `None` the plugin registry binds a handler that routes
/// to the plugin's own `execute_command`.
#[derive(Clone)]
pub struct PluginCommand {
    pub name: String,
    pub command_type: CommandType,
    pub meta: CommandMeta,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl PluginCommand {
    /// An agent (`@domain:name`) command.
    pub fn agent(name: impl Into<String>, meta: CommandMeta) -> Self {
        Self {
            name: name.into(),
            command_type: CommandType::At,
            meta,
            handler: None,
        }
    }

    /// A system (`/name`) command.
    pub fn system(name: impl Into<String>, meta: CommandMeta) -> Self {
        Self {
            name: name.into(),
            command_type: CommandType::Slash,
            meta,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl fmt::Debug for PluginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCommand")
            .field("name", &self.name)
            .field("command_type", &self.command_type)
            .field("meta", &self.meta)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Registry namespace for a command type and optional domain.
pub(crate) fn namespace_for(command_type: CommandType, domain: Option<Domain>) -> Option<String> {
    match (command_type, domain) {
        (CommandType::At, Some(domain)) => Some(domain.agent_id().to_string()),
        (CommandType::Slash, None) => Some(SYSTEM_AGENT_ID.to_string()),
        _ => None,
    }
}
