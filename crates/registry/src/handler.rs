//! Executable behavior bound to registered commands.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parley_types::{Command, CommandResult, FlagValue};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    /// Dispatcher-assigned id; the key accepted by `cancel`.
    pub execution_id: String,
    pub agent_id: String,
    pub command: String,
    pub sub_command: Option<String>,
    pub args: Vec<String>,
    pub flags: IndexMap<String, FlagValue>,
    pub options: IndexMap<String, Value>,
    pub raw_input: String,
    /// Signalled when the caller abandons the invocation. Honoring it is up to the handler.
    pub cancellation: CancellationToken,
}

impl CommandInvocation {
    /// Builds an invocation from a resolved command.
    pub fn from_command(execution_id: impl Into<String>, command: &Command, cancellation: CancellationToken) -> Self {
        Self {
            execution_id: execution_id.into(),
            agent_id: command.agent_id.clone(),
            command: command.command.clone(),
            sub_command: command.sub_command.clone(),
            args: command.args.clone(),
            flags: command.flags.clone(),
            options: command.options.clone(),
            raw_input: command.raw_input.clone(),
            cancellation,
        }
    }

    /// Whether a boolean flag is present and true.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).and_then(FlagValue::as_bool).unwrap_or(false)
    }

    /// Option value rendered as a string, if present.
    pub fn option_str(&self, name: &str) -> Option<String> {
        self.options.get(name).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// Errors a handler may report. The dispatcher converts every variant into a failed result.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("command cancelled")]
    Cancelled,

    #[error("plugin no longer registered: {plugin}")]
    PluginUnavailable { plugin: String },

    #[error("{message}")]
    Failed { message: String },
}

impl HandlerError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments { message: message.into() }
    }

    pub fn plugin_unavailable(plugin: impl Into<String>) -> Self {
        Self::PluginUnavailable { plugin: plugin.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed { message: message.into() }
    }
}

/// A single async capability invoked by the dispatcher.
///
/// The owning plugin holds the implementation; the registry keeps a shared
/// reference only for as long as the registration lasts.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, invocation: CommandInvocation) -> Result<CommandResult, HandlerError>;
}

/// Adapter turning a synchronous closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(CommandInvocation) -> Result<CommandResult, HandlerError> + Send + Sync,
{
    async fn execute(&self, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        (self.0)(invocation)
    }
}

/// Wraps a closure as a shared handler.
pub fn handler_fn<F>(function: F) -> Arc<dyn CommandHandler>
where
    F: Fn(CommandInvocation) -> Result<CommandResult, HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::Domain;

    #[tokio::test]
    async fn closure_handler_receives_invocation() {
        let handler = handler_fn(|invocation| Ok(CommandResult::text(invocation.args.join(","))));
        let command = Command::agent(Domain::VersionControl, "log", vec!["a".into(), "b".into()]);
        let invocation = CommandInvocation::from_command("exec-1", &command, CancellationToken::new());

        let result = handler.execute(invocation).await.unwrap();
        assert_eq!(result.message.as_deref(), Some("a,b"));
    }
}
