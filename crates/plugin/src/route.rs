use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parley_registry::{CommandHandler, CommandInvocation, HandlerError};
use parley_types::CommandResult;

use crate::plugin::Plugin;

/// Handler forwarding to [`Plugin::execute_command`] without keeping the plugin alive.
pub(crate) struct PluginRoute {
    plugin: Weak<dyn Plugin>,
    plugin_id: String,
    command: String,
}

impl PluginRoute {
    pub(crate) fn new(plugin: &Arc<dyn Plugin>, command: &str) -> Self {
        Self {
            plugin: Arc::downgrade(plugin),
            plugin_id: plugin.id().to_string(),
            command: command.to_string(),
        }
    }
}

#[async_trait]
impl CommandHandler for PluginRoute {
    async fn execute(&self, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        let Some(plugin) = self.plugin.upgrade() else {
            return Err(HandlerError::plugin_unavailable(&self.plugin_id));
        };
        plugin.execute_command(&self.command, invocation).await
    }
}
