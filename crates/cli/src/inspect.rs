//! Bundled plugin exposing session introspection as system commands.

use async_trait::async_trait;
use parley_engine::ParleyConfig;
use parley_plugin::{Plugin, PluginRegistry, WeakPluginRegistry};
use parley_registry::{CommandInvocation, CommandMeta, HandlerError, PluginCommand};
use parley_types::{CommandResult, Domain};

/// Holds its host registry weakly; the registry owns this plugin.
pub struct SessionInspectPlugin {
    plugins: WeakPluginRegistry,
    config: ParleyConfig,
}

impl SessionInspectPlugin {
    pub fn new(plugins: &PluginRegistry, config: ParleyConfig) -> Self {
        Self {
            plugins: plugins.downgrade(),
            config,
        }
    }
}

#[async_trait]
impl Plugin for SessionInspectPlugin {
    fn id(&self) -> &str {
        "session"
    }

    fn domain(&self) -> Option<Domain> {
        None
    }

    fn get_commands(&self) -> Vec<PluginCommand> {
        vec![
            PluginCommand::system("plugins", CommandMeta::new("List registered plugins").with_syntax("/plugins")),
            PluginCommand::system("config", CommandMeta::new("Show the effective configuration").with_syntax("/config")),
        ]
    }

    async fn execute_command(&self, name: &str, _invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        let to_json = |value: serde_json::Result<serde_json::Value>| value.map_err(|error| HandlerError::failed(error.to_string()));
        match name {
            "plugins" => {
                let registry = self.plugins.upgrade().ok_or_else(|| HandlerError::plugin_unavailable(self.id()))?;
                let plugins = registry.list(None).await;
                let message = format!("{} plugin(s) registered", plugins.len());
                Ok(CommandResult::json(to_json(serde_json::to_value(plugins))?).with_message(message))
            }
            "config" => Ok(CommandResult::json(to_json(serde_json::to_value(&self.config))?)),
            other => Err(HandlerError::failed(format!("unknown session command '{other}'"))),
        }
    }
}
