//! One running session: a command registry, a plugin registry and a dispatcher built together.

use std::sync::Arc;

use parley_plugin::{Plugin, PluginKind, PluginRegistry, PluginRegistryError, PluginSummary};
use parley_registry::CommandRegistry;
use parley_types::{CommandResult, ParsedCommand};

use crate::config::ParleyConfig;
use crate::convert::NaturalLanguageConverter;
use crate::dispatch::Dispatcher;
use crate::llm::LanguageModel;

/// Owns exactly one registry of each kind and threads them into the dispatcher.
#[derive(Clone)]
pub struct Session {
    commands: CommandRegistry,
    plugins: PluginRegistry,
    dispatcher: Arc<Dispatcher>,
}

impl Session {
    pub fn new(config: &ParleyConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_model(config: &ParleyConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self::build(config, Some(model))
    }

    fn build(config: &ParleyConfig, model: Option<Arc<dyn LanguageModel>>) -> Self {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone()).with_disabled(config.plugins.disabled.iter().cloned());

        let mut converter = NaturalLanguageConverter::new(commands.clone(), config.converter.clone());
        if let Some(model) = model {
            converter = converter.with_model(model);
        }
        let dispatcher = Arc::new(Dispatcher::new(commands.clone(), converter, config.dispatcher.clone()));

        Self {
            commands,
            plugins,
            dispatcher,
        }
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>, kind: PluginKind) -> Result<PluginSummary, PluginRegistryError> {
        self.plugins.register_plugin(plugin, kind).await
    }

    pub async fn unregister_plugin(&self, id: &str, kind: PluginKind) -> Result<Vec<String>, PluginRegistryError> {
        self.plugins.unregister_plugin(id, kind).await
    }

    pub async fn execute_from_string(&self, raw: &str) -> CommandResult {
        self.dispatcher.execute_from_string(raw).await
    }

    pub fn parse_with_suggestions(&self, raw: &str) -> ParsedCommand {
        self.dispatcher.parse_with_suggestions(raw)
    }
}
