//! The plugin capability and its error type.

use async_trait::async_trait;
use parley_registry::{CommandInvocation, DomainProfile, HandlerError, PluginCommand};
use parley_types::{CommandResult, Domain};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a plugin came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Bundled with the host.
    Internal,
    /// Discovered from configuration or a plugin directory.
    External,
}

/// Errors a plugin may report while starting up.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin initialization failed: {message}")]
    Initialization { message: String },
}

impl PluginError {
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization { message: message.into() }
    }
}

/// A unit of functionality contributing commands to one domain.
///
/// Commands returned without a handler are routed back to
/// [`Plugin::execute_command`] by the registry.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique, stable identifier.
    fn id(&self) -> &str;

    /// Domain owning the plugin's agent commands; `None` for plugins that only add system commands.
    fn domain(&self) -> Option<Domain>;

    fn is_enabled(&self) -> bool {
        true
    }

    fn get_commands(&self) -> Vec<PluginCommand>;

    /// Trigger phrases, extractors, guidance and default command for the plugin's domain.
    fn language_profile(&self) -> Option<DomainProfile> {
        None
    }

    async fn initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Executes one of the plugin's handler-less commands.
    async fn execute_command(&self, name: &str, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        let _ = invocation;
        Err(HandlerError::failed(format!("plugin '{}' does not implement '{name}'", self.id())))
    }
}
