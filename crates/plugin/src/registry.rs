//! Plugin registry keeping plugin lifecycle and command registrations in step.

use std::sync::{Arc, Weak};

use indexmap::{IndexMap, IndexSet};
use parley_registry::{CommandRegistry, RegistryError};
use parley_types::{Domain, SYSTEM_AGENT_ID};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::plugin::{Plugin, PluginError, PluginKind};
use crate::route::PluginRoute;

struct RegisteredPlugin {
    plugin: Arc<dyn Plugin>,
    active: bool,
    command_ids: Vec<String>,
}

#[derive(Default)]
struct PluginSets {
    internal: IndexMap<String, RegisteredPlugin>,
    external: IndexMap<String, RegisteredPlugin>,
}

impl PluginSets {
    fn set(&self, kind: PluginKind) -> &IndexMap<String, RegisteredPlugin> {
        match kind {
            PluginKind::Internal => &self.internal,
            PluginKind::External => &self.external,
        }
    }

    fn set_mut(&mut self, kind: PluginKind) -> &mut IndexMap<String, RegisteredPlugin> {
        match kind {
            PluginKind::Internal => &mut self.internal,
            PluginKind::External => &mut self.external,
        }
    }

    fn find(&self, id: &str) -> Option<(PluginKind, &RegisteredPlugin)> {
        [PluginKind::Internal, PluginKind::External]
            .into_iter()
            .find_map(|kind| self.set(kind).get(id).map(|entry| (kind, entry)))
    }

    fn iter(&self) -> impl Iterator<Item = (PluginKind, &RegisteredPlugin)> {
        self.internal
            .values()
            .map(|entry| (PluginKind::Internal, entry))
            .chain(self.external.values().map(|entry| (PluginKind::External, entry)))
    }
}

/// Read-only view of a registered plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub id: String,
    pub kind: PluginKind,
    pub domain: Option<Domain>,
    /// False when the plugin reported itself disabled or is disabled in configuration.
    pub active: bool,
    /// Registration ids of the commands the plugin contributed.
    pub commands: Vec<String>,
}

impl PluginSummary {
    fn from_entry(id: &str, kind: PluginKind, entry: &RegisteredPlugin) -> Self {
        Self {
            id: id.to_string(),
            kind,
            domain: entry.plugin.domain(),
            active: entry.active,
            commands: entry.command_ids.clone(),
        }
    }
}

/// Owns plugin instances, partitioned into internal and external sets.
///
/// Registration pushes a plugin's commands and language profile into the
/// command registry in one batch; unregistration removes them in one batch
/// before the plugin is dropped. Writers are serialized by an async mutex,
/// so concurrent lookups see a plugin's commands either all present or all
/// absent.
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Arc<Mutex<PluginSets>>,
    commands: CommandRegistry,
    disabled: Arc<IndexSet<String>>,
}

impl PluginRegistry {
    pub fn new(commands: CommandRegistry) -> Self {
        Self {
            plugins: Arc::new(Mutex::new(PluginSets::default())),
            commands,
            disabled: Arc::new(IndexSet::new()),
        }
    }

    /// Plugin ids that stay registered without contributing commands.
    pub fn with_disabled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled = Arc::new(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn command_registry(&self) -> &CommandRegistry {
        &self.commands
    }

    /// A handle that does not keep the plugin set alive, for plugins that inspect their host.
    pub fn downgrade(&self) -> WeakPluginRegistry {
        WeakPluginRegistry {
            plugins: Arc::downgrade(&self.plugins),
            commands: self.commands.clone(),
            disabled: Arc::clone(&self.disabled),
        }
    }

    /// Initializes a plugin and publishes its commands.
    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>, kind: PluginKind) -> Result<PluginSummary, PluginRegistryError> {
        let id = plugin.id().trim().to_string();
        if id.is_empty() {
            return Err(PluginRegistryError::InvalidId);
        }
        if id == SYSTEM_AGENT_ID {
            return Err(PluginRegistryError::ReservedId { id });
        }

        let mut plugins = self.plugins.lock().await;
        if plugins.find(&id).is_some() {
            return Err(PluginRegistryError::AlreadyRegistered { id });
        }

        plugin
            .initialize()
            .await
            .map_err(|source| PluginRegistryError::Initialization { id: id.clone(), source })?;

        let domain = plugin.domain();
        let profile = plugin.language_profile();
        if let Some(profile) = &profile
            && Some(profile.domain) != domain
        {
            return Err(PluginRegistryError::ProfileMismatch {
                id,
                profile: profile.domain,
                domain,
            });
        }

        let active = plugin.is_enabled() && !self.disabled.contains(&id);
        let command_ids = if active {
            let commands = plugin
                .get_commands()
                .into_iter()
                .map(|command| match command.handler {
                    Some(_) => command,
                    None => {
                        let route = Arc::new(PluginRoute::new(&plugin, &command.name));
                        command.with_handler(route)
                    }
                })
                .collect();
            self.commands.register_batch(&id, domain, commands, profile)?
        } else {
            debug!(plugin = %id, "Plugin disabled, commands not published");
            Vec::new()
        };

        let entry = RegisteredPlugin {
            plugin,
            active,
            command_ids,
        };
        let summary = PluginSummary::from_entry(&id, kind, &entry);
        plugins.set_mut(kind).insert(id.clone(), entry);
        info!(plugin = %id, kind = ?kind, commands = summary.commands.len(), "Registered plugin");
        Ok(summary)
    }

    /// Removes a plugin and every command it contributed. Returns the removed command ids.
    pub async fn unregister_plugin(&self, id: &str, kind: PluginKind) -> Result<Vec<String>, PluginRegistryError> {
        let mut plugins = self.plugins.lock().await;
        if !plugins.set(kind).contains_key(id) {
            return Err(PluginRegistryError::NotFound { id: id.to_string(), kind });
        }

        // Commands go first so no lookup can reach a handler whose plugin is gone.
        let removed = self.commands.unregister_owner(id)?;
        plugins.set_mut(kind).shift_remove(id);
        info!(plugin = %id, kind = ?kind, commands = removed.len(), "Unregistered plugin");
        Ok(removed)
    }

    pub async fn get_plugin(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let plugins = self.plugins.lock().await;
        plugins.find(id).map(|(_, entry)| Arc::clone(&entry.plugin))
    }

    pub async fn summary(&self, id: &str) -> Option<PluginSummary> {
        let plugins = self.plugins.lock().await;
        plugins.find(id).map(|(kind, entry)| PluginSummary::from_entry(id, kind, entry))
    }

    pub async fn is_registered(&self, id: &str) -> bool {
        let plugins = self.plugins.lock().await;
        plugins.find(id).is_some()
    }

    /// Registered plugins, internal first, each set in registration order.
    pub async fn list(&self, kind: Option<PluginKind>) -> Vec<PluginSummary> {
        let plugins = self.plugins.lock().await;
        plugins
            .iter()
            .filter(|(entry_kind, _)| kind.is_none_or(|kind| kind == *entry_kind))
            .map(|(entry_kind, entry)| PluginSummary::from_entry(entry.plugin.id(), entry_kind, entry))
            .collect()
    }

    pub async fn count(&self) -> usize {
        let plugins = self.plugins.lock().await;
        plugins.internal.len() + plugins.external.len()
    }
}

/// Non-owning counterpart of [`PluginRegistry`].
#[derive(Clone)]
pub struct WeakPluginRegistry {
    plugins: Weak<Mutex<PluginSets>>,
    commands: CommandRegistry,
    disabled: Arc<IndexSet<String>>,
}

impl WeakPluginRegistry {
    /// Returns the registry while any strong handle to it is alive.
    pub fn upgrade(&self) -> Option<PluginRegistry> {
        Some(PluginRegistry {
            plugins: self.plugins.upgrade()?,
            commands: self.commands.clone(),
            disabled: Arc::clone(&self.disabled),
        })
    }
}

/// Errors that can occur in the plugin registry.
#[derive(Debug, thiserror::Error)]
pub enum PluginRegistryError {
    #[error("Plugin id must not be empty")]
    InvalidId,

    #[error("Plugin id is reserved: {id}")]
    ReservedId { id: String },

    #[error("Plugin already registered: {id}")]
    AlreadyRegistered { id: String },

    #[error("Plugin not found: {id} ({kind:?})")]
    NotFound { id: String, kind: PluginKind },

    #[error("Plugin '{id}' failed to initialize: {source}")]
    Initialization {
        id: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{id}' supplies a profile for '{profile}' but serves {domain:?}")]
    ProfileMismatch { id: String, profile: Domain, domain: Option<Domain> },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_registry::{CommandInvocation, CommandMeta, DomainProfile, HandlerError, PluginCommand, handler_fn};
    use parley_types::{Command, CommandResult};
    use tokio_util::sync::CancellationToken;

    struct GitPlugin {
        id: &'static str,
        enabled: bool,
        fail_init: bool,
    }

    impl GitPlugin {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                enabled: true,
                fail_init: false,
            }
        }
    }

    #[async_trait]
    impl Plugin for GitPlugin {
        fn id(&self) -> &str {
            self.id
        }

        fn domain(&self) -> Option<Domain> {
            Some(Domain::VersionControl)
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn get_commands(&self) -> Vec<PluginCommand> {
            vec![
                PluginCommand::agent("status", CommandMeta::new("Show status")),
                PluginCommand::agent("log", CommandMeta::new("Show history")),
                PluginCommand::agent("version", CommandMeta::default()).with_handler(handler_fn(|_| Ok(CommandResult::text("2.0")))),
            ]
        }

        fn language_profile(&self) -> Option<DomainProfile> {
            Some(
                DomainProfile::new(Domain::VersionControl)
                    .with_triggers("status", ["what changed"])
                    .with_default_command("status"),
            )
        }

        async fn initialize(&self) -> Result<(), PluginError> {
            if self.fail_init {
                return Err(PluginError::initialization("git not found"));
            }
            Ok(())
        }

        async fn execute_command(&self, name: &str, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
            Ok(CommandResult::text(format!("{name} {}", invocation.args.join(" "))))
        }
    }

    fn invocation(command: &str) -> CommandInvocation {
        let command = Command::agent(Domain::VersionControl, command, vec!["-n".into()]);
        CommandInvocation::from_command("exec-1", &command, CancellationToken::new())
    }

    #[tokio::test]
    async fn register_then_unregister_leaves_no_commands() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone());

        let summary = plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();
        assert_eq!(summary.commands, vec!["git:status", "git:log", "git:version"]);
        assert_eq!(commands.get_domain_commands(Domain::VersionControl).len(), 3);
        assert!(commands.domain_profile(Domain::VersionControl).is_some());

        let removed = plugins.unregister_plugin("git", PluginKind::Internal).await.unwrap();
        assert_eq!(removed.len(), 3);
        assert!(commands.get_domain_commands(Domain::VersionControl).is_empty());
        assert!(commands.domain_profile(Domain::VersionControl).is_none());
        assert!(!plugins.is_registered("git").await);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_across_kinds() {
        let plugins = PluginRegistry::new(CommandRegistry::new());
        plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();

        let error = plugins
            .register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::External)
            .await
            .unwrap_err();
        assert!(matches!(error, PluginRegistryError::AlreadyRegistered { .. }));
        assert!(matches!(
            plugins.unregister_plugin("git", PluginKind::External).await,
            Err(PluginRegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn reserved_and_empty_ids_are_rejected() {
        let plugins = PluginRegistry::new(CommandRegistry::new());
        assert!(matches!(
            plugins.register_plugin(Arc::new(GitPlugin::new("core")), PluginKind::Internal).await,
            Err(PluginRegistryError::ReservedId { .. })
        ));
        assert!(matches!(
            plugins.register_plugin(Arc::new(GitPlugin::new(" ")), PluginKind::Internal).await,
            Err(PluginRegistryError::InvalidId)
        ));
    }

    #[tokio::test]
    async fn commands_owned_by_another_plugin_are_not_taken_over() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone());
        plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();

        let error = plugins
            .register_plugin(Arc::new(GitPlugin::new("git-fork")), PluginKind::External)
            .await
            .unwrap_err();
        assert!(matches!(error, PluginRegistryError::Registry(RegistryError::Conflict { .. })));
        assert!(!plugins.is_registered("git-fork").await);

        let summary = plugins.summary("git").await.unwrap();
        assert_eq!(summary.commands, vec!["git:status", "git:log", "git:version"]);
        assert_eq!(commands.get_domain_commands(Domain::VersionControl).len(), 3);
    }

    #[tokio::test]
    async fn disabled_plugins_publish_nothing() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone()).with_disabled(["git"]);
        let summary = plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::External).await.unwrap();
        assert!(!summary.active);
        assert!(commands.is_empty());

        let self_disabled = GitPlugin {
            enabled: false,
            ..GitPlugin::new("git-2")
        };
        plugins.register_plugin(Arc::new(self_disabled), PluginKind::External).await.unwrap();
        assert!(commands.is_empty());
        assert_eq!(plugins.list(Some(PluginKind::External)).await.len(), 2);
    }

    #[tokio::test]
    async fn failed_initialization_registers_nothing() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone());
        let failing = GitPlugin {
            fail_init: true,
            ..GitPlugin::new("git")
        };
        let error = plugins.register_plugin(Arc::new(failing), PluginKind::Internal).await.unwrap_err();
        assert!(matches!(error, PluginRegistryError::Initialization { .. }));
        assert!(commands.is_empty());
        assert_eq!(plugins.count().await, 0);
    }

    #[tokio::test]
    async fn routed_handlers_reach_the_plugin_until_it_is_gone() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone());
        plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();

        let routed = commands.get_handler("git", "log").unwrap();
        let result = routed.execute(invocation("log")).await.unwrap();
        assert_eq!(result.message.as_deref(), Some("log -n"));

        let own = commands.get_handler("git", "version").unwrap();
        assert_eq!(own.execute(invocation("version")).await.unwrap().message.as_deref(), Some("2.0"));

        plugins.unregister_plugin("git", PluginKind::Internal).await.unwrap();
        let error = routed.execute(invocation("log")).await.unwrap_err();
        assert!(matches!(error, HandlerError::PluginUnavailable { .. }));
    }

    #[tokio::test]
    async fn weak_handle_does_not_outlive_the_registry() {
        let plugins = PluginRegistry::new(CommandRegistry::new());
        plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();

        let weak = plugins.downgrade();
        let upgraded = weak.upgrade().unwrap();
        assert!(upgraded.is_registered("git").await);

        drop(upgraded);
        drop(plugins);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_lookups_never_see_partial_plugins() {
        let commands = CommandRegistry::new();
        let plugins = PluginRegistry::new(commands.clone());

        let reader = {
            let commands = commands.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let visible = commands.get_domain_commands(Domain::VersionControl).len();
                    assert!(visible == 0 || visible == 3, "saw {visible} commands");
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..50 {
            plugins.register_plugin(Arc::new(GitPlugin::new("git")), PluginKind::Internal).await.unwrap();
            plugins.unregister_plugin("git", PluginKind::Internal).await.unwrap();
        }
        reader.await.unwrap();
    }
}
