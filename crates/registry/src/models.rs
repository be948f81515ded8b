use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use parley_types::{CommandType, CommandUsage, Domain};
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::{CommandMeta, PluginCommand, namespace_for};
use crate::handler::CommandHandler;
use crate::profile::DomainProfile;

/// Errors raised synchronously by registration calls.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command id must not be empty")]
    EmptyId,

    #[error("command name must not be empty")]
    EmptyCommand,

    #[error("command '{command}' has no handler")]
    MissingHandler { command: String },

    #[error("command '{command}' has an invalid namespace: {reason}")]
    InvalidNamespace { command: String, reason: String },

    #[error("command '{id}' is already registered by '{owner}'")]
    Conflict { id: String, owner: String },

    #[error("registry lock failed: {0}")]
    Lock(String),
}

/// A live registration: handler and usage are stored together so that
/// removing one always removes the other.
#[derive(Clone)]
pub(crate) struct RegisteredCommand {
    pub(crate) id: String,
    pub(crate) owner: Option<String>,
    pub(crate) command_type: CommandType,
    pub(crate) usage: CommandUsage,
    pub(crate) handler: Arc<dyn CommandHandler>,
}

#[derive(Default)]
pub(crate) struct RegistryState {
    /// Keyed by registration id; insertion order is registration order.
    pub(crate) entries: IndexMap<String, RegisteredCommand>,
    /// `(namespace, command)` to registration id.
    lookup: HashMap<(String, String), String>,
    /// Domain profiles keyed by agent id; one slot per supplying owner, latest last.
    profiles: HashMap<String, Vec<(Option<String>, DomainProfile)>>,
}

impl RegistryState {
    fn insert(&mut self, entry: RegisteredCommand) {
        let key = (entry.usage.agent_id.clone(), entry.usage.command.clone());

        // A different id already bound to this name is superseded.
        if let Some(previous_id) = self.lookup.get(&key).cloned()
            && previous_id != entry.id
        {
            self.entries.shift_remove(&previous_id);
        }
        // The same id re-registered under another name drops its old binding.
        if let Some(previous) = self.entries.get(&entry.id) {
            let previous_key = (previous.usage.agent_id.clone(), previous.usage.command.clone());
            self.lookup.remove(&previous_key);
        }

        self.lookup.insert(key, entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    /// The owner of a registration `entry` would replace, when that owner is someone else.
    ///
    /// Unowned registrations may always be replaced.
    fn conflicting_owner(&self, entry: &RegisteredCommand) -> Option<String> {
        let incoming = entry.owner.as_deref()?;
        let key = (entry.usage.agent_id.clone(), entry.usage.command.clone());
        let by_name = self.lookup.get(&key).and_then(|id| self.entries.get(id));
        [self.entries.get(&entry.id), by_name]
            .into_iter()
            .flatten()
            .filter_map(|existing| existing.owner.as_deref())
            .find(|owner| *owner != incoming)
            .map(str::to_string)
    }

    fn set_profile(&mut self, owner: Option<&str>, profile: DomainProfile) {
        let slots = self.profiles.entry(profile.domain.agent_id().to_string()).or_default();
        slots.retain(|(slot_owner, _)| slot_owner.as_deref() != owner);
        slots.push((owner.map(str::to_string), profile));
    }

    fn remove_profiles(&mut self, owner: &str) {
        for slots in self.profiles.values_mut() {
            slots.retain(|(slot_owner, _)| slot_owner.as_deref() != Some(owner));
        }
        self.profiles.retain(|_, slots| !slots.is_empty());
    }

    fn remove(&mut self, id: &str) -> Option<RegisteredCommand> {
        let entry = self.entries.shift_remove(id)?;
        self.lookup.remove(&(entry.usage.agent_id.clone(), entry.usage.command.clone()));
        Some(entry)
    }

    fn get(&self, agent_id: &str, command: &str) -> Option<&RegisteredCommand> {
        let id = self.lookup.get(&(agent_id.to_lowercase(), command.to_lowercase()))?;
        self.entries.get(id)
    }
}

/// A handler resolved for dispatch along with its registration metadata.
#[derive(Clone)]
pub struct ResolvedCommand {
    pub id: String,
    pub usage: CommandUsage,
    pub handler: Arc<dyn CommandHandler>,
}

/// Lookup table of invocable commands keyed by `(namespace, command)`.
///
/// The namespace is a domain's agent id or `core` for system commands. The
/// registry holds no execution state and performs no I/O. Clones share the
/// same storage; a single reader-writer lock guards it so concurrent readers
/// see either the state before or after a mutation, never a mix.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, RegistryState>, RegistryError> {
        self.state.read().map_err(|error| RegistryError::Lock(error.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RegistryState>, RegistryError> {
        self.state.write().map_err(|error| RegistryError::Lock(error.to_string()))
    }

    /// Registers an `@domain:command` handler. Returns `false` when rejected.
    pub fn register_agent_command(&self, domain: Domain, command: &str, handler: Arc<dyn CommandHandler>, meta: CommandMeta) -> bool {
        let plugin_command = PluginCommand::agent(command, meta).with_handler(handler);
        self.try_register(Some(domain), plugin_command, None)
            .inspect_err(|error| warn!(domain = %domain, command, error = %error, "Rejected agent command"))
            .is_ok()
    }

    /// Registers a `/command` handler. Returns `false` when rejected.
    pub fn register_system_command(&self, command: &str, handler: Arc<dyn CommandHandler>, meta: CommandMeta) -> bool {
        let plugin_command = PluginCommand::system(command, meta).with_handler(handler);
        self.try_register(None, plugin_command, None)
            .inspect_err(|error| warn!(command, error = %error, "Rejected system command"))
            .is_ok()
    }

    /// Registers one command, returning its registration id.
    ///
    /// Re-registering an id replaces the earlier entry in place.
    pub fn try_register(&self, domain: Option<Domain>, command: PluginCommand, owner: Option<&str>) -> Result<String, RegistryError> {
        let entry = build_entry(domain, command, owner)?;
        let id = entry.id.clone();
        self.write()?.insert(entry);
        debug!(id = %id, "Registered command");
        Ok(id)
    }

    /// Registers a plugin's commands and optional profile under one write lock.
    ///
    /// Every command is validated before anything is inserted, so either all
    /// of them become visible or none do. Commands already owned by another
    /// owner are rejected with [`RegistryError::Conflict`].
    pub fn register_batch(
        &self,
        owner: &str,
        domain: Option<Domain>,
        commands: Vec<PluginCommand>,
        profile: Option<DomainProfile>,
    ) -> Result<Vec<String>, RegistryError> {
        let entries = commands
            .into_iter()
            .map(|command| build_entry(domain, command, Some(owner)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.write()?;
        if let Some((entry, existing)) = entries
            .iter()
            .find_map(|entry| state.conflicting_owner(entry).map(|existing| (entry, existing)))
        {
            return Err(RegistryError::Conflict {
                id: entry.id.clone(),
                owner: existing,
            });
        }

        let ids = entries.iter().map(|entry| entry.id.clone()).collect();
        for entry in entries {
            state.insert(entry);
        }
        if let Some(profile) = profile {
            state.set_profile(Some(owner), profile);
        }
        debug!(owner, "Registered command batch");
        Ok(ids)
    }

    /// Removes a registration; handler and usage disappear together.
    pub fn unregister(&self, id: &str) -> bool {
        match self.write() {
            Ok(mut state) => state.remove(id).is_some(),
            Err(error) => {
                warn!(id, error = %error, "Failed to unregister command");
                false
            }
        }
    }

    /// Removes every command and profile registered by `owner` atomically.
    pub fn unregister_owner(&self, owner: &str) -> Result<Vec<String>, RegistryError> {
        let mut state = self.write()?;
        let ids: Vec<String> = state
            .entries
            .values()
            .filter(|entry| entry.owner.as_deref() == Some(owner))
            .map(|entry| entry.id.clone())
            .collect();
        for id in &ids {
            state.remove(id);
        }
        state.remove_profiles(owner);
        debug!(owner, removed = ids.len(), "Unregistered command batch");
        Ok(ids)
    }

    /// Installs or replaces the unowned language profile for a domain.
    pub fn set_domain_profile(&self, profile: DomainProfile) -> Result<(), RegistryError> {
        self.write()?.set_profile(None, profile);
        Ok(())
    }

    /// The most recently supplied profile for `domain` that is still registered.
    pub fn domain_profile(&self, domain: Domain) -> Option<DomainProfile> {
        self.read_or_warn()?
            .profiles
            .get(domain.agent_id())
            .and_then(|slots| slots.last())
            .map(|(_, profile)| profile.clone())
    }

    /// Usage entries for a domain, in registration order.
    pub fn get_domain_commands(&self, domain: Domain) -> Vec<CommandUsage> {
        self.usages_where(|entry| entry.command_type == CommandType::At && entry.usage.domain == Some(domain))
    }

    /// Usage entries for system commands, in registration order.
    pub fn get_system_commands(&self) -> Vec<CommandUsage> {
        self.usages_where(|entry| entry.command_type == CommandType::Slash)
    }

    pub fn get_all_usages(&self) -> Vec<CommandUsage> {
        self.usages_where(|_| true)
    }

    /// Domains that currently have at least one registered command.
    pub fn domains(&self) -> Vec<Domain> {
        let mut domains: Vec<Domain> = Vec::new();
        for usage in self.get_all_usages() {
            if let Some(domain) = usage.domain
                && !domains.contains(&domain)
            {
                domains.push(domain);
            }
        }
        domains
    }

    pub fn get_handler(&self, agent_id: &str, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.resolve(agent_id, command).map(|resolved| resolved.handler)
    }

    /// Resolves a handler together with its id and usage.
    pub fn resolve(&self, agent_id: &str, command: &str) -> Option<ResolvedCommand> {
        let state = self.read_or_warn()?;
        state.get(agent_id, command).map(|entry| ResolvedCommand {
            id: entry.id.clone(),
            usage: entry.usage.clone(),
            handler: Arc::clone(&entry.handler),
        })
    }

    pub fn contains(&self, agent_id: &str, command: &str) -> bool {
        self.read_or_warn().is_some_and(|state| state.get(agent_id, command).is_some())
    }

    /// Whether any agent command is registered for `domain`.
    pub fn has_domain(&self, domain: Domain) -> bool {
        self.read_or_warn().is_some_and(|state| {
            state
                .entries
                .values()
                .any(|entry| entry.command_type == CommandType::At && entry.usage.domain == Some(domain))
        })
    }

    pub fn len(&self) -> usize {
        self.read_or_warn().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn usages_where(&self, predicate: impl Fn(&RegisteredCommand) -> bool) -> Vec<CommandUsage> {
        self.read_or_warn()
            .map(|state| {
                state
                    .entries
                    .values()
                    .filter(|entry| predicate(entry))
                    .map(|entry| entry.usage.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn read_or_warn(&self) -> Option<RwLockReadGuard<'_, RegistryState>> {
        self.read().inspect_err(|error| warn!(error = %error, "Command registry unavailable")).ok()
    }
}

fn build_entry(domain: Option<Domain>, command: PluginCommand, owner: Option<&str>) -> Result<RegisteredCommand, RegistryError> {
    let name = command.name.trim().to_lowercase();
    if name.is_empty() {
        return Err(RegistryError::EmptyCommand);
    }

    // System commands live in the `core` namespace whatever plugin supplies them.
    let domain = if command.command_type == CommandType::Slash { None } else { domain };
    let agent_id = namespace_for(command.command_type, domain).ok_or_else(|| RegistryError::InvalidNamespace {
        command: name.clone(),
        reason: match command.command_type {
            CommandType::At => "agent commands require a domain".to_string(),
            _ => "command type must be At or Slash".to_string(),
        },
    })?;

    let id = match command.meta.id.as_deref() {
        Some(id) if id.trim().is_empty() => return Err(RegistryError::EmptyId),
        Some(id) => id.trim().to_string(),
        None => format!("{agent_id}:{name}"),
    };

    let handler = command.handler.ok_or_else(|| RegistryError::MissingHandler { command: name.clone() })?;

    Ok(RegisteredCommand {
        usage: command.meta.to_usage(&agent_id, domain, &name),
        id,
        owner: owner.map(str::to_string),
        command_type: command.command_type,
        handler,
    })
}
