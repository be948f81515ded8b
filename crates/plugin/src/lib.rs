//! Plugin host for Parley.
//!
//! Plugins contribute agent commands for one domain (and optionally system
//! commands) together with the language profile the converter uses. The
//! [`PluginRegistry`] owns plugin instances and keeps the command registry
//! in step with their lifecycle.

pub mod plugin;
pub mod registry;
mod route;

pub use plugin::{Plugin, PluginError, PluginKind};
pub use registry::{PluginRegistry, PluginRegistryError, PluginSummary, WeakPluginRegistry};
