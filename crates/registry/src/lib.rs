//! Registry crate for Parley command handlers.
//!
//! Holds, by namespace, every invocable command together with its usage
//! metadata, the language profiles plugins supply for their domains, and the
//! typo-tolerant suggestion ranking used by the parser and dispatcher.

pub mod command;
pub mod handler;
pub mod models;
pub mod profile;
pub mod search;

pub use command::{CommandMeta, PluginCommand};
pub use handler::{CommandHandler, CommandInvocation, FnHandler, HandlerError, handler_fn};
pub use models::{CommandRegistry, RegistryError, ResolvedCommand};
pub use profile::{ArgExtractor, DomainProfile, TriggerSet};
pub use search::{DEFAULT_SUGGESTION_LIMIT, SUGGESTION_DISTANCE_THRESHOLD, Suggestion, rank_candidates, suggest_domains};
