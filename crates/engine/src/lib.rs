//! Parley engine: grammar parsing, natural-language conversion and dispatch.
//!
//! A [`Session`] wires one [`CommandRegistry`](parley_registry::CommandRegistry),
//! one [`PluginRegistry`](parley_plugin::PluginRegistry) and one [`Dispatcher`].
//! Most callers need only [`Session::execute_from_string`] and
//! [`Session::parse_with_suggestions`].

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod llm;
pub mod parser;
pub mod session;

pub use config::{ConverterConfig, DispatcherConfig, ParleyConfig, PluginsConfig};
pub use convert::{ConversionError, NaturalLanguageConverter};
pub use dispatch::{Dispatcher, ExecutionHistory, ExecutionOptions};
pub use llm::{LanguageModel, LanguageModelError};
pub use parser::{CommandParser, ParsedArguments, classify_tokens};
pub use session::Session;
