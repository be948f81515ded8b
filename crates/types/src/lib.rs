//! Shared data shapes for Parley: what the parser produces, what the
//! converter resolves, what the registry publishes and what the dispatcher
//! returns. This crate carries no behavior beyond constructors and
//! invariant checks.

pub mod command;
pub mod conversion;
pub mod domain;
pub mod result;
pub mod usage;

pub use command::{Command, CommandPrefix, CommandType, FlagValue, ParseErrorKind, ParsedCommand, invocation_key};
pub use conversion::{CommandConversion, ConversionAlternative, ConversionSource};
pub use domain::{Domain, SYSTEM_AGENT_ID, UnknownDomainError};
pub use result::{CommandResult, DisplayMode, ExecutionRecord};
pub use usage::{ArgumentDoc, CommandUsage, OptionDoc};
