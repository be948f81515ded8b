//! Parsed command shapes shared by the parser, converter and dispatcher.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Domain, SYSTEM_AGENT_ID};

/// Leading character that selects the command namespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandPrefix {
    /// Plain text; not a command.
    #[default]
    None,
    /// `@`: agent command scoped to a domain.
    At,
    /// `/`: system command without a domain.
    Slash,
}

impl CommandPrefix {
    /// Maps the first character of an input line to a prefix.
    pub fn from_leading_char(character: char) -> Self {
        match character {
            '@' => CommandPrefix::At,
            '/' => CommandPrefix::Slash,
            _ => CommandPrefix::None,
        }
    }

    /// Prefix character used when rendering commands.
    pub fn symbol(&self) -> &'static str {
        match self {
            CommandPrefix::None => "",
            CommandPrefix::At => "@",
            CommandPrefix::Slash => "/",
        }
    }
}

/// Grammar rule the input satisfied.
///
/// Mirrors [`CommandPrefix`] but stays [`CommandType::None`] when a prefixed
/// string fails every grammar rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    None,
    At,
    Slash,
}

/// Value recorded for a `--flag` style token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(value) => Some(*value),
            FlagValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Text(value) => Some(value),
            FlagValue::Bool(_) => None,
        }
    }
}

/// The canonical resolved invocation.
///
/// Invariants upheld by every constructor in this crate and by the parser:
/// `At` commands carry a domain, `Slash` commands never do, and an empty
/// `command` only appears on `At` commands in natural-language form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub prefix: CommandPrefix,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub domain: Option<Domain>,
    /// Registry namespace: the domain's agent id, or `core` for system commands.
    pub agent_id: String,
    /// Empty while the command is still natural language.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: IndexMap<String, FlagValue>,
    #[serde(default)]
    pub options: IndexMap<String, Value>,
    pub raw_input: String,
}

impl Command {
    /// Builds a structured agent command, e.g. `@git:status`.
    pub fn agent(domain: Domain, command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        let raw_input = render_raw("@", Some(domain), &command, &args);
        Self {
            prefix: CommandPrefix::At,
            command_type: CommandType::At,
            domain: Some(domain),
            agent_id: domain.agent_id().to_string(),
            command,
            args,
            raw_input,
            ..Default::default()
        }
    }

    /// Builds a system command, e.g. `/help`.
    pub fn system(command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        let raw_input = render_raw("/", None, &command, &args);
        Self {
            prefix: CommandPrefix::Slash,
            command_type: CommandType::Slash,
            domain: None,
            agent_id: SYSTEM_AGENT_ID.to_string(),
            command,
            args,
            raw_input,
            ..Default::default()
        }
    }

    /// Builds the natural-language form `@<domain> <free text>`.
    pub fn natural_language(domain: Domain, text: impl Into<String>, raw_input: impl Into<String>) -> Self {
        Self {
            prefix: CommandPrefix::At,
            command_type: CommandType::At,
            domain: Some(domain),
            agent_id: domain.agent_id().to_string(),
            command: String::new(),
            args: vec![text.into()],
            raw_input: raw_input.into(),
            ..Default::default()
        }
    }

    /// Plain text that is not a command at all.
    pub fn plain(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            ..Default::default()
        }
    }

    /// True for `@<domain> <free text>` commands awaiting conversion.
    pub fn is_natural_language(&self) -> bool {
        self.command_type == CommandType::At && self.command.is_empty()
    }

    /// Free text carried by a natural-language command.
    pub fn natural_language_text(&self) -> Option<&str> {
        if self.is_natural_language() {
            self.args.first().map(String::as_str)
        } else {
            None
        }
    }

    /// Display form used in suggestions and history, e.g. `@git:status` or `/help`.
    pub fn invocation_key(&self) -> String {
        invocation_key(self.command_type, &self.agent_id, &self.command)
    }

    /// Checks the prefix/domain/command invariants.
    pub fn is_well_formed(&self) -> bool {
        match self.command_type {
            CommandType::At => self.domain.is_some(),
            CommandType::Slash => self.domain.is_none() && !self.command.is_empty(),
            CommandType::None => self.domain.is_none(),
        }
    }
}

/// Formats the user-facing invocation for a namespace/command pair.
pub fn invocation_key(command_type: CommandType, agent_id: &str, command: &str) -> String {
    match command_type {
        CommandType::At => format!("@{agent_id}:{command}"),
        CommandType::Slash => format!("/{command}"),
        CommandType::None => command.to_string(),
    }
}

fn render_raw(symbol: &str, domain: Option<Domain>, command: &str, args: &[String]) -> String {
    let mut raw = match domain {
        Some(domain) => format!("{symbol}{}:{command}", domain.agent_id()),
        None => format!("{symbol}{command}"),
    };
    for arg in args {
        raw.push(' ');
        if arg.chars().any(char::is_whitespace) {
            raw.push('"');
            raw.push_str(arg);
            raw.push('"');
        } else {
            raw.push_str(arg);
        }
    }
    raw
}

/// Category of grammar failure reported by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    UnknownDomain,
    UnknownCommand,
    MissingCommand,
    UnterminatedQuote,
}

/// Parser output for the UI path; never handed to the dispatcher while `has_error` is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCommand {
    #[serde(flatten)]
    pub command: Command,
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ParseErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Ranked by similarity, best first.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ParsedCommand {
    pub fn ok(command: Command) -> Self {
        Self {
            command,
            ..Default::default()
        }
    }

    pub fn error(command: Command, kind: ParseErrorKind, message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            command,
            has_error: true,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            suggestions,
        }
    }

    /// Whether the input matched a grammar rule without error.
    pub fn is_command(&self) -> bool {
        !self.has_error && self.command.command_type != CommandType::None
    }

    /// Consumes the wrapper, returning the command only when it is dispatchable.
    pub fn into_command(self) -> Option<Command> {
        if self.is_command() { Some(self.command) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_uphold_invariants() {
        assert!(Command::agent(Domain::VersionControl, "status", vec![]).is_well_formed());
        assert!(Command::system("help", vec![]).is_well_formed());
        assert!(Command::natural_language(Domain::IssueTracker, "list my issues", "@jira list my issues").is_well_formed());
        assert!(Command::plain("hello").is_well_formed());
    }

    #[test]
    fn invocation_keys_render_namespaces() {
        assert_eq!(Command::agent(Domain::VersionControl, "status", vec![]).invocation_key(), "@git:status");
        assert_eq!(Command::system("help", vec![]).invocation_key(), "/help");
    }

    #[test]
    fn agent_raw_input_quotes_spaced_args() {
        let command = Command::agent(Domain::VersionControl, "commit", vec!["fix bug".into()]);
        assert_eq!(command.raw_input, "@git:commit \"fix bug\"");
    }

    #[test]
    fn parsed_command_serializes_type_field() {
        let parsed = ParsedCommand::ok(Command::system("help", vec![]));
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["type"], "Slash");
        assert_eq!(json["agentId"], "core");
        assert_eq!(json["hasError"], false);
    }
}
