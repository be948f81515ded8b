//! Grammar parser turning one line of text into a [`Command`].
//!
//! Grammar:
//! - `@<domain>:<command>[:<sub>] [args...] [--flag] [--key=value]`: structured agent command
//! - `@<domain> <free text>`: natural-language agent command (`command` left empty)
//! - `/<command> [args...] [--flag] [--key=value]`: system command
//!
//! The colon directly after the domain token is the only thing separating
//! the structured and natural-language forms. Anything without a leading
//! `@` or `/` is plain text and not a command. The parser never fails:
//! malformed lines come back with `has_error` set, a typed error kind, a
//! message and, where derivable, ranked suggestions.

use indexmap::IndexMap;
use parley_registry::{CommandRegistry, DEFAULT_SUGGESTION_LIMIT, suggest_domains};
use parley_types::{
    Command, CommandPrefix, CommandType, Domain, FlagValue, ParseErrorKind, ParsedCommand, SYSTEM_AGENT_ID,
};
use parley_util::{LexError, LexToken, lex_shell_like_ranged};
use serde_json::Value;
use tracing::debug;

/// Parses command lines against the current registry state.
#[derive(Clone)]
pub struct CommandParser {
    registry: CommandRegistry,
    suggestion_limit: usize,
}

impl CommandParser {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// Fast path: the dispatchable command, or `None` for plain text and grammar errors.
    pub fn parse(&self, input: &str) -> Option<Command> {
        self.parse_with_suggestions(input).into_command()
    }

    /// UI path: always returns a value, flagging non-commands with `CommandType::None`.
    pub fn parse_with_suggestions(&self, input: &str) -> ParsedCommand {
        let trimmed = input.trim();
        let Some(first) = trimmed.chars().next() else {
            return ParsedCommand::ok(Command::plain(input));
        };

        let parsed = match CommandPrefix::from_leading_char(first) {
            CommandPrefix::At => self.parse_agent(input, &trimmed[1..]),
            CommandPrefix::Slash => self.parse_system(input, &trimmed[1..]),
            CommandPrefix::None => ParsedCommand::ok(Command::plain(input)),
        };

        if parsed.has_error {
            debug!(input, error = ?parsed.error_message, "Command parse failed");
        }
        parsed
    }

    fn parse_agent(&self, raw_input: &str, body: &str) -> ParsedCommand {
        let (head, tail) = split_head(body);

        let Some((domain_token, command_part)) = head.split_once(':') else {
            return self.parse_natural_language(raw_input, head, tail);
        };

        let domain_token = domain_token.to_lowercase();
        let (command_name, sub_command) = split_command(command_part);
        let mut diagnostic = diagnostic_command(CommandPrefix::At, raw_input, &domain_token, &command_name);

        let Some(domain) = Domain::from_token(&domain_token) else {
            let suggestions = self.unknown_domain_suggestions(&domain_token, &command_name);
            let message = if domain_token.is_empty() {
                "expected a domain after '@'".to_string()
            } else {
                format!("unknown domain '{domain_token}'")
            };
            return ParsedCommand::error(diagnostic, ParseErrorKind::UnknownDomain, message, suggestions);
        };
        diagnostic.agent_id = domain.agent_id().to_string();

        if command_name.is_empty() {
            let suggestions = self.domain_suggestions(domain);
            let message = format!("missing command after '@{}:'", domain.agent_id());
            return ParsedCommand::error(diagnostic, ParseErrorKind::MissingCommand, message, suggestions);
        }

        let arguments = match classify_tokens(tail) {
            Ok(arguments) => arguments,
            Err(error) => return ParsedCommand::error(diagnostic, ParseErrorKind::UnterminatedQuote, error.to_string(), Vec::new()),
        };

        if !self.registry.contains(domain.agent_id(), &command_name) {
            let typed = format!("@{}:{}", domain.agent_id(), command_name);
            let suggestions = self.registry.suggest_invocations(&typed, self.suggestion_limit);
            let message = format!("unknown command '{typed}'");
            return ParsedCommand::error(diagnostic, ParseErrorKind::UnknownCommand, message, suggestions);
        }

        let mut command = Command::agent(domain, command_name, arguments.args);
        command.sub_command = sub_command;
        command.flags = arguments.flags;
        command.options = arguments.options;
        command.raw_input = raw_input.to_string();
        ParsedCommand::ok(command)
    }

    fn parse_natural_language(&self, raw_input: &str, domain_token: &str, text: &str) -> ParsedCommand {
        let domain_token = domain_token.to_lowercase();
        let diagnostic = diagnostic_command(CommandPrefix::At, raw_input, &domain_token, "");

        let Some(domain) = Domain::from_token(&domain_token) else {
            let suggestions = self.unknown_domain_suggestions(&domain_token, "");
            let message = if domain_token.is_empty() {
                "expected a domain after '@'".to_string()
            } else {
                format!("unknown domain '{domain_token}'")
            };
            return ParsedCommand::error(diagnostic, ParseErrorKind::UnknownDomain, message, suggestions);
        };

        let text = text.trim();
        if text.is_empty() {
            let suggestions = self.domain_suggestions(domain);
            let message = format!("expected ':<command>' or free text after '@{}'", domain.agent_id());
            let mut diagnostic = diagnostic;
            diagnostic.agent_id = domain.agent_id().to_string();
            return ParsedCommand::error(diagnostic, ParseErrorKind::MissingCommand, message, suggestions);
        }

        ParsedCommand::ok(Command::natural_language(domain, text, raw_input))
    }

    fn parse_system(&self, raw_input: &str, body: &str) -> ParsedCommand {
        let (head, tail) = split_head(body);
        let command_name = head.to_lowercase();
        let diagnostic = diagnostic_command(CommandPrefix::Slash, raw_input, SYSTEM_AGENT_ID, &command_name);

        if command_name.is_empty() {
            let suggestions = self
                .registry
                .get_system_commands()
                .into_iter()
                .take(self.suggestion_limit)
                .map(|usage| format!("/{}", usage.command))
                .collect();
            return ParsedCommand::error(diagnostic, ParseErrorKind::MissingCommand, "missing command after '/'", suggestions);
        }

        let arguments = match classify_tokens(tail) {
            Ok(arguments) => arguments,
            Err(error) => return ParsedCommand::error(diagnostic, ParseErrorKind::UnterminatedQuote, error.to_string(), Vec::new()),
        };

        if !self.registry.contains(SYSTEM_AGENT_ID, &command_name) {
            let typed = format!("/{command_name}");
            let suggestions = self.registry.suggest_invocations(&typed, self.suggestion_limit);
            let message = format!("unknown command '{typed}'");
            return ParsedCommand::error(diagnostic, ParseErrorKind::UnknownCommand, message, suggestions);
        }

        let mut command = Command::system(command_name, arguments.args);
        command.flags = arguments.flags;
        command.options = arguments.options;
        command.raw_input = raw_input.to_string();
        ParsedCommand::ok(command)
    }

    /// Commands of a domain, or nearby domains, for an unknown domain token.
    fn unknown_domain_suggestions(&self, domain_token: &str, command_name: &str) -> Vec<String> {
        let mut suggestions = Vec::new();
        if !command_name.is_empty() {
            let typed = format!("@{domain_token}:{command_name}");
            suggestions.extend(self.registry.suggest_invocations(&typed, self.suggestion_limit));
        }
        if domain_token.is_empty() {
            suggestions.extend(self.registry.domains().into_iter().map(|domain| format!("@{}", domain.agent_id())));
        } else {
            suggestions.extend(
                suggest_domains(domain_token, self.suggestion_limit)
                    .into_iter()
                    .map(|suggestion| suggestion.invocation),
            );
        }
        dedup_preserving_order(&mut suggestions);
        suggestions.truncate(self.suggestion_limit);
        suggestions
    }

    fn domain_suggestions(&self, domain: Domain) -> Vec<String> {
        self.registry
            .get_domain_commands(domain)
            .into_iter()
            .take(self.suggestion_limit)
            .map(|usage| format!("@{}:{}", usage.agent_id, usage.command))
            .collect()
    }
}

/// Positional args, flags and options extracted from the tail of a command.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedArguments {
    pub args: Vec<String>,
    pub flags: IndexMap<String, FlagValue>,
    pub options: IndexMap<String, Value>,
}

/// Splits the tail of a command line into args, flags and options.
///
/// - `--name` sets boolean flag `name`
/// - `--name=value` sets option `name` (numbers and booleans are typed)
/// - `--` ends flag parsing; later tokens are positional
/// - `-x` followed by a value records option `x` and keeps the value positional;
///   a trailing `-x` becomes boolean flag `x`
/// - quoted tokens are always positional
pub fn classify_tokens(tail: &str) -> Result<ParsedArguments, LexError> {
    let tokens = lex_shell_like_ranged(tail)?;
    let mut parsed = ParsedArguments::default();
    let mut index = 0;
    let mut positional_only = false;

    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;

        if positional_only || token.is_quoted() {
            parsed.args.push(token.value());
            continue;
        }

        let value = token.value();
        if value == "--" {
            positional_only = true;
            continue;
        }

        if let Some(body) = value.strip_prefix("--").filter(|body| !body.is_empty()) {
            match body.split_once('=') {
                Some((name, option_value)) => {
                    parsed.options.insert(name.to_string(), typed_option_value(option_value));
                }
                None => {
                    parsed.flags.insert(body.to_string(), FlagValue::Bool(true));
                }
            }
            continue;
        }

        if let Some(letters) = short_marker(&value) {
            match tokens.get(index).filter(|next| next.is_quoted() || !is_flag_like(next)) {
                Some(next) => {
                    let next_value = next.value();
                    parsed.options.insert(letters.to_string(), Value::String(next_value.clone()));
                    parsed.args.push(next_value);
                    index += 1;
                }
                None => {
                    parsed.flags.insert(letters.to_string(), FlagValue::Bool(true));
                }
            }
            continue;
        }

        parsed.args.push(value);
    }

    Ok(parsed)
}

/// Splits at the first whitespace: `("git:status", " --verbose")`.
fn split_head(body: &str) -> (&str, &str) {
    match body.find(char::is_whitespace) {
        Some(index) => (&body[..index], &body[index..]),
        None => (body, ""),
    }
}

/// `stash:pop` becomes `("stash", Some("pop"))`.
fn split_command(command_part: &str) -> (String, Option<String>) {
    match command_part.split_once(':') {
        Some((command, sub)) if !sub.is_empty() => (command.to_lowercase(), Some(sub.to_lowercase())),
        Some((command, _)) => (command.to_lowercase(), None),
        None => (command_part.to_lowercase(), None),
    }
}

/// Best-effort command filled for diagnostics; type stays `None` so it is never dispatched.
fn diagnostic_command(prefix: CommandPrefix, raw_input: &str, agent_id: &str, command: &str) -> Command {
    Command {
        prefix,
        command_type: CommandType::None,
        agent_id: agent_id.to_string(),
        command: command.to_string(),
        raw_input: raw_input.to_string(),
        ..Default::default()
    }
}

fn short_marker(value: &str) -> Option<&str> {
    let letters = value.strip_prefix('-')?;
    if letters.is_empty() || letters.starts_with('-') || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(letters)
}

fn is_flag_like(token: &LexToken<'_>) -> bool {
    let value = token.value();
    value.starts_with("--") || short_marker(&value).is_some()
}

fn typed_option_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn dedup_preserving_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|value| seen.insert(value.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_registry::{CommandMeta, handler_fn};
    use parley_types::CommandResult;
    use proptest::prelude::*;

    fn build_parser() -> CommandParser {
        let registry = CommandRegistry::new();
        for command in ["status", "commit", "log", "stash"] {
            registry.register_agent_command(
                Domain::VersionControl,
                command,
                handler_fn(|_| Ok(CommandResult::success())),
                CommandMeta::default(),
            );
        }
        registry.register_agent_command(Domain::IssueTracker, "list", handler_fn(|_| Ok(CommandResult::success())), CommandMeta::default());
        registry.register_system_command("help", handler_fn(|_| Ok(CommandResult::success())), CommandMeta::default());
        CommandParser::new(registry)
    }

    #[test]
    fn parses_structured_agent_command() {
        let parser = build_parser();
        let command = parser.parse("@git:status").unwrap();
        assert_eq!(command.prefix, CommandPrefix::At);
        assert_eq!(command.command_type, CommandType::At);
        assert_eq!(command.domain, Some(Domain::VersionControl));
        assert_eq!(command.agent_id, "git");
        assert_eq!(command.command, "status");
        assert!(command.args.is_empty());
        assert_eq!(command.raw_input, "@git:status");
    }

    #[test]
    fn quoted_commit_message_is_one_arg() {
        let parser = build_parser();
        let command = parser.parse("@git:commit -m \"fix bug\"").unwrap();
        assert_eq!(command.args, vec!["fix bug"]);
        assert!(command.flags.is_empty());
        assert_eq!(command.options.get("m"), Some(&Value::String("fix bug".into())));
    }

    #[test]
    fn flags_and_options_are_separated() {
        let parser = build_parser();
        let command = parser.parse("@git:log main --verbose --limit=5 --author='Jane Doe' --dry=true").unwrap();
        assert_eq!(command.args, vec!["main"]);
        assert_eq!(command.flags.get("verbose"), Some(&FlagValue::Bool(true)));
        assert_eq!(command.options.get("limit"), Some(&Value::from(5)));
        assert_eq!(command.options.get("author"), Some(&Value::String("Jane Doe".into())));
        assert_eq!(command.options.get("dry"), Some(&Value::Bool(true)));
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let arguments = classify_tokens("--verbose -- --not-a-flag -5").unwrap();
        assert_eq!(arguments.args, vec!["--not-a-flag", "-5"]);
        assert_eq!(arguments.flags.len(), 1);
    }

    #[test]
    fn trailing_short_marker_is_boolean_flag() {
        let arguments = classify_tokens("-5 -v").unwrap();
        assert_eq!(arguments.args, vec!["-5"]);
        assert_eq!(arguments.flags.get("v"), Some(&FlagValue::Bool(true)));
    }

    #[test]
    fn sub_command_is_split_off() {
        let parser = build_parser();
        let command = parser.parse("@git:stash:pop").unwrap();
        assert_eq!(command.command, "stash");
        assert_eq!(command.sub_command.as_deref(), Some("pop"));
    }

    #[test]
    fn natural_language_form_keeps_free_text() {
        let parser = build_parser();
        let command = parser.parse("@jira 이슈 목록 보여줘").unwrap();
        assert_eq!(command.domain, Some(Domain::IssueTracker));
        assert_eq!(command.command, "");
        assert_eq!(command.args, vec!["이슈 목록 보여줘"]);
        assert!(command.is_natural_language());
    }

    #[test]
    fn domain_aliases_resolve_to_canonical_agent_id() {
        let parser = build_parser();
        let command = parser.parse("@VCS:status").unwrap();
        assert_eq!(command.agent_id, "git");
    }

    #[test]
    fn parses_system_command() {
        let parser = build_parser();
        let command = parser.parse("/help git").unwrap();
        assert_eq!(command.command_type, CommandType::Slash);
        assert_eq!(command.domain, None);
        assert_eq!(command.agent_id, "core");
        assert_eq!(command.args, vec!["git"]);
    }

    #[test]
    fn typo_yields_ranked_suggestions() {
        let parser = build_parser();
        let parsed = parser.parse_with_suggestions("@git:statu");
        assert!(parsed.has_error);
        assert_eq!(parsed.error_kind, Some(ParseErrorKind::UnknownCommand));
        assert_eq!(parsed.suggestions.first().map(String::as_str), Some("@git:status"));
        assert_eq!(parsed.command.command, "statu");
        assert_eq!(parsed.command.command_type, CommandType::None);
        assert!(parser.parse("@git:statu").is_none());
    }

    #[test]
    fn unknown_domain_is_an_error() {
        let parser = build_parser();
        let parsed = parser.parse_with_suggestions("@gti:status");
        assert!(parsed.has_error);
        assert_eq!(parsed.error_kind, Some(ParseErrorKind::UnknownDomain));
        assert!(parsed.suggestions.contains(&"@git:status".to_string()));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let parser = build_parser();
        let parsed = parser.parse_with_suggestions("@git:commit \"fix bug");
        assert_eq!(parsed.error_kind, Some(ParseErrorKind::UnterminatedQuote));
    }

    #[test]
    fn missing_command_is_an_error() {
        let parser = build_parser();
        assert_eq!(parser.parse_with_suggestions("@git:").error_kind, Some(ParseErrorKind::MissingCommand));
        assert_eq!(parser.parse_with_suggestions("@git").error_kind, Some(ParseErrorKind::MissingCommand));
        assert_eq!(parser.parse_with_suggestions("/").error_kind, Some(ParseErrorKind::MissingCommand));
        assert_eq!(parser.parse_with_suggestions("/").suggestions, vec!["/help"]);
    }

    #[test]
    fn plain_text_and_whitespace_are_not_commands() {
        let parser = build_parser();
        for input in ["", "   ", "show me what changed"] {
            let parsed = parser.parse_with_suggestions(input);
            assert!(!parsed.has_error);
            assert_eq!(parsed.command.command_type, CommandType::None);
            assert!(parser.parse(input).is_none());
        }
    }

    proptest! {
        #[test]
        fn parsing_is_deterministic(input in "[@/]?[a-z:]{0,12}( [a-z\"'=-]{0,8}){0,3}") {
            let parser = build_parser();
            prop_assert_eq!(parser.parse_with_suggestions(&input), parser.parse_with_suggestions(&input));
        }

        #[test]
        fn parsed_commands_match_prefix_and_domain(input in "[@/]?(git|jira|gti|help|core)?:?[a-z]{0,8}( [a-z]{1,5}){0,3}") {
            let parser = build_parser();
            if let Some(command) = parser.parse(&input) {
                match command.command_type {
                    CommandType::At => prop_assert!(command.domain.is_some()),
                    CommandType::Slash => {
                        prop_assert!(command.domain.is_none());
                        prop_assert!(!command.command.is_empty());
                    }
                    CommandType::None => prop_assert!(false, "dispatchable command without a type"),
                }
            }
        }
    }
}
