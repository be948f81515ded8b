//! Dispatcher: parse, convert, resolve, invoke, record.
//!
//! Every failure below this layer (grammar errors, unresolvable natural
//! language, unknown commands, handler errors and panics) comes back as a
//! failed [`CommandResult`]; nothing propagates to the caller.

pub mod builtins;
pub mod history;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use parley_registry::{CommandInvocation, CommandRegistry, HandlerError, ResolvedCommand};
use parley_types::{Command, CommandConversion, CommandResult, CommandType, ExecutionRecord, ParsedCommand, SYSTEM_AGENT_ID};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::convert::NaturalLanguageConverter;
use crate::parser::CommandParser;

pub use builtins::{HELP_COMMAND, HISTORY_COMMAND, register_builtin_commands};
pub use history::ExecutionHistory;

/// Per-invocation settings supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Key accepted by [`Dispatcher::cancel`]; generated as `exec-<n>` when absent.
    pub execution_id: Option<String>,
    /// Token handed to the handler; a fresh one is created when absent.
    pub cancellation: Option<CancellationToken>,
}

impl ExecutionOptions {
    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Single entry point turning input lines into executed commands.
pub struct Dispatcher {
    registry: CommandRegistry,
    parser: CommandParser,
    converter: NaturalLanguageConverter,
    history: Arc<Mutex<ExecutionHistory>>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
    next_execution: AtomicU64,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Builds a dispatcher and registers the built-in system commands.
    pub fn new(registry: CommandRegistry, converter: NaturalLanguageConverter, config: DispatcherConfig) -> Self {
        let history = Arc::new(Mutex::new(ExecutionHistory::new(config.history_limit)));
        if let Err(error) = register_builtin_commands(&registry, history.clone()) {
            warn!(error = %error, "Failed to register built-in commands");
        }

        Self {
            parser: CommandParser::new(registry.clone()).with_suggestion_limit(config.max_suggestions),
            registry,
            converter,
            history,
            in_flight: Mutex::new(HashMap::new()),
            next_execution: AtomicU64::new(0),
            config,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn converter(&self) -> &NaturalLanguageConverter {
        &self.converter
    }

    /// Live validation for UIs; never executes anything.
    pub fn parse_with_suggestions(&self, raw: &str) -> ParsedCommand {
        self.parser.parse_with_suggestions(raw)
    }

    pub async fn execute_from_string(&self, raw: &str) -> CommandResult {
        self.execute_from_string_with(raw, ExecutionOptions::default()).await
    }

    pub async fn execute_from_string_with(&self, raw: &str, options: ExecutionOptions) -> CommandResult {
        let parsed = self.parser.parse_with_suggestions(raw);

        if parsed.has_error {
            let execution_id = self.execution_id(options.execution_id);
            let message = parsed.error_message.clone().unwrap_or_else(|| "invalid command".to_string());
            let result = CommandResult::failure(message).with_suggestions(self.or_help(parsed.suggestions.clone()));
            return self.record(execution_id, parsed.command, result);
        }

        if parsed.command.command_type == CommandType::None {
            return match self.config.default_domain().filter(|_| !raw.trim().is_empty()) {
                Some(domain) => {
                    debug!(domain = %domain, "Routing plain text to default domain");
                    self.execute_with(Command::natural_language(domain, raw.trim(), raw), options).await
                }
                None => {
                    let execution_id = self.execution_id(options.execution_id);
                    let result = CommandResult::failure("not a command: start with @<domain> or /<command>").with_suggestions(self.or_help(Vec::new()));
                    self.record(execution_id, parsed.command, result)
                }
            };
        }

        self.execute_with(parsed.command, options).await
    }

    /// Executes an already-parsed command, e.g. a programmatic retry.
    pub async fn execute(&self, command: Command) -> CommandResult {
        self.execute_with(command, ExecutionOptions::default()).await
    }

    pub async fn execute_with(&self, mut command: Command, options: ExecutionOptions) -> CommandResult {
        let execution_id = self.execution_id(options.execution_id);

        if command.command_type == CommandType::None || !command.is_well_formed() {
            let result = CommandResult::failure("not a dispatchable command").with_suggestions(self.or_help(Vec::new()));
            return self.record(execution_id, command, result);
        }

        let mut conversion = None;
        if command.is_natural_language()
            && let Some(domain) = command.domain
        {
            let text = command.natural_language_text().unwrap_or_default().to_string();
            match self.converter.convert(domain, &text).await {
                Ok(resolved) => {
                    command.command = resolved.command.to_lowercase();
                    command.args = resolved.args.clone();
                    conversion = Some(resolved);
                }
                Err(error) => {
                    warn!(execution_id = %execution_id, error = %error, "Natural-language conversion failed");
                    let suggestions = self
                        .registry
                        .get_domain_commands(domain)
                        .into_iter()
                        .take(self.config.max_suggestions)
                        .map(|usage| format!("@{}:{}", usage.agent_id, usage.command))
                        .collect();
                    let result = CommandResult::failure(error.to_string()).with_suggestions(self.or_help(suggestions));
                    return self.record(execution_id, command, result);
                }
            }
        }

        let Some(resolved) = self.registry.resolve(&command.agent_id, &command.command) else {
            let invocation = command.invocation_key();
            let suggestions = self.registry.suggest_invocations(&invocation, self.config.max_suggestions);
            debug!(execution_id = %execution_id, invocation = %invocation, "No handler registered");
            let result = CommandResult::failure(format!("unknown command '{invocation}'")).with_suggestions(self.or_help(suggestions));
            return self.record(execution_id, command, annotate(result, conversion, self.config.low_confidence_threshold));
        };

        let cancellation = options.cancellation.unwrap_or_default();
        let Some(in_flight) = self.track(&execution_id, cancellation.clone()) else {
            warn!(execution_id = %execution_id, "Execution id already in flight");
            let result = CommandResult::failure(format!("execution '{execution_id}' is already running"));
            return self.record(execution_id, command, result);
        };
        let invocation = CommandInvocation::from_command(execution_id.clone(), &command, cancellation);
        let result = self.invoke(resolved, invocation).await;
        drop(in_flight);

        let result = annotate(result, conversion, self.config.low_confidence_threshold);
        self.record(execution_id, command, result)
    }

    /// Signals the cancellation token of an in-flight execution.
    ///
    /// Returns `false` when no execution with that id is running. Handlers
    /// that ignore the token run to completion.
    pub fn cancel(&self, execution_id: &str) -> bool {
        let Ok(in_flight) = self.in_flight.lock() else {
            warn!(execution_id, "In-flight table unavailable");
            return false;
        };
        match in_flight.get(execution_id) {
            Some(token) => {
                token.cancel();
                info!(execution_id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Ids of executions whose handlers are still running.
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight.lock().map(|in_flight| in_flight.keys().cloned().collect()).unwrap_or_default()
    }

    /// The most recent `limit` executions, oldest first.
    pub fn get_execution_history(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.history.lock().map(|history| history.recent(limit)).unwrap_or_default()
    }

    /// The latest recorded execution with `execution_id`, if still retained.
    pub fn get_execution(&self, execution_id: &str) -> Option<ExecutionRecord> {
        let history = self.history.lock().ok()?;
        history.find(execution_id).cloned()
    }

    async fn invoke(&self, resolved: ResolvedCommand, invocation: CommandInvocation) -> CommandResult {
        let execution_id = invocation.execution_id.clone();
        let handler = resolved.handler;
        debug!(execution_id = %execution_id, command = %resolved.id, "Invoking handler");

        let task = tokio::spawn(async move { handler.execute(invocation).await });
        match task.await {
            Ok(Ok(result)) => result,
            Ok(Err(HandlerError::Cancelled)) => {
                info!(execution_id = %execution_id, "Handler honored cancellation");
                CommandResult::failure(HandlerError::Cancelled.to_string())
            }
            Ok(Err(error)) => {
                warn!(execution_id = %execution_id, command = %resolved.id, error = %error, "Handler failed");
                CommandResult::failure(error.to_string())
            }
            Err(join_error) => {
                warn!(execution_id = %execution_id, command = %resolved.id, error = %join_error, "Handler task did not complete");
                let message = if join_error.is_panic() { "command handler panicked" } else { "command handler was aborted" };
                CommandResult::failure(message)
            }
        }
    }

    fn execution_id(&self, supplied: Option<String>) -> String {
        match supplied.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => format!("exec-{}", self.next_execution.fetch_add(1, Ordering::Relaxed) + 1),
        }
    }

    /// Registers `execution_id` as running. Returns `None` when the id is already in flight.
    fn track(&self, execution_id: &str, token: CancellationToken) -> Option<InFlightGuard<'_>> {
        match self.in_flight.lock() {
            Ok(mut in_flight) => {
                if in_flight.contains_key(execution_id) {
                    return None;
                }
                in_flight.insert(execution_id.to_string(), token);
            }
            Err(error) => warn!(execution_id, error = %error, "In-flight table unavailable"),
        }
        Some(InFlightGuard {
            table: &self.in_flight,
            execution_id: execution_id.to_string(),
        })
    }

    fn or_help(&self, suggestions: Vec<String>) -> Vec<String> {
        if suggestions.is_empty() && self.registry.contains(SYSTEM_AGENT_ID, HELP_COMMAND) {
            return vec![format!("/{HELP_COMMAND}")];
        }
        suggestions
    }

    fn record(&self, execution_id: String, command: Command, result: CommandResult) -> CommandResult {
        match self.history.lock() {
            Ok(mut history) => history.push(ExecutionRecord {
                execution_id,
                command,
                result: result.clone(),
                timestamp: Utc::now(),
            }),
            Err(error) => warn!(error = %error, "Execution history unavailable"),
        }
        result
    }
}

/// Removes an execution from the in-flight table when dropped, including
/// when the caller abandons the dispatch future mid-await.
struct InFlightGuard<'a> {
    table: &'a Mutex<HashMap<String, CancellationToken>>,
    execution_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.table.lock() {
            in_flight.remove(&self.execution_id);
        }
    }
}

/// Attaches the conversion and, below `threshold`, a low-confidence warning.
fn annotate(mut result: CommandResult, conversion: Option<CommandConversion>, threshold: f64) -> CommandResult {
    let Some(conversion) = conversion else {
        return result;
    };

    if conversion.confidence < threshold {
        let warning = format!(
            "Low confidence ({:.2}) interpreting the request as '{}': {}",
            conversion.confidence, conversion.command, conversion.explanation
        );
        result.message = Some(match result.message.take() {
            Some(message) => format!("{warning}\n\n{message}"),
            None => warning,
        });
    }
    result.conversion = Some(conversion);
    result
}
