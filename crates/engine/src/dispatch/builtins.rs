//! System commands every session carries in the `core` namespace.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_registry::{CommandHandler, CommandInvocation, CommandMeta, CommandRegistry, HandlerError, PluginCommand, RegistryError};
use parley_types::{CommandResult, CommandUsage, Domain, SYSTEM_AGENT_ID};
use serde_json::json;

use super::history::ExecutionHistory;

pub const HELP_COMMAND: &str = "help";
pub const HISTORY_COMMAND: &str = "history";
const DEFAULT_HISTORY_PAGE: usize = 10;

/// Registers `/help` and `/history` owned by the `core` namespace.
pub fn register_builtin_commands(registry: &CommandRegistry, history: Arc<Mutex<ExecutionHistory>>) -> Result<Vec<String>, RegistryError> {
    let help = PluginCommand::system(
        HELP_COMMAND,
        CommandMeta::new("List available commands")
            .with_syntax("/help [domain]")
            .with_examples(["/help", "/help git"])
            .with_arg("domain", "Only list commands of this domain", false),
    )
    .with_handler(Arc::new(HelpHandler {
        registry: registry.clone(),
    }));

    let history = PluginCommand::system(
        HISTORY_COMMAND,
        CommandMeta::new("Show recent executions")
            .with_syntax("/history [limit]")
            .with_examples(["/history", "/history 5"])
            .with_arg("limit", "Number of executions to show", false),
    )
    .with_handler(Arc::new(HistoryHandler { history }));

    registry.register_batch(SYSTEM_AGENT_ID, None, vec![help, history], None)
}

struct HelpHandler {
    registry: CommandRegistry,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn execute(&self, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        let mut sections = Vec::new();

        match invocation.args.first() {
            Some(token) => {
                let domain = Domain::from_token(token).ok_or_else(|| HandlerError::invalid_arguments(format!("unknown domain '{token}'")))?;
                sections.push(render_section(&format!("@{domain}"), &self.registry.get_domain_commands(domain)));
            }
            None => {
                sections.push(render_section("System commands", &self.registry.get_system_commands()));
                for domain in self.registry.domains() {
                    sections.push(render_section(&format!("@{domain}"), &self.registry.get_domain_commands(domain)));
                }
            }
        }

        Ok(CommandResult::markdown(sections.join("\n")))
    }
}

fn render_section(title: &str, usages: &[CommandUsage]) -> String {
    let mut section = format!("## {title}\n");
    if usages.is_empty() {
        section.push_str("_No commands registered._\n");
    }
    for usage in usages {
        let invocation = match usage.domain {
            Some(domain) => format!("@{domain}:{}", usage.command),
            None => format!("/{}", usage.command),
        };
        section.push_str(&format!("- `{invocation}`"));
        if !usage.description.is_empty() {
            section.push_str(&format!(": {}", usage.description));
        }
        section.push('\n');
    }
    section
}

struct HistoryHandler {
    history: Arc<Mutex<ExecutionHistory>>,
}

#[async_trait]
impl CommandHandler for HistoryHandler {
    async fn execute(&self, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        let limit = match invocation.args.first() {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| HandlerError::invalid_arguments(format!("limit must be a positive number, got '{raw}'")))?,
            None => DEFAULT_HISTORY_PAGE,
        };

        let records = self
            .history
            .lock()
            .map_err(|error| HandlerError::failed(format!("history unavailable: {error}")))?
            .recent(limit);

        let entries: Vec<_> = records
            .iter()
            .map(|record| {
                json!({
                    "executionId": record.execution_id,
                    "invocation": record.command.invocation_key(),
                    "rawInput": record.command.raw_input,
                    "success": record.result.success,
                    "timestamp": record.timestamp.to_rfc3339(),
                })
            })
            .collect();

        Ok(CommandResult::json(json!(entries)).with_message(format!("{} recent execution(s)", entries.len())))
    }
}
