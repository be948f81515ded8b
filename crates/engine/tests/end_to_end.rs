use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parley_engine::{ConverterConfig, LanguageModel, LanguageModelError, ParleyConfig, Session};
use parley_plugin::{Plugin, PluginKind};
use parley_registry::{ArgExtractor, CommandInvocation, CommandMeta, DomainProfile, HandlerError, PluginCommand};
use parley_types::{CommandPrefix, CommandResult, CommandType, ConversionSource, Domain, ParseErrorKind};

struct CountingModel {
    reply: String,
    calls: AtomicUsize,
}

impl CountingModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for CountingModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LanguageModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

struct GitPlugin;

#[async_trait]
impl Plugin for GitPlugin {
    fn id(&self) -> &str {
        "git"
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::VersionControl)
    }

    fn get_commands(&self) -> Vec<PluginCommand> {
        vec![
            PluginCommand::agent("status", CommandMeta::new("Show working tree status").with_syntax("@git:status")),
            PluginCommand::agent(
                "commit",
                CommandMeta::new("Record changes").with_syntax("@git:commit -m <message>"),
            ),
            PluginCommand::agent("stash", CommandMeta::new("Stash changes")),
        ]
    }

    fn language_profile(&self) -> Option<DomainProfile> {
        Some(
            DomainProfile::new(Domain::VersionControl)
                .with_triggers("status", ["what changed", "변경 사항"])
                .with_triggers("commit", ["commit"])
                .with_extractor("commit", ArgExtractor::QuotedText)
                .with_default_command("status"),
        )
    }

    async fn execute_command(&self, name: &str, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        match name {
            "status" => Ok(CommandResult::text("nothing to commit, working tree clean")),
            "commit" => {
                let message = invocation
                    .option_str("m")
                    .or_else(|| invocation.args.first().cloned())
                    .ok_or_else(|| HandlerError::invalid_arguments("commit message required"))?;
                Ok(CommandResult::text(format!("committed: {message}")))
            }
            other => Err(HandlerError::failed(format!("unsupported command {other}"))),
        }
    }
}

struct JiraPlugin;

#[async_trait]
impl Plugin for JiraPlugin {
    fn id(&self) -> &str {
        "jira"
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::IssueTracker)
    }

    fn get_commands(&self) -> Vec<PluginCommand> {
        vec![
            PluginCommand::agent("list", CommandMeta::new("List my issues")),
            PluginCommand::agent("view", CommandMeta::new("Show one issue").with_arg("key", "Issue key", true)),
        ]
    }

    fn language_profile(&self) -> Option<DomainProfile> {
        Some(
            DomainProfile::new(Domain::IssueTracker)
                .with_triggers("list", ["이슈 목록", "my issues"])
                .with_triggers("view", ["이슈 보기"])
                .with_extractor("view", ArgExtractor::IssueKey)
                .with_guidance("A bare issue key implies a lookup, not a create")
                .with_default_command("list"),
        )
    }

    async fn execute_command(&self, name: &str, invocation: CommandInvocation) -> Result<CommandResult, HandlerError> {
        Ok(CommandResult::text(format!("jira {name} {}", invocation.args.join(" ")).trim_end().to_string()))
    }
}

async fn session_with(config: ParleyConfig, model: Option<Arc<dyn LanguageModel>>) -> Session {
    let session = match model {
        Some(model) => Session::with_model(&config, model),
        None => Session::new(&config),
    };
    session.register_plugin(Arc::new(GitPlugin), PluginKind::Internal).await.unwrap();
    session.register_plugin(Arc::new(JiraPlugin), PluginKind::External).await.unwrap();
    session
}

#[tokio::test]
async fn structured_command_returns_handler_result_unchanged() {
    let session = session_with(ParleyConfig::default(), None).await;

    let parsed = session.parse_with_suggestions("@git:status");
    assert!(!parsed.has_error);
    assert_eq!(parsed.command.prefix, CommandPrefix::At);
    assert_eq!(parsed.command.domain, Some(Domain::VersionControl));
    assert_eq!(parsed.command.command, "status");
    assert!(parsed.command.args.is_empty());

    let result = session.execute_from_string("@git:status").await;
    assert_eq!(result, CommandResult::text("nothing to commit, working tree clean"));
}

#[tokio::test]
async fn quoted_commit_message_reaches_the_handler() {
    let session = session_with(ParleyConfig::default(), None).await;

    let parsed = session.parse_with_suggestions("@git:commit -m \"fix bug\"");
    assert_eq!(parsed.command.args, vec!["fix bug"]);
    assert!(parsed.command.flags.is_empty());

    let result = session.execute_from_string("@git:commit -m \"fix bug\"").await;
    assert_eq!(result.message.as_deref(), Some("committed: fix bug"));
}

#[tokio::test]
async fn korean_trigger_phrase_resolves_without_the_model() {
    let model = CountingModel::replying(r#"{"command":"view","args":[],"confidence":0.99,"explanation":"model"}"#);
    let config = ParleyConfig {
        converter: ConverterConfig {
            fast_path_threshold: 0.4,
            ..Default::default()
        },
        ..Default::default()
    };
    let session = session_with(config, Some(model.clone())).await;

    let parsed = session.parse_with_suggestions("@jira 이슈 목록 보여줘");
    assert_eq!(parsed.command.domain, Some(Domain::IssueTracker));
    assert_eq!(parsed.command.command, "");
    assert_eq!(parsed.command.args, vec!["이슈 목록 보여줘"]);

    let result = session.execute_from_string("@jira 이슈 목록 보여줘").await;
    assert!(result.success);
    let conversion = result.conversion.unwrap();
    assert_eq!(conversion.command, "list");
    assert_eq!(conversion.source, ConversionSource::Heuristic);
    assert!((conversion.confidence - 5.0 / 9.0 * 0.8).abs() < 1e-9);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn invalid_model_reply_falls_back_to_domain_default() {
    let model = CountingModel::replying("Sorry, I am not sure what you mean.");
    let session = session_with(ParleyConfig::default(), Some(model.clone())).await;

    let result = session.execute_from_string("@jira 복잡한 요청 that matches no heuristic").await;
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("jira list"));
    let conversion = result.conversion.unwrap();
    assert_eq!(conversion.command, "list");
    assert_eq!(conversion.source, ConversionSource::Fallback);
    assert!((0.3..=0.5).contains(&conversion.confidence));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn model_reply_drives_dispatch_when_valid() {
    let model = CountingModel::replying("```json\n{\"command\":\"view\",\"args\":[\"PROJ-123\"],\"confidence\":0.9,\"explanation\":\"bare key\"}\n```");
    let session = session_with(ParleyConfig::default(), Some(model.clone())).await;

    let result = session.execute_from_string("@jira PROJ-123").await;
    assert_eq!(result.message.as_deref(), Some("jira view PROJ-123"));
    assert_eq!(result.conversion.unwrap().source, ConversionSource::Llm);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn typo_is_reported_with_ranked_suggestions() {
    let session = session_with(ParleyConfig::default(), None).await;

    let parsed = session.parse_with_suggestions("@git:statu");
    assert!(parsed.has_error);
    assert_eq!(parsed.error_kind, Some(ParseErrorKind::UnknownCommand));
    assert_eq!(parsed.suggestions.first().map(String::as_str), Some("@git:status"));
    assert_eq!(parsed.command.command_type, CommandType::None);
}

#[tokio::test]
async fn unknown_domain_fails_with_suggestions() {
    let session = session_with(ParleyConfig::default(), None).await;

    let result = session.execute_from_string("@unknown:cmd").await;
    assert!(!result.success);
    assert!(result.error.is_some());
    assert!(!result.suggested_next_commands.is_empty());
}

#[tokio::test]
async fn unregistered_plugin_leaves_no_domain_commands() {
    let session = session_with(ParleyConfig::default(), None).await;
    assert_eq!(session.commands().get_domain_commands(Domain::IssueTracker).len(), 2);

    session.unregister_plugin("jira", PluginKind::External).await.unwrap();
    assert!(session.commands().get_domain_commands(Domain::IssueTracker).is_empty());

    let result = session.execute_from_string("@jira:list").await;
    assert!(!result.success);
}

#[tokio::test]
async fn disabled_plugin_from_configuration_contributes_nothing() {
    let mut config = ParleyConfig::default();
    config.plugins.disabled.insert("jira".into());
    let session = session_with(config, None).await;

    assert!(session.plugins().is_registered("jira").await);
    assert!(session.commands().get_domain_commands(Domain::IssueTracker).is_empty());
    assert!(session.commands().contains("git", "status"));
}

#[tokio::test]
async fn history_records_every_dispatch() {
    let session = session_with(ParleyConfig::default(), None).await;
    session.execute_from_string("@git:status").await;
    session.execute_from_string("@git:statu").await;

    let history = session.dispatcher().get_execution_history(10);
    assert_eq!(history.len(), 2);
    assert!(history[0].result.success);
    assert!(!history[1].result.success);
}
