//! Natural-language conversion: free text scoped to one domain becomes one command.
//!
//! | Tier | Source | When |
//! |------|--------|------|
//! | 1 | trigger phrases of the domain profile | always first; returned at once above the fast-path threshold |
//! | 2 | language model, bounded by a timeout | when tier 1 is not confident and a model is configured |
//! | fallback | tier-1 match, else the domain default command | when tier 2 is skipped or fails |

pub mod error;
pub mod heuristic;
pub mod prompt;
mod response;

use std::sync::Arc;

use parley_registry::{CommandRegistry, DomainProfile};
use parley_types::{CommandConversion, ConversionAlternative, ConversionSource, Domain};
use parley_util::normalize_for_matching;
use tracing::{debug, info, warn};

use crate::config::ConverterConfig;
use crate::llm::{LanguageModel, LanguageModelError};

pub use error::ConversionError;
use error::ModelTierError;
pub use heuristic::{HeuristicMatch, rank_matches};
use prompt::build_prompt;
use response::parse_reply;

/// Resolves natural-language text against the profiles held by the registry.
#[derive(Clone)]
pub struct NaturalLanguageConverter {
    registry: CommandRegistry,
    model: Option<Arc<dyn LanguageModel>>,
    config: ConverterConfig,
}

impl NaturalLanguageConverter {
    pub fn new(registry: CommandRegistry, config: ConverterConfig) -> Self {
        Self {
            registry,
            model: None,
            config,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Tier 1 only. Never calls the language model.
    pub fn heuristic(&self, domain: Domain, text: &str) -> Option<CommandConversion> {
        let profile = self.registry.domain_profile(domain)?;
        let ranked = rank_matches(&profile, &normalize_for_matching(text));
        let (best, rest) = ranked.split_first()?;
        Some(self.heuristic_conversion(&profile, best, rest, text.trim()))
    }

    /// Runs the full tier chain. Fails only when the domain has no default command to fall back to.
    pub async fn convert(&self, domain: Domain, text: &str) -> Result<CommandConversion, ConversionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConversionError::EmptyInput { domain });
        }

        let profile = self.registry.domain_profile(domain);
        let ranked = profile
            .as_ref()
            .map(|profile| rank_matches(profile, &normalize_for_matching(text)))
            .unwrap_or_default();
        let heuristic = match (profile.as_ref(), ranked.split_first()) {
            (Some(profile), Some((best, rest))) => Some(self.heuristic_conversion(profile, best, rest, text)),
            _ => None,
        };

        if let Some(conversion) = heuristic
            .as_ref()
            .filter(|conversion| conversion.confidence > self.config.fast_path_threshold)
        {
            debug!(domain = %domain, command = %conversion.command, confidence = conversion.confidence, "Heuristic fast path");
            return Ok(conversion.clone());
        }

        if let Some(model) = &self.model {
            match self.ask_model(model, domain, profile.as_ref(), text, ranked.first()).await {
                Ok(conversion) => {
                    info!(domain = %domain, command = %conversion.command, confidence = conversion.confidence, "Language model resolved request");
                    return Ok(conversion);
                }
                Err(error) => warn!(domain = %domain, error = %error, "Language model tier failed, falling back"),
            }
        }

        if let Some(conversion) = heuristic {
            debug!(domain = %domain, command = %conversion.command, confidence = conversion.confidence, "Using heuristic match");
            return Ok(conversion);
        }

        self.default_conversion(domain, profile.as_ref(), text)
    }

    fn heuristic_conversion(&self, profile: &DomainProfile, best: &HeuristicMatch, rest: &[HeuristicMatch], text: &str) -> CommandConversion {
        let discount = self.config.heuristic_discount;
        let alternatives = rest
            .iter()
            .map(|candidate| ConversionAlternative {
                command: candidate.command.clone(),
                args: profile.extract_args(&candidate.command, text),
                confidence: candidate.confidence(discount),
            })
            .collect();

        CommandConversion::new(
            best.command.clone(),
            profile.extract_args(&best.command, text),
            best.confidence(discount),
            format!("matched trigger phrase '{}'", best.phrase),
        )
        .with_alternatives(alternatives)
        .with_source(ConversionSource::Heuristic)
    }

    async fn ask_model(
        &self,
        model: &Arc<dyn LanguageModel>,
        domain: Domain,
        profile: Option<&DomainProfile>,
        text: &str,
        hint: Option<&HeuristicMatch>,
    ) -> Result<CommandConversion, ModelTierError> {
        let catalog = self.registry.get_domain_commands(domain);
        let prompt = build_prompt(domain, &catalog, profile, text, hint);

        // The model runs on its own task so a panic surfaces as a JoinError.
        let model = Arc::clone(model);
        let mut task = tokio::spawn(async move { model.complete(&prompt).await });
        let reply = match tokio::time::timeout(self.config.llm_timeout(), &mut task).await {
            Ok(Ok(reply)) => reply?,
            Ok(Err(join_error)) => return Err(LanguageModelError::aborted(join_error.to_string()).into()),
            Err(_) => {
                task.abort();
                return Err(LanguageModelError::Timeout {
                    timeout_ms: self.config.llm_timeout_ms,
                }
                .into());
            }
        };

        parse_reply(&reply)
    }

    fn default_conversion(&self, domain: Domain, profile: Option<&DomainProfile>, text: &str) -> Result<CommandConversion, ConversionError> {
        let Some(command) = profile.and_then(|profile| profile.default_command.clone()) else {
            return Err(ConversionError::Unresolved {
                domain,
                text: text.to_string(),
            });
        };

        debug!(domain = %domain, command = %command, "Falling back to default command");
        let explanation = format!("fallback: no confident match for the request, used default command '{command}'");
        Ok(CommandConversion::new(command, Vec::new(), self.config.effective_fallback_confidence(), explanation).with_source(ConversionSource::Fallback))
    }
}
