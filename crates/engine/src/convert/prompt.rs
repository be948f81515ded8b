//! Prompt template for the language-model tier.

use parley_registry::DomainProfile;
use parley_types::{CommandUsage, Domain};

use super::heuristic::HeuristicMatch;

/// Instructions shared by every conversion prompt.
pub const SYSTEM_PROMPT: &str = "\
You convert a user's request into exactly one command of a single domain.

Reply with one JSON object and nothing else:
{\"command\": \"<command name>\", \"args\": [\"<arg>\", ...], \"confidence\": <0.0-1.0>, \
\"explanation\": \"<one sentence>\", \"alternatives\": [{\"command\": \"...\", \"args\": [], \"confidence\": <0.0-1.0>}]}

Rules:
- command MUST be one of the catalog commands below
- confidence reflects how certain you are, between 0 and 1
- alternatives are optional and must be less confident than the main command
- Do NOT include markdown or commentary outside the JSON object";

/// Builds the full prompt for one request.
pub fn build_prompt(
    domain: Domain,
    catalog: &[CommandUsage],
    profile: Option<&DomainProfile>,
    text: &str,
    hint: Option<&HeuristicMatch>,
) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);

    prompt.push_str(&format!("\n\nDomain: @{domain}\nCommands:\n"));
    for usage in catalog {
        prompt.push_str(&usage.catalog_line());
        prompt.push('\n');
    }

    if let Some(profile) = profile
        && !profile.guidance.is_empty()
    {
        prompt.push_str("\nGuidance:\n");
        for rule in &profile.guidance {
            prompt.push_str("- ");
            prompt.push_str(rule);
            prompt.push('\n');
        }
    }

    if let Some(hint) = hint {
        prompt.push_str(&format!(
            "\nKeyword hint: the phrase '{}' suggests '{}' (score {:.2}).\n",
            hint.phrase, hint.command, hint.score
        ));
    }

    prompt.push_str("\nRequest:\n");
    prompt.push_str(text);
    prompt
}
