//! Per-domain language profiles consumed by the natural-language converter.
//!
//! A profile is supplied by the plugin that owns the domain at registration
//! time: trigger phrases per command (in whatever languages the plugin
//! supports), argument extractors, free-text disambiguation guidance for the
//! language model, and the default command used as the last resort.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parley_types::Domain;
use parley_util::normalize_for_matching;
use regex::Regex;

static QUOTED_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'|“([^”]+)”"#).expect("valid quoted text pattern"));
static ISSUE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z][A-Za-z0-9]+-\d+)\b").expect("valid issue key pattern"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)(\d+)(?:\s|$)").expect("valid number pattern"));

/// Pulls one argument value out of free text.
#[derive(Debug, Clone)]
pub enum ArgExtractor {
    /// The first single-, double- or curly-quoted span, e.g. a commit message.
    QuotedText,
    /// A `PROJ-123` shaped key, upper-cased.
    IssueKey,
    /// A bare standalone integer, e.g. a count.
    Number,
    /// A custom pattern; `group` selects the capture group to return.
    Pattern { regex: Regex, group: usize },
}

impl ArgExtractor {
    /// Builds a custom extractor from a regular expression.
    pub fn pattern(pattern: &str, group: usize) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            group,
        })
    }

    /// Returns the extracted value, or `None` when the text carries none.
    pub fn extract(&self, text: &str) -> Option<String> {
        match self {
            ArgExtractor::QuotedText => QUOTED_TEXT
                .captures(text)
                .and_then(|captures| captures.iter().skip(1).flatten().next().map(|m| m.as_str().to_string())),
            ArgExtractor::IssueKey => ISSUE_KEY.captures(text).map(|captures| captures[1].to_uppercase()),
            ArgExtractor::Number => NUMBER.captures(text).map(|captures| captures[1].to_string()),
            ArgExtractor::Pattern { regex, group } => regex
                .captures(text)
                .and_then(|captures| captures.get(*group))
                .map(|m| m.as_str().to_string()),
        }
    }
}

/// Ordered trigger phrases for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet {
    pub command: String,
    /// Stored normalized (lower-case, single-spaced).
    pub phrases: Vec<String>,
}

/// Natural-language knowledge a plugin supplies for its domain.
#[derive(Debug, Clone)]
pub struct DomainProfile {
    pub domain: Domain,
    pub triggers: Vec<TriggerSet>,
    pub extractors: IndexMap<String, Vec<ArgExtractor>>,
    /// Rules of thumb included verbatim in the language-model prompt.
    pub guidance: Vec<String>,
    /// Read-only command used when nothing else resolves.
    pub default_command: Option<String>,
}

impl DomainProfile {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            triggers: Vec::new(),
            extractors: IndexMap::new(),
            guidance: Vec::new(),
            default_command: None,
        }
    }

    /// Appends trigger phrases for `command`, keeping declaration order.
    pub fn with_triggers<I, S>(mut self, command: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = command.into();
        let phrases = phrases
            .into_iter()
            .map(|phrase| normalize_for_matching(phrase.as_ref()))
            .filter(|phrase| !phrase.is_empty());

        match self.triggers.iter_mut().find(|set| set.command == command) {
            Some(existing) => existing.phrases.extend(phrases),
            None => self.triggers.push(TriggerSet {
                command,
                phrases: phrases.collect(),
            }),
        }
        self
    }

    pub fn with_extractor(mut self, command: impl Into<String>, extractor: ArgExtractor) -> Self {
        self.extractors.entry(command.into()).or_default().push(extractor);
        self
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance.push(guidance.into());
        self
    }

    pub fn with_default_command(mut self, command: impl Into<String>) -> Self {
        self.default_command = Some(command.into());
        self
    }

    /// Runs every extractor registered for `command` in order, keeping the hits.
    pub fn extract_args(&self, command: &str, text: &str) -> Vec<String> {
        self.extractors
            .get(command)
            .map(|extractors| extractors.iter().filter_map(|extractor| extractor.extract(text)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_extractors_pull_values() {
        assert_eq!(ArgExtractor::QuotedText.extract("commit with \"fix bug\" please").as_deref(), Some("fix bug"));
        assert_eq!(ArgExtractor::QuotedText.extract("say 'hi there'").as_deref(), Some("hi there"));
        assert_eq!(ArgExtractor::IssueKey.extract("look at proj-123 now").as_deref(), Some("PROJ-123"));
        assert_eq!(ArgExtractor::Number.extract("show last 5 commits").as_deref(), Some("5"));
        assert_eq!(ArgExtractor::Number.extract("no numbers here"), None);
    }

    #[test]
    fn custom_pattern_selects_group() {
        let extractor = ArgExtractor::pattern(r"branch (\S+)", 1).unwrap();
        assert_eq!(extractor.extract("switch to branch feature/x").as_deref(), Some("feature/x"));
    }

    #[test]
    fn triggers_are_normalized_and_merged() {
        let profile = DomainProfile::new(Domain::IssueTracker)
            .with_triggers("list", ["이슈 목록", "List  Issues"])
            .with_triggers("list", ["my issues"])
            .with_extractor("view", ArgExtractor::IssueKey)
            .with_default_command("list");

        assert_eq!(profile.triggers.len(), 1);
        assert_eq!(profile.triggers[0].phrases, vec!["이슈 목록", "list issues", "my issues"]);
        assert_eq!(profile.extract_args("view", "open ABC-9"), vec!["ABC-9"]);
        assert!(profile.extract_args("list", "open ABC-9").is_empty());
    }
}
