//! Plugin domains addressable through `@<domain>` commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Agent identifier used for system (`/`) commands.
pub const SYSTEM_AGENT_ID: &str = "core";

/// Known plugin domains.
///
/// Each domain owns a namespace of agent commands. The canonical token
/// returned by [`Domain::agent_id`] is the key the command registry uses;
/// aliases are accepted by the parser and resolve to the same domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    VersionControl,
    IssueTracker,
    BuildSystem,
    FileStore,
    Documents,
    KnowledgeVault,
    Rules,
}

impl Domain {
    /// Every domain in declaration order.
    pub const ALL: [Domain; 7] = [
        Domain::VersionControl,
        Domain::IssueTracker,
        Domain::BuildSystem,
        Domain::FileStore,
        Domain::Documents,
        Domain::KnowledgeVault,
        Domain::Rules,
    ];

    /// Canonical, lower-case agent identifier for registry lookups.
    pub fn agent_id(&self) -> &'static str {
        match self {
            Domain::VersionControl => "git",
            Domain::IssueTracker => "jira",
            Domain::BuildSystem => "build",
            Domain::FileStore => "files",
            Domain::Documents => "docs",
            Domain::KnowledgeVault => "vault",
            Domain::Rules => "rules",
        }
    }

    /// Alternative tokens accepted after `@`.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Domain::VersionControl => &["vcs", "github"],
            Domain::IssueTracker => &["issue", "issues"],
            Domain::BuildSystem => &["ci"],
            Domain::FileStore => &["drive", "storage"],
            Domain::Documents => &["confluence"],
            Domain::KnowledgeVault => &["notes"],
            Domain::Rules => &[],
        }
    }

    /// Resolves a user-typed token (canonical id or alias) to a domain.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|domain| domain.agent_id() == token || domain.aliases().contains(&token.as_str()))
    }

    /// All tokens (canonical ids followed by aliases) in a stable order.
    pub fn all_tokens() -> Vec<&'static str> {
        let mut tokens: Vec<&'static str> = Self::ALL.iter().map(Domain::agent_id).collect();
        for domain in Self::ALL {
            tokens.extend_from_slice(domain.aliases());
        }
        tokens
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_id())
    }
}

/// Error returned when a token does not name a known domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomainError(pub String);

impl fmt::Display for UnknownDomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown domain: {}", self.0)
    }
}

impl std::error::Error for UnknownDomainError {}

impl FromStr for Domain {
    type Err = UnknownDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| UnknownDomainError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_resolve_case_insensitively() {
        assert_eq!(Domain::from_token("GIT"), Some(Domain::VersionControl));
        assert_eq!(Domain::from_token("issues"), Some(Domain::IssueTracker));
        assert_eq!(Domain::from_token("nope"), None);
    }

    #[test]
    fn agent_ids_are_unique() {
        let tokens = Domain::all_tokens();
        let mut deduped = tokens.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(tokens.len(), deduped.len());
    }
}
