//! Typo-tolerant suggestions over the registered command set.
//!
//! Candidates are ranked by normalized edit distance (Levenshtein distance
//! divided by the longer length) between the typed invocation and each
//! registered invocation (`@git:status`, `/help`). Only candidates below the
//! distance threshold are kept; ties keep registration order, so results are
//! deterministic for a given registry state.

use parley_types::{Domain, invocation_key};
use parley_util::normalized_distance;

use crate::CommandRegistry;

/// Maximum number of suggestions returned by default.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
/// Candidates at or above this normalized distance are discarded.
pub const SUGGESTION_DISTANCE_THRESHOLD: f64 = 0.5;

/// A ranked suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Invocation text, e.g. `@git:status`.
    pub invocation: String,
    /// Normalized edit distance to the query, in `[0.0, 1.0)`.
    pub distance: f64,
}

impl CommandRegistry {
    /// Ranks registered commands against a typed invocation such as `@git:statu`.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let Some(state) = self.read_or_warn() else {
            return Vec::new();
        };
        let candidates = state
            .entries
            .values()
            .map(|entry| invocation_key(entry.command_type, &entry.usage.agent_id, &entry.usage.command));

        rank_candidates(&query, candidates, limit)
    }

    /// Convenience wrapper returning only invocation strings.
    pub fn suggest_invocations(&self, query: &str, limit: usize) -> Vec<String> {
        self.suggest(query, limit).into_iter().map(|suggestion| suggestion.invocation).collect()
    }
}

/// Ranks domain tokens (canonical ids and aliases) against an unknown domain token.
///
/// Results are rendered as `@<agent_id>`; aliases collapse onto their domain.
pub fn suggest_domains(token: &str, limit: usize) -> Vec<Suggestion> {
    let token = token.trim().to_lowercase();
    if token.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(Domain, f64)> = Vec::new();
    for candidate in Domain::all_tokens() {
        let distance = normalized_distance(&token, candidate);
        if distance >= SUGGESTION_DISTANCE_THRESHOLD {
            continue;
        }
        let Some(domain) = Domain::from_token(candidate) else {
            continue;
        };
        match ranked.iter_mut().find(|(existing, _)| *existing == domain) {
            Some((_, best)) if distance < *best => *best = distance,
            Some(_) => {}
            None => ranked.push((domain, distance)),
        }
    }

    ranked.sort_by(|left, right| left.1.total_cmp(&right.1));
    ranked
        .into_iter()
        .take(limit)
        .map(|(domain, distance)| Suggestion {
            invocation: format!("@{}", domain.agent_id()),
            distance,
        })
        .collect()
}

/// Scores each candidate, filters by threshold and sorts stably by distance.
pub fn rank_candidates<I>(query: &str, candidates: I, limit: usize) -> Vec<Suggestion>
where
    I: IntoIterator<Item = String>,
{
    let mut scored: Vec<Suggestion> = candidates
        .into_iter()
        .map(|invocation| Suggestion {
            distance: normalized_distance(query, &invocation),
            invocation,
        })
        .filter(|suggestion| suggestion.distance < SUGGESTION_DISTANCE_THRESHOLD)
        .collect();

    // `sort_by` is stable, so equal distances keep registration order.
    scored.sort_by(|left, right| left.distance.total_cmp(&right.distance));
    scored.truncate(limit);
    scored
}
