//! Tier 1: trigger-phrase matching against a domain profile.
//!
//! For every trigger phrase contained in the normalized input the score is
//! `char_len(phrase) / char_len(input)`. The best phrase per command is kept;
//! commands are ranked by that score, ties keeping profile order.

use parley_registry::DomainProfile;
use parley_util::char_len;

/// The best-scoring trigger phrase of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicMatch {
    pub command: String,
    pub phrase: String,
    /// Phrase coverage of the input, in `(0.0, 1.0]`.
    pub score: f64,
}

impl HeuristicMatch {
    pub fn confidence(&self, discount: f64) -> f64 {
        (self.score * discount).clamp(0.0, 1.0)
    }
}

/// Ranks commands whose trigger phrases occur in `normalized_input`, best first.
pub fn rank_matches(profile: &DomainProfile, normalized_input: &str) -> Vec<HeuristicMatch> {
    let input_len = char_len(normalized_input);
    if input_len == 0 {
        return Vec::new();
    }

    let mut matches: Vec<HeuristicMatch> = Vec::new();
    for trigger in &profile.triggers {
        let best = trigger
            .phrases
            .iter()
            .filter(|phrase| !phrase.is_empty() && normalized_input.contains(phrase.as_str()))
            .map(|phrase| (phrase, char_len(phrase) as f64 / input_len as f64))
            .fold(None, |best: Option<(&String, f64)>, candidate| match best {
                Some(current) if current.1 >= candidate.1 => Some(current),
                _ => Some(candidate),
            });

        if let Some((phrase, score)) = best {
            matches.push(HeuristicMatch {
                command: trigger.command.clone(),
                phrase: phrase.clone(),
                score: score.min(1.0),
            });
        }
    }

    matches.sort_by(|left, right| right.score.total_cmp(&left.score));
    matches
}
