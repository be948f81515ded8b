//! # Text Processing Utilities
//!
//! Edit-distance scoring used for typo-tolerant suggestions, and the input
//! normalization shared by the natural-language heuristics.

/// Levenshtein distance between two strings, counted in characters.
///
/// # Example
/// ```rust
/// use parley_util::text_processing::levenshtein_distance;
///
/// assert_eq!(levenshtein_distance("statu", "status"), 1);
/// assert_eq!(levenshtein_distance("", "abc"), 3);
/// ```
pub fn levenshtein_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current = vec![0; right_chars.len() + 1];

    for (left_index, left_char) in left_chars.iter().enumerate() {
        current[0] = left_index + 1;
        for (right_index, right_char) in right_chars.iter().enumerate() {
            let substitution_cost = usize::from(left_char != right_char);
            current[right_index + 1] = (current[right_index] + 1)
                .min(previous[right_index + 1] + 1)
                .min(previous[right_index] + substitution_cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right_chars.len()]
}

/// Levenshtein distance divided by the longer of the two lengths.
///
/// Returns a value in `[0.0, 1.0]`; `0.0` means identical. Two empty strings
/// are identical.
pub fn normalized_distance(left: &str, right: &str) -> f64 {
    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein_distance(left, right) as f64 / longest as f64
}

/// Lower-cases, trims and collapses internal whitespace runs to one space.
///
/// Heuristic confidence is computed against the length of this form.
pub fn normalize_for_matching(input: &str) -> String {
    input.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Length of a string in characters (Unicode scalar values).
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}
