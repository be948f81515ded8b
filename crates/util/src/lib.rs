//! Parley utility functions: shell-like lexing, edit-distance scoring,
//! JSON recovery from model output and path helpers.

pub mod json_extraction;
pub mod path_processing;
pub mod shell_lexing;
pub mod text_processing;

pub use json_extraction::{JsonExtractionError, extract_json_object};
pub use path_processing::expand_tilde;
pub use shell_lexing::{LexError, LexToken, lex_shell_like, lex_shell_like_ranged, unquote};
pub use text_processing::{char_len, levenshtein_distance, normalize_for_matching, normalized_distance};
