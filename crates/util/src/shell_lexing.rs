//! # Shell-like Lexing Utilities
//!
//! Tokenizes command lines the way a shell would: whitespace separates
//! tokens, single or double quotes group text containing spaces, and a
//! backslash escapes the following character. Quote characters are kept in
//! the raw token text so callers can tell `"--flag"` (a quoted positional)
//! from `--flag`; [`LexToken::value`] yields the unquoted value.

use thiserror::Error;

/// Errors raised while lexing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A quote was opened but never closed.
    #[error("unterminated {quote} quote starting at byte {position}")]
    UnterminatedQuote { quote: char, position: usize },
}

/// Tokenize input and return the unquoted token values.
///
/// # Example
/// ```rust
/// use parley_util::shell_lexing::lex_shell_like;
///
/// let tokens = lex_shell_like("commit -m \"fix bug\"").unwrap();
/// assert_eq!(tokens, vec!["commit", "-m", "fix bug"]);
/// ```
pub fn lex_shell_like(input: &str) -> Result<Vec<String>, LexError> {
    Ok(lex_shell_like_ranged(input)?.iter().map(LexToken::value).collect())
}

/// Token with original byte positions.
///
/// `text` is the raw slice including any quote characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexToken<'a> {
    /// The raw text of the token
    pub text: &'a str,
    /// The starting byte position in the original string
    pub start: usize,
    /// The ending byte position in the original string
    pub end: usize,
}

impl LexToken<'_> {
    /// The token with quotes removed and escapes resolved.
    pub fn value(&self) -> String {
        unquote(self.text)
    }

    /// True when the token begins with a quote character.
    pub fn is_quoted(&self) -> bool {
        self.text.starts_with(['\'', '"'])
    }
}

/// Tokenize input returning borrowed slices and byte ranges.
///
/// # Example
/// ```rust
/// use parley_util::shell_lexing::lex_shell_like_ranged;
///
/// let tokens = lex_shell_like_ranged("cmd 'arg with spaces'").unwrap();
/// assert_eq!(tokens[1].text, "'arg with spaces'");
/// assert_eq!(tokens[1].start, 4);
/// ```
pub fn lex_shell_like_ranged(input: &str) -> Result<Vec<LexToken<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut current_index = 0usize;
    let bytes = input.as_bytes();

    while current_index < bytes.len() {
        current_index = skip_whitespace(bytes, current_index);

        if current_index >= bytes.len() {
            break;
        }

        let start = current_index;
        current_index = parse_token(bytes, current_index)?;

        tokens.push(LexToken {
            text: &input[start..current_index],
            start,
            end: current_index,
        });
    }

    Ok(tokens)
}

/// Removes quote characters and resolves backslash escapes.
///
/// Follows the same rules as the lexer: a backslash escapes the next
/// character in every mode, and a quote of one kind is literal inside the
/// other kind.
pub fn unquote(token: &str) -> String {
    let mut value = String::with_capacity(token.len());
    let mut in_single_quotes = false;
    let mut in_double_quotes = false;
    let mut characters = token.chars();

    while let Some(character) = characters.next() {
        match character {
            '\\' => match characters.next() {
                Some(escaped) => value.push(escaped),
                None => value.push('\\'),
            },
            '\'' if !in_double_quotes => in_single_quotes = !in_single_quotes,
            '"' if !in_single_quotes => in_double_quotes = !in_double_quotes,
            other => value.push(other),
        }
    }

    value
}

fn skip_whitespace(bytes: &[u8], start_index: usize) -> usize {
    let mut index = start_index;
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

/// Parses a single token, stopping at unquoted whitespace or end of input.
///
/// Only ASCII bytes are inspected, so the returned index always lands on a
/// UTF-8 character boundary.
fn parse_token(bytes: &[u8], start_index: usize) -> Result<usize, LexError> {
    let mut index = start_index;
    let mut open_quote: Option<(u8, usize)> = None;

    while index < bytes.len() {
        let byte = bytes[index];

        if byte == b'\\' && index + 1 < bytes.len() {
            index += 2;
            continue;
        }

        match open_quote {
            Some((quote, _)) if byte == quote => open_quote = None,
            Some(_) => {}
            None if byte == b'\'' || byte == b'"' => open_quote = Some((byte, index)),
            None if byte.is_ascii_whitespace() => break,
            None => {}
        }

        index += 1;
    }

    if let Some((quote, position)) = open_quote {
        return Err(LexError::UnterminatedQuote {
            quote: quote as char,
            position,
        });
    }

    Ok(index)
}
