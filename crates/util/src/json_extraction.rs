//! Defensive extraction of a JSON object embedded in free-form model output.
//!
//! Recovery order: a fenced code block (```json or bare ```), then the first
//! balanced `{...}` object in the text. String literals are respected while
//! counting braces, so `"}"` inside a value does not end the object.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonExtractionError {
    #[error("no JSON object found in response")]
    NotFound,
    #[error("invalid JSON object: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Extracts and parses the JSON object carried by `text`.
///
/// # Example
/// ```rust
/// use parley_util::json_extraction::extract_json_object;
///
/// let value = extract_json_object("Sure! {\"command\": \"status\"} hope that helps").unwrap();
/// assert_eq!(value["command"], "status");
/// ```
pub fn extract_json_object(text: &str) -> Result<Value, JsonExtractionError> {
    if let Some(block) = fenced_block(text)
        && let Some(candidate) = first_balanced_object(block)
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
        && value.is_object()
    {
        return Ok(value);
    }

    let candidate = first_balanced_object(text).ok_or(JsonExtractionError::NotFound)?;
    let value: Value = serde_json::from_str(candidate)?;
    if value.is_object() { Ok(value) } else { Err(JsonExtractionError::NotFound) }
}

/// Returns the body of the first ``` fenced block, without the language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n').map(|index| index + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Finds the first `{` and returns the slice up to its matching `}`.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
