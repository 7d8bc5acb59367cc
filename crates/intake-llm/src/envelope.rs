//! Extract-and-validate for JSON objects embedded in LLM replies

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EnvelopeError {
    #[error("no JSON object found in response")]
    NotFound,

    #[error("invalid JSON: {0}")]
    Invalid(String),

    #[error("unexpected shape: {0}")]
    Rejected(String),
}

/// A typed JSON reply with its own shape check.
pub trait Envelope: DeserializeOwned {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Parse the first JSON object found in `content` into `T` and validate it.
pub fn parse_envelope<T: Envelope>(content: &str) -> Result<T, EnvelopeError> {
    let json = extract_json(content).ok_or(EnvelopeError::NotFound)?;
    let value: T = serde_json::from_str(json).map_err(|e| EnvelopeError::Invalid(e.to_string()))?;
    value.validate().map_err(EnvelopeError::Rejected)?;
    Ok(value)
}

/// Locate the first balanced `{...}` object in an LLM reply.
///
/// A fenced ```json block is preferred when present. Braces inside string literals
/// and escaped quotes are skipped while balancing.
pub fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        let body = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        if let Some(found) = first_balanced_object(body) {
            return Some(found);
        }
    }

    first_balanced_object(trimmed)
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the object starting at `text[0] == '{'`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read an optional id field where the model may answer with `null` or the string "null".
pub fn optional_id(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}
