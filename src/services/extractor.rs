//! Result extractor
//!
//! The analysis program interleaves log lines and warnings with exactly one
//! JSON payload on stdout. The payload is isolated by taking the widest
//! `{`..`}` span in the text, so leading and trailing noise is tolerated.
//! If that span sits inside an enclosing `[`..`]` pair, the array span is
//! parsed instead, so a top-level array of model results survives
//! extraction. Two independent top-level objects still produce a malformed
//! span; the contract with the program is a single payload.

use serde_json::Value;
use thiserror::Error;

/// Extraction errors. `Malformed` carries the parse failure; the caller
/// attaches the raw stdout text for diagnostics.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No `{`..`}` span exists in the text
    #[error("no JSON payload found in program output")]
    NoPayloadFound,

    /// The candidate span is not valid JSON
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Isolate and parse the embedded result payload.
///
/// Always yields a sequence: a bare object is wrapped into a one-element
/// Vec, an array yields its elements.
pub fn extract_payload(stdout_text: &str) -> Result<Vec<Value>, ExtractError> {
    let start = stdout_text.find('{').ok_or(ExtractError::NoPayloadFound)?;
    let end = stdout_text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or(ExtractError::NoPayloadFound)?;

    let object_span = &stdout_text[start..=end];
    let value = match serde_json::from_str::<Value>(object_span) {
        Ok(value) => value,
        Err(object_err) => {
            // The payload may be a top-level array of results; retry with
            // an enclosing [..] span if one strictly surrounds the braces.
            match enclosing_array_span(stdout_text, start, end) {
                Some(array_span) => {
                    serde_json::from_str::<Value>(array_span).map_err(|_| object_err)?
                }
                None => return Err(object_err.into()),
            }
        }
    };

    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

fn enclosing_array_span(text: &str, obj_start: usize, obj_end: usize) -> Option<&str> {
    let start = text.find('[').filter(|s| *s < obj_start)?;
    let end = text.rfind(']').filter(|e| *e > obj_end)?;
    Some(&text[start..=end])
}
