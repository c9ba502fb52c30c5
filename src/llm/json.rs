//! Locating a JSON object inside free-form model output.
//!
//! Models wrap JSON in code fences or surround it with prose. We look at a
//! fenced block first, then scan for the first `{` that starts a complete
//! JSON value and cut the input right after it.

use serde_json::{Deserializer, Value};

/// Extract the first JSON object from `response`, or `None` if there is
/// none.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed)
        && let Some(found) = first_object(inner)
    {
        return Some(found);
    }

    first_object(trimmed)
}

/// Contents of the first ```` ``` ```` block, with an optional `json` tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// First `{...}` that parses as a complete JSON object.
fn first_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let candidate = &text[start..];
        let mut stream = Deserializer::from_str(candidate).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => Some(&candidate[..stream.byte_offset()]),
            _ => None,
        }
    })
}
