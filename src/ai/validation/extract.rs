//! JSON Extraction
//!
//! Pulls the JSON object out of a model reply. Tolerated wrapping:
//! - Markdown code fence (```json ... ```)
//! - Byte order mark
//! - Prose before or after a single top-level object
//!
//! Anything that still fails to parse is a [`ScribeError::MalformedResponse`].
//! No structural repair is attempted; a broken object is a harder error than a
//! schema violation and gets no corrective turn.

use serde_json::Value;
use tracing::debug;

use crate::constants::validation::PREVIEW_CHARS;
use crate::types::{Result, ScribeError};

/// Parse the JSON object contained in a model reply
pub fn extract_json(raw: &str) -> Result<Value> {
    let cleaned = preprocess(raw);

    let first_error = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = outermost_object(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(span)
    {
        debug!("JSON object extracted from surrounding text");
        return Ok(value);
    }

    Err(ScribeError::MalformedResponse {
        message: first_error.to_string(),
        preview: preview(&cleaned),
    })
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}').trim();
    strip_code_fences(s).trim().to_string()
}

fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }

    result
}

/// Span from the first `{` to its matching `}`, ignoring braces inside strings
fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn preview(s: &str) -> String {
    let mut out: String = s.chars().take(PREVIEW_CHARS).collect();
    if s.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}
