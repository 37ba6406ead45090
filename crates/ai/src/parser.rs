//! Extraction of JSON payloads from model output.

use serde::de::DeserializeOwned;

use crate::llm::{LlmError, Result};

/// Strip Markdown code fences around a model reply.
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let without_prefix = trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```");
    without_prefix.trim_end_matches("```").trim()
}

/// Parse a JSON document out of a model reply.
///
/// Accepts bare JSON, fenced JSON, and JSON objects surrounded by prose.
pub fn extract_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    let cleaned = strip_fences(content);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(first) => {
            // Prose around an object: retry on the outermost braces.
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&cleaned[start..=end])
                        .map_err(|e| LlmError::InvalidJson(e.to_string()))
                }
                _ => Err(LlmError::InvalidJson(first.to_string())),
            }
        }
    }
}
