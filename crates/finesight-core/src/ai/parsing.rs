//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap the JSON payload in markdown fences or surround it with
//! prose even when told not to.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z]*").expect("valid fence regex"))
}

fn truncated(raw: &str) -> String {
    if raw.chars().count() > 200 {
        format!("{}...", raw.chars().take(200).collect::<String>())
    } else {
        raw.to_string()
    }
}

/// Remove markdown code fences (```json ... ```)
pub fn strip_code_fences(response: &str) -> String {
    fence_regex().replace_all(response, "").trim().to_string()
}

/// Extract and decode the outermost JSON object in a model reply
pub fn extract_json_object<T: DeserializeOwned>(response: &str) -> Result<T> {
    let cleaned = strip_code_fences(response);
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &cleaned[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from AI: {} | Raw: {}",
                    e,
                    truncated(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncated(&cleaned)
        ))),
    }
}
