//! Staged repair and parsing of LLM JSON output.
//!
//! Models frequently wrap their JSON in markdown fences, append trailing
//! prose, or emit trailing commas. The repair pipeline applies a fixed
//! sequence of cheap transformations, attempting a typed parse after each
//! stage, and stops at the first success:
//!
//! 1. Parse the raw text as-is.
//! 2. Strip markdown code fences.
//! 3. Trim everything after the last closing brace/bracket.
//! 4. Extract the first balanced `{...}` object.
//! 5. Remove trailing commas before closing delimiters.
//!
//! Each transformation is idempotent, so repairing already-repaired text is
//! a no-op. Callers that have a meaningful default use [`parse_llm_json_or`]
//! so a hopelessly malformed response degrades instead of failing the whole
//! entity.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use xlsmart_core::{Error, Result};

/// Strip markdown code fences (```json ... ``` or ``` ... ```) from text.
///
/// Idempotent: text without fences is returned unchanged.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag (```json, ```JSON, bare ```).
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim().to_string()
}

/// Trim any prose after the last closing brace or bracket.
///
/// Keeps everything up to and including the final `}` or `]`; text with no
/// closing delimiter is returned unchanged.
pub fn trim_after_last_close(text: &str) -> String {
    let last_brace = text.rfind('}');
    let last_bracket = text.rfind(']');
    match last_brace.max(last_bracket) {
        Some(idx) => text[..=idx].to_string(),
        None => text.to_string(),
    }
}

/// Extract the first balanced `{...}` object from text.
///
/// Tracks brace depth while respecting string literals and escapes, so
/// braces inside string values do not confuse the scan. Returns `None` when
/// no balanced object exists.
pub fn extract_first_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove trailing commas before `}` or `]`.
pub fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' if in_string => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = !in_string;
                out.push(c);
            }
            ',' if !in_string => {
                // Drop the comma when the next non-whitespace char closes
                // the containing object or array.
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Parse LLM output into `T`, applying the repair pipeline stage by stage.
///
/// Returns the first successful typed parse, or an error naming the raw
/// response length when every stage fails.
pub fn parse_llm_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Ok(value);
    }

    let defenced = strip_markdown_fences(text);
    if let Ok(value) = serde_json::from_str::<T>(&defenced) {
        debug!("Parsed LLM JSON after stripping markdown fences");
        return Ok(value);
    }

    let trimmed = trim_after_last_close(&defenced);
    if let Ok(value) = serde_json::from_str::<T>(&trimmed) {
        debug!("Parsed LLM JSON after trimming trailing prose");
        return Ok(value);
    }

    if let Some(object) = extract_first_object(&defenced) {
        if let Ok(value) = serde_json::from_str::<T>(&object) {
            debug!("Parsed LLM JSON after extracting first object");
            return Ok(value);
        }

        let decommaed = strip_trailing_commas(&object);
        if let Ok(value) = serde_json::from_str::<T>(&decommaed) {
            debug!("Parsed LLM JSON after removing trailing commas");
            return Ok(value);
        }
    }

    Err(Error::Inference(format!(
        "Unparseable LLM response ({} bytes)",
        text.len()
    )))
}

/// Parse LLM output, falling back to an explicit default on failure.
///
/// The fallback is logged at WARN so degraded responses stay visible.
pub fn parse_llm_json_or<T: DeserializeOwned>(text: &str, fallback: T) -> T {
    match parse_llm_json(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Falling back to default analysis result: {}", e);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        role_id: String,
        confidence: f32,
    }

    const CLEAN: &str = r#"{"role_id": "abc", "confidence": 92.5}"#;

    #[test]
    fn parses_clean_json() {
        let v: Verdict = parse_llm_json(CLEAN).unwrap();
        assert_eq!(v.role_id, "abc");
        assert_eq!(v.confidence, 92.5);
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{CLEAN}\n```");
        let v: Verdict = parse_llm_json(&fenced).unwrap();
        assert_eq!(v.role_id, "abc");
    }

    #[test]
    fn strips_bare_fence() {
        let fenced = format!("```\n{CLEAN}\n```");
        let v: Verdict = parse_llm_json(&fenced).unwrap();
        assert_eq!(v.role_id, "abc");
    }

    #[test]
    fn fence_strip_is_idempotent() {
        let fenced = format!("```json\n{CLEAN}\n```");
        let once = strip_markdown_fences(&fenced);
        let twice = strip_markdown_fences(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn trims_trailing_prose() {
        let noisy = format!("{CLEAN}\n\nI hope this analysis helps!");
        let v: Verdict = parse_llm_json(&noisy).unwrap();
        assert_eq!(v.confidence, 92.5);
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let noisy = format!("Here is the result you asked for: {CLEAN} Let me know.");
        let v: Verdict = parse_llm_json(&noisy).unwrap();
        assert_eq!(v.role_id, "abc");
    }

    #[test]
    fn extraction_respects_braces_in_strings() {
        let tricky = r#"{"role_id": "a{b}c", "confidence": 80.0}"#;
        let extracted = extract_first_object(tricky).unwrap();
        assert_eq!(extracted, tricky);
    }

    #[test]
    fn repairs_trailing_comma() {
        let text = r#"prose {"role_id": "abc", "confidence": 92.5,} more prose"#;
        let v: Verdict = parse_llm_json(text).unwrap();
        assert_eq!(v.role_id, "abc");
    }

    #[test]
    fn trailing_comma_strip_leaves_strings_alone() {
        let text = r#"{"note": "a,}", "n": 1}"#;
        assert_eq!(strip_trailing_commas(text), text);
    }

    #[test]
    fn unparseable_text_errors() {
        let result: Result<Verdict> = parse_llm_json("I cannot answer that.");
        assert!(result.is_err());
    }

    #[test]
    fn fallback_used_on_unparseable_text() {
        let fallback = Verdict {
            role_id: "none".to_string(),
            confidence: 0.0,
        };
        let v = parse_llm_json_or("total garbage", fallback);
        assert_eq!(v.role_id, "none");
    }

    #[test]
    fn fallback_not_used_on_valid_text() {
        let fallback = Verdict {
            role_id: "none".to_string(),
            confidence: 0.0,
        };
        let v = parse_llm_json_or(CLEAN, fallback);
        assert_eq!(v.role_id, "abc");
    }

    #[test]
    fn fenced_with_prose_and_trailing_comma() {
        let text = "```json\n{\"role_id\": \"xyz\", \"confidence\": 75,}\n```\nDone.";
        let v: Verdict = parse_llm_json(text).unwrap();
        assert_eq!(v.role_id, "xyz");
        assert_eq!(v.confidence, 75.0);
    }
}
