//! Parsing and validation of untrusted model responses.
//!
//! The inference backend returns free text that should contain a JSON
//! object with a `summary` and an `issues` array. Models do not always
//! cooperate: the JSON may be wrapped in prose, entries may be missing
//! required fields, or the whole thing may be plain text. Nothing here is
//! ever fatal — malformed entries are dropped individually and a fully
//! unparseable response degrades to a summary with zero findings.

use serde_json::Value;

use crate::types::{Finding, Severity};

/// A validated review parsed out of raw model output.
#[derive(Debug, Clone)]
pub struct ParsedReview {
    pub summary: String,
    /// Valid findings, stable-sorted by severity (high first) so downstream
    /// caps keep the most severe issues.
    pub findings: Vec<Finding>,
    /// Number of entries dropped during validation.
    pub dropped: usize,
}

/// Parses raw model output into a [`ParsedReview`].
///
/// Tries a direct JSON parse first, then the outermost `{...}` block found
/// in the text. If neither yields a JSON object, the entire trimmed text
/// becomes the summary and the finding list is empty.
pub fn parse_review_response(text: &str) -> ParsedReview {
    let value = serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
        .or_else(|| extract_json_object(text));

    let Some(value) = value else {
        return ParsedReview {
            summary: text.trim().to_owned(),
            findings: Vec::new(),
            dropped: 0,
        };
    };

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("No issues found.")
        .to_owned();

    // "issues" is the current response contract; "comments" is a legacy
    // shape some prompts still elicit.
    let entries = value
        .get("issues")
        .or_else(|| value.get("comments"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let total = entries.len();
    let mut findings: Vec<Finding> = entries.iter().filter_map(validate_finding).collect();
    let dropped = total - findings.len();

    // Stable sort: equal severities keep the model's reported order.
    findings.sort_by_key(|f| f.severity.rank());

    ParsedReview {
        summary,
        findings,
        dropped,
    }
}

/// Finds the outermost `{...}` span in `text` and parses it as JSON.
fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Validates one issue entry against the finding contract.
///
/// Required: `path` (non-empty string), `line` (positive integer that fits
/// a u32), `severity` (high/medium/low, any case). Entries failing any of
/// these are dropped. Free-text fields are optional and passed through.
fn validate_finding(value: &Value) -> Option<Finding> {
    let obj = value.as_object()?;

    let path = obj.get("path")?.as_str()?.trim();
    if path.is_empty() {
        return None;
    }

    let line = obj.get("line")?.as_u64()?;
    if line == 0 || line > u64::from(u32::MAX) {
        return None;
    }

    let severity = obj
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::from_tag)?;

    let bug = obj
        .get("bug")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let text_field = |key: &str| -> Option<String> {
        obj.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned)
    };

    Some(Finding {
        path: path.to_owned(),
        line: line as u32,
        severity,
        bug,
        suggested_fix: text_field("suggested_fix").or_else(|| text_field("suggestedFix")),
        agent_prompt: text_field("agent_prompt").or_else(|| text_field("agentPrompt")),
    })
}
