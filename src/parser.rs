// src/parser.rs
// Layered decode of model text output into transcript + notes.
// The output format is a best-effort instruction to the model, not a
// contract, so every layer degrades instead of failing the request.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Structured view of one raw model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub transcript: String,
    pub notes: Vec<String>,
    /// Set when structured extraction failed and `transcript` is just the
    /// cleaned raw text, so the caller can surface it for inspection
    pub raw_fallback: Option<String>,
}

#[derive(Deserialize)]
struct StructuredPayload {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    notes: Option<NotesField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotesField {
    Text(String),
    List(Vec<serde_json::Value>),
}

/// Parse a raw model response. Never fails:
/// fence strip -> JSON object -> embedded-JSON rescue -> raw passthrough.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let cleaned = strip_code_fence(raw);

    if let Some(parsed) = parse_structured(cleaned) {
        return parsed;
    }

    // Model chatter around an embedded object: rescue the widest brace span
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Some(parsed) = parse_structured(&cleaned[start..=end]) {
                return parsed;
            }
        }
    }

    tracing::warn!(
        "Structured extraction failed, passing raw text through ({} chars)",
        cleaned.len()
    );

    ParsedResponse {
        transcript: cleaned.to_string(),
        notes: Vec::new(),
        raw_fallback: Some(cleaned.to_string()),
    }
}

fn parse_structured(text: &str) -> Option<ParsedResponse> {
    let payload: StructuredPayload = serde_json::from_str(text).ok()?;
    Some(ParsedResponse {
        transcript: payload.transcript.trim().to_string(),
        notes: payload.notes.map(normalize_notes).unwrap_or_default(),
        raw_fallback: None,
    })
}

fn normalize_notes(notes: NotesField) -> Vec<String> {
    match notes {
        NotesField::List(entries) => entries
            .iter()
            .map(note_entry_to_string)
            .filter(|note| !note.is_empty())
            .collect(),
        NotesField::Text(text) => text
            .lines()
            .map(strip_bullet_marker)
            .filter(|note| !note.is_empty())
            .collect(),
    }
}

fn note_entry_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

fn strip_bullet_marker(line: &str) -> String {
    static BULLET_RE: OnceLock<Regex> = OnceLock::new();
    let re = BULLET_RE.get_or_init(|| Regex::new(r"^[\s\-\u{2022}]+").expect("valid bullet regex"));
    re.replace(line, "").trim().to_string()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let without_close = without_open.strip_suffix("```").unwrap_or(without_open);
    without_close.trim()
}
