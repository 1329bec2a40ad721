//! Turns a raw RAG backend response into what the chat displays.
//!
//! The backend has shipped a few different field names over time so
//! every field is looked up through an ordered list of candidates. The
//! first candidate holding a usable value wins. Missing or oddly typed
//! fields fall back to defaults and are never treated as errors.

use serde_json::Value;

/// Candidate field names for the answer text, in priority order.
pub const ANSWER_FIELDS: [&str; 2] = ["answer", "result"];

/// Candidate field names for the supporting source fragments.
pub const SOURCE_FIELDS: [&str; 2] = ["contexts", "sources"];

/// Candidate field names for a fragment's page number.
pub const PAGE_FIELDS: [&str; 2] = ["page", "page_number"];

/// Auxiliary text fields shown under the answer when present.
pub const NOTE_FIELDS: [&str; 2] = ["trouble", "proactive"];

pub const DEFAULT_INTENT: &str = "rag";
pub const REMINDER_INTENT: &str = "reminder";
pub const FALLBACK_ANSWER: &str = "could not retrieve a response";

#[derive(Clone, Debug, PartialEq)]
pub struct Interpretation {
    pub display_text: String,
    pub is_reminder: bool,
    pub intent: String,
    /// Page of the first source fragment, when one was cited.
    pub cited_page: Option<String>,
    pub notes: Vec<String>,
}

pub fn citation(page: &str) -> String {
    format!("\n\n(reference: based on manual content around p.{})", page)
}

// Blank strings count as missing so the next field gets a chance
fn first_str<'a>(obj: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|f| obj[*f].as_str().filter(|s| !s.trim().is_empty()))
}

fn sources(resp: &Value) -> &[Value] {
    SOURCE_FIELDS
        .iter()
        .find_map(|f| resp[*f].as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Pages come back as numbers from some backends and strings from
/// others.
fn page_of(fragment: &Value) -> Option<String> {
    PAGE_FIELDS.iter().find_map(|f| match &fragment[*f] {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

pub fn interpret(resp: &Value) -> Interpretation {
    let intent = resp["intent"].as_str().unwrap_or(DEFAULT_INTENT).to_string();
    let is_reminder = intent == REMINDER_INTENT;

    let mut display_text = first_str(resp, &ANSWER_FIELDS)
        .unwrap_or(FALLBACK_ANSWER)
        .to_string();

    // Reminder responses describe the action that was taken so they
    // never get a citation
    let cited_page = if is_reminder {
        None
    } else {
        sources(resp).first().and_then(page_of)
    };
    if let Some(page) = &cited_page {
        display_text.push_str(&citation(page));
    }

    let notes = NOTE_FIELDS
        .iter()
        .filter_map(|f| resp[*f].as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    Interpretation {
        display_text,
        is_reminder,
        intent,
        cited_page,
        notes,
    }
}
