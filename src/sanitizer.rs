//! Defensive sanitization of planner output.
//!
//! The upstream planner is a generative model: its output may be fenced in
//! markdown, truncated mid-object, or structurally wrong in arbitrary ways.
//! Everything here clamps rather than rejects. The only hard failure is a
//! response with no usable steps at all, and the top-level entry point
//! degrades even that into a fixed clarification plan.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::catalog;
use crate::error::{FlowError, Result};
use crate::models::plan::{MissingInput, Note, NoteKind, Plan, Step};

pub const MAX_STEPS: usize = 20;
pub const MAX_MISSING_INPUTS: usize = 10;
pub const MAX_NOTES: usize = 12;

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_PURPOSE_LEN: usize = 240;
const MAX_HINT_KEY_LEN: usize = 100;
const MAX_HINT_VALUE_LEN: usize = 200;
const MAX_FIELD_LEN: usize = 120;
const MAX_QUESTION_LEN: usize = 240;
const MAX_NOTE_LEN: usize = 280;
const MAX_EXCERPT_LEN: usize = 160;

const DEFAULT_NAME: &str = "Untitled automation";
const DEFAULT_DESCRIPTION: &str = "Automation created from chat";
const DEFAULT_PURPOSE: &str = "Unspecified step";

/// Sanitize a raw planner response. Never fails: unparsable or unusable
/// responses become a clarification plan that asks the user to rephrase.
pub fn sanitize_model_output(raw: &str) -> Plan {
    match recover_json(raw) {
        Some(value) => sanitize_value(&value).unwrap_or_else(|_| clarification_plan(raw)),
        None => clarification_plan(raw),
    }
}

/// Sanitize an already-parsed JSON value into a [`Plan`].
///
/// Accepts either the two-section shape (`{workflowSection, notesSection}`)
/// or a flat object serving as both sections. Fails only when no usable
/// steps remain after filtering.
pub fn sanitize_value(raw: &Value) -> Result<Plan> {
    let root = raw
        .as_object()
        .ok_or_else(|| FlowError::InvalidPlan("response is not a JSON object".to_string()))?;

    let workflow_section = root
        .get("workflowSection")
        .and_then(Value::as_object)
        .unwrap_or(root);
    let notes_section = root
        .get("notesSection")
        .and_then(Value::as_object)
        .unwrap_or(root);

    let workflow_name = clamp_text(workflow_section.get("workflowName"), DEFAULT_NAME, MAX_NAME_LEN);
    let description = clamp_text(
        workflow_section.get("description"),
        DEFAULT_DESCRIPTION,
        MAX_DESCRIPTION_LEN,
    );

    let mut steps = Vec::new();
    if let Some(raw_steps) = workflow_section.get("steps").and_then(Value::as_array) {
        for raw_step in raw_steps {
            if steps.len() == MAX_STEPS {
                break;
            }
            if let Some(step) = sanitize_step(raw_step) {
                steps.push(step);
            }
        }
    }
    if steps.is_empty() {
        return Err(FlowError::InvalidPlan(
            "no usable steps after filtering".to_string(),
        ));
    }

    Ok(Plan {
        workflow_name,
        description,
        steps,
        missing_inputs: sanitize_missing_inputs(notes_section.get("missingInputs")),
        notes: sanitize_notes(notes_section.get("notes")),
    })
}

/// A malformed step is dropped, never fatal on its own.
fn sanitize_step(raw: &Value) -> Option<Step> {
    let object = raw.as_object()?;
    let raw_id = object.get("blockId").and_then(Value::as_str)?;
    let block = catalog::resolve(raw_id)?;

    let mut config_hints = BTreeMap::new();
    if let Some(hints) = object.get("configHints").and_then(Value::as_object) {
        for (key, value) in hints {
            // Only plain string pairs survive; nested structures are dropped
            // key-by-key rather than poisoning the whole map.
            let Some(text) = value.as_str() else { continue };
            config_hints.insert(
                truncate(key, MAX_HINT_KEY_LEN),
                truncate(text, MAX_HINT_VALUE_LEN),
            );
        }
    }

    Some(Step {
        block_id: block.id.to_string(),
        purpose: clamp_text(object.get("purpose"), DEFAULT_PURPOSE, MAX_PURPOSE_LEN),
        config_hints,
    })
}

fn sanitize_missing_inputs(raw: Option<&Value>) -> Vec<MissingInput> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut missing = Vec::new();
    for entry in entries {
        if missing.len() == MAX_MISSING_INPUTS {
            break;
        }
        let Some(object) = entry.as_object() else {
            continue;
        };
        let field = object.get("field").and_then(Value::as_str).map(str::trim);
        let question = object.get("question").and_then(Value::as_str).map(str::trim);
        if let (Some(field), Some(question)) = (field, question)
            && !field.is_empty()
            && !question.is_empty()
        {
            missing.push(MissingInput {
                field: truncate(field, MAX_FIELD_LEN),
                question: truncate(question, MAX_QUESTION_LEN),
            });
        }
    }
    missing
}

fn sanitize_notes(raw: Option<&Value>) -> Vec<Note> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut notes = Vec::new();
    for entry in entries {
        if notes.len() == MAX_NOTES {
            break;
        }
        let Some(object) = entry.as_object() else {
            continue;
        };
        let Some(kind) = object.get("type").and_then(Value::as_str).and_then(note_kind) else {
            continue;
        };
        let Some(message) = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
        else {
            continue;
        };
        notes.push(Note {
            kind,
            message: truncate(message, MAX_NOTE_LEN),
            field: object
                .get("field")
                .and_then(Value::as_str)
                .map(|field| truncate(field, MAX_FIELD_LEN)),
        });
    }
    notes
}

fn note_kind(raw: &str) -> Option<NoteKind> {
    match raw {
        "missing_data" => Some(NoteKind::MissingData),
        "assumption" => Some(NoteKind::Assumption),
        "risk" => Some(NoteKind::Risk),
        "preference" => Some(NoteKind::Preference),
        "other" => Some(NoteKind::Other),
        _ => None,
    }
}

/// Fixed fallback when the response cannot be turned into a plan at all.
/// The upstream is a language model; it must never crash the pipeline.
fn clarification_plan(raw: &str) -> Plan {
    let excerpt = truncate(raw, MAX_EXCERPT_LEN);
    Plan {
        workflow_name: "Clarification needed".to_string(),
        description: "Could not derive an automation from the request".to_string(),
        steps: vec![Step {
            block_id: "telegram_notification".to_string(),
            purpose: "Ask the user to restate the request".to_string(),
            config_hints: BTreeMap::new(),
        }],
        missing_inputs: vec![MissingInput {
            field: "request".to_string(),
            question: format!(
                "I couldn't turn this into an automation: \"{excerpt}\". Could you rephrase it?"
            ),
        }],
        notes: vec![Note {
            kind: NoteKind::MissingData,
            message: "Planner response was not parseable".to_string(),
            field: Some("request".to_string()),
        }],
    }
}

/// Try to pull a JSON object out of free text: strip code fencing, then
/// fall back to the outermost `{...}` span.
fn recover_json(raw: &str) -> Option<Value> {
    let stripped = strip_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Some(value);
    }
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn clamp_text(value: Option<&Value>, default: &str, max: usize) -> String {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => truncate(text, max),
        _ => default.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.len() <= max {
        return text.to_string();
    }
    text[..floor_char_boundary(text, max)].to_string()
}

/// Largest byte index <= `index` that is a valid char boundary.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
