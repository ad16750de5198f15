use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sanitized automation plan.
///
/// This is the trusted form of what the user asked for: every field has been
/// clamped by the sanitizer, every `block_id` is a catalog member. Serialized
/// with camelCase keys so a plan round-trips through its own wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub workflow_name: String,
    pub description: String,
    pub steps: Vec<Step>,
    /// Fields the planner could not resolve. Non-empty blocks execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_inputs: Vec<MissingInput>,
    /// Advisory remarks from the planner; never load-bearing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Plan {
    pub fn is_complete(&self) -> bool {
        self.missing_inputs.is_empty()
    }

    pub fn missing_fields(&self) -> Vec<String> {
        self.missing_inputs
            .iter()
            .map(|input| input.field.clone())
            .collect()
    }

    /// One-line summary for user-facing confirmation messages.
    pub fn summary(&self) -> String {
        let steps = self
            .steps
            .iter()
            .map(|step| step.block_id.as_str())
            .collect::<Vec<_>>()
            .join(" → ");
        format!("{}: {}", self.workflow_name, steps)
    }
}

/// One planner-proposed action before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub block_id: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingInput {
    pub field: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    MissingData,
    Assumption,
    Risk,
    Preference,
    Other,
}
