use serde::{Deserialize, Serialize};

use super::plan::Plan;

/// Per-conversation state, keyed by the conversation identifier.
///
/// Owned and mutated exclusively by the orchestration service. Lives for the
/// process lifetime; there is no eviction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub last_plan: Option<Plan>,
    pub last_workflow_id: Option<String>,
    pub last_execution_id: Option<String>,
    pub last_time_block_id: Option<String>,
}
