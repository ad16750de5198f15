use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Execution lifecycle as reported by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Pending,
    Running,
    WaitingForSignature,
    Success,
    Failed,
    /// Statuses this client version does not know yet.
    #[serde(other)]
    Unknown,
}

impl ExecutionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Snapshot of one workflow execution, owned by the engine; this crate only
/// ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub id: String,
    pub status: ExecutionPhase,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<ExecutionErrorInfo>,
    #[serde(default)]
    pub node_executions: Option<Vec<NodeExecution>>,
}

impl ExecutionStatus {
    pub fn run_duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }

    /// Transaction hashes surfaced in per-node output data, paired with the
    /// chain the node reported, if any.
    pub fn transaction_refs(&self) -> Vec<TransactionRef> {
        let Some(records) = &self.node_executions else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        for record in records {
            let Some(output) = record.output_data.as_ref().and_then(Value::as_object) else {
                continue;
            };
            let hash = ["txHash", "transactionHash"]
                .iter()
                .find_map(|key| output.get(*key).and_then(Value::as_str));
            if let Some(hash) = hash {
                refs.push(TransactionRef {
                    chain: output
                        .get("chain")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    hash: hash.to_string(),
                });
            }
        }
        refs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionErrorInfo {
    pub message: String,
}

/// Per-node record inside an execution status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecution {
    pub node_type: String,
    pub status: ExecutionPhase,
    #[serde(default)]
    pub output_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRef {
    pub chain: Option<String>,
    pub hash: String,
}
