pub mod execution;
pub mod plan;
pub mod session;
pub mod workflow;

pub use execution::{ExecutionPhase, ExecutionStatus, NodeExecution};
pub use plan::{MissingInput, Note, NoteKind, Plan, Step};
pub use session::Session;
pub use workflow::{NodeKind, Position, WorkflowEdge, WorkflowNode, WorkflowSpec};
