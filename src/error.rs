//! Error types for the automation pipeline.

use thiserror::Error;

use crate::clients::engine::EngineError;

/// Pipeline error taxonomy.
///
/// Plan-state errors (`NoPlanToExecute`, `PlanIncomplete`, `AccountNotLinked`)
/// are user-actionable and carry a message the transport layer can show
/// verbatim. Compilation errors indicate a planner/catalog contract mismatch
/// and are surfaced as-is.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The planner response had no usable steps left after sanitization.
    #[error("planner output unusable: {0}")]
    InvalidPlan(String),

    #[error("plan has no steps to compile")]
    EmptyPlan,

    #[error("a schedule needs at least one action step")]
    NoActionableSteps,

    #[error("unknown block id: {0}")]
    UnknownBlock(String),

    /// The compiled graph violated a structural invariant. Always a bug in
    /// the compiler or the catalog, never user input.
    #[error("graph invariant violated: {0}")]
    GraphInvariant(String),

    #[error("no plan available to execute")]
    NoPlanToExecute,

    /// The plan still has unresolved fields; execution is refused.
    #[error("plan is missing inputs: {}", .0.join(", "))]
    PlanIncomplete(Vec<String>),

    #[error("no account is linked to this conversation; link one first")]
    AccountNotLinked,

    #[error("planner request failed: {0}")]
    Planner(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FlowError>;
