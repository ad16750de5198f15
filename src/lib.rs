//! ChainFlow core: turns a free-text automation request into an executable
//! workflow graph and tracks that workflow to completion.
//!
//! The pipeline is sanitize → compile → create/execute → track:
//! - [`sanitizer`] clamps untrusted planner output into a typed [`Plan`]
//! - [`compiler`] turns a plan into a backend-ready workflow graph
//! - [`tracker`] polls executions to a terminal status and notifies the user
//! - [`service`] sequences the pipeline once per plan/execute call
//!
//! The chat transport and process bootstrap live outside this crate; they
//! consume [`AutomationService`] as the API surface.

pub mod catalog;
pub mod chains;
pub mod channel;
pub mod clients;
pub mod compiler;
pub mod config;
pub mod error;
pub mod models;
pub mod sanitizer;
pub mod service;
pub mod telemetry;
pub mod tracker;

pub use config::Settings;
pub use error::{FlowError, Result};
pub use models::plan::Plan;
pub use service::{AutomationService, ExecuteArgs, ExecuteOutcome};
