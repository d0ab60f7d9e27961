//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, parsing, and
//! validating gated workflows.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Step, Edge, Router, Target)
//! - [`graph`]: Graph construction and the immutable Workflow
//! - [`parser`]: YAML edge tables bound to a step registry
//! - [`validator`]: Structural validation rules
//! - [`state`]: The state record threaded through a run

pub mod graph;
pub mod model;
pub mod parser;
pub mod state;
pub mod validator;

pub use graph::{EdgeDescription, GraphBuilder, GraphDescription, Workflow};
pub use model::{Edge, Router, Step, Target, END, FALSE_OUTCOME, TRUE_OUTCOME};
pub use parser::{load_definition, StepRegistry, WorkflowDefinition};
pub use state::WorkflowState;
