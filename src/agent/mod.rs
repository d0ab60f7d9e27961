//! Agent Workflow Module
//!
//! The approval-gated agent workflow: plan the requested changes, ask
//! for approval, execute (unless in dry-run mode), and report.
//!
//! - [`steps`]: Step functions and run input helpers
//! - [`flow`]: Graph wiring and the step registry for YAML definitions

pub mod flow;
pub mod steps;

pub use flow::{agent_registry, approval_router, build_workflow, describe_workflow};
pub use steps::{initial_state, parse_items, summarize_plan};
