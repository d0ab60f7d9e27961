//! Workflow Execution Module
//!
//! Provides the sequential execution engine and the gate step pattern
//! for approval-driven branching.
//!
//! # Architecture
//!
//! - [`engine`]: Run loop, invocation ceiling, fail-fast error handling
//! - [`gate`]: Decision providers and the gate step factory

pub mod engine;
pub mod gate;

pub use engine::{Executor, RunReport, DEFAULT_MAX_INVOCATIONS};
pub use gate::{
    gate_step, ConsoleDecision, DecisionProvider, RequireApproval, StaticDecision,
    DEFAULT_DECISION_KEY,
};
