//! GatedFlow - Approval-Gated Workflow Executor
//!
//! Runs a graph of named steps over a shared state record, one step at a
//! time. Edges between steps are data: either a fixed next step or a
//! conditional table keyed by a predicate over state. Gate steps ask an
//! external decision source (a person, a policy, a configuration flag)
//! for a yes/no answer and let a conditional edge act on it.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`workflow`]: Steps, edges, graph construction and validation
//! - [`execution`]: The run loop and the gate step pattern
//! - [`monitoring`]: Per-run execution timeline
//! - [`config`]: Validated agent configuration record
//! - [`agent`]: The plan / approve / execute / report workflow
//!
//! # Example
//!
//! ```rust
//! use gatedflow::execution::{gate_step, Executor, StaticDecision};
//! use gatedflow::workflow::{GraphBuilder, Router, Step, WorkflowState, END};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workflow = GraphBuilder::new()
//!         .add_step(Step::new("plan", |s: WorkflowState| Ok(s.with("plan", "deploy"))))
//!         .add_step(gate_step("wait", StaticDecision::APPROVE, "approved", |_| "Deploy?".into()))
//!         .add_step(Step::new("execute", |s: WorkflowState| Ok(s.with("done", true))))
//!         .set_start("plan")
//!         .add_edge("plan", "wait")
//!         .add_conditional_edge("wait", Router::on_flag("approved"), [("true", "execute"), ("false", END)])
//!         .add_edge("execute", END)
//!         .build()?;
//!
//!     let state = Executor::new(workflow).run(WorkflowState::new())?;
//!     assert_eq!(state.get_bool("done"), Some(true));
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod workflow;

// Re-export commonly used types
pub use config::AgentConfig;
pub use error::{ConfigurationError, DecisionError, StepError, WorkflowError};
pub use execution::engine::Executor;
pub use workflow::model::{Step, END};
pub use workflow::{GraphBuilder, Workflow, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "GatedFlow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "GatedFlow");
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::new("test", Ok);
        assert_eq!(step.name, "test");
    }

    #[test]
    fn test_module_exports_builder() {
        let result = GraphBuilder::new().build();
        assert!(matches!(result, Err(ConfigurationError::MissingStart)));
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
