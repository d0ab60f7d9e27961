//! Workflow Execution Engine
//!
//! Runs a validated [`Workflow`] one step at a time:
//! - Invoke the current step on the current state
//! - Replace the state with the step's output
//! - Resolve the outgoing edge against the new state
//! - Stop at the terminal sentinel
//!
//! A failing step aborts the run immediately and the partial state is
//! dropped. A run that keeps cycling is cut off after a configurable
//! number of invocations.

use std::time::Instant;

use log::{debug, error, info};

use crate::error::WorkflowError;
use crate::monitoring::{EventType, ExecutionTimeline};
use crate::workflow::{Target, Workflow, WorkflowState};

/// Default ceiling on step invocations per run.
pub const DEFAULT_MAX_INVOCATIONS: usize = 10_000;

/// Workflow execution engine.
///
/// Holds only the immutable graph and its settings, so one engine can
/// serve any number of runs, including concurrent runs on other threads.
///
/// # Example
///
/// ```rust
/// use gatedflow::execution::Executor;
/// use gatedflow::workflow::{GraphBuilder, Step, WorkflowState, END};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = GraphBuilder::new()
///         .add_step(Step::new("greet", |s: WorkflowState| Ok(s.with("greeting", "hello"))))
///         .set_start("greet")
///         .add_edge("greet", END)
///         .build()?;
///
///     let engine = Executor::new(workflow);
///     let state = engine.run(WorkflowState::new())?;
///     assert_eq!(state.get_str("greeting"), Some("hello"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    workflow: Workflow,
    max_invocations: usize,
}

/// Everything observed during one successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// State produced by the last step
    pub state: WorkflowState,
    /// Step names in the order they ran
    pub path: Vec<String>,
    /// Number of step invocations
    pub invocations: usize,
    /// Per-invocation timing
    pub timeline: ExecutionTimeline,
}

impl Executor {
    /// Creates a new execution engine for a workflow.
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            max_invocations: DEFAULT_MAX_INVOCATIONS,
        }
    }

    /// Sets the invocation ceiling, builder style.
    pub fn with_max_invocations(mut self, max: usize) -> Self {
        self.set_max_invocations(max);
        self
    }

    /// Sets the maximum number of step invocations per run.
    pub fn set_max_invocations(&mut self, max: usize) {
        self.max_invocations = max;
    }

    /// The invocation ceiling.
    pub fn max_invocations(&self) -> usize {
        self.max_invocations
    }

    /// The workflow this engine runs.
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Executes the workflow and returns the final state.
    ///
    /// # Returns
    ///
    /// * `Ok(state)` - The workflow reached the terminal sentinel
    /// * `Err(WorkflowError::Execution)` - A step or its routing failed
    /// * `Err(WorkflowError::Runaway)` - The invocation ceiling was exceeded
    pub fn run(&self, initial: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        self.run_traced(initial).map(|report| report.state)
    }

    /// Executes the workflow and returns the final state with its trace.
    pub fn run_traced(&self, initial: WorkflowState) -> Result<RunReport, WorkflowError> {
        let start_time = Instant::now();
        let mut timeline = ExecutionTimeline::new();
        let mut path: Vec<String> = Vec::new();

        let mut current = self.workflow.start().to_string();
        let mut state = initial;

        info!(
            "Starting workflow at '{}' (max invocations: {})",
            current, self.max_invocations
        );

        loop {
            if path.len() >= self.max_invocations {
                error!(
                    "Invocation limit {} reached before '{}'",
                    self.max_invocations, current
                );
                return Err(WorkflowError::Runaway {
                    limit: self.max_invocations,
                    last_step: current,
                });
            }

            // Validation guarantees every target names a defined step.
            let (Some(step), Some(edge)) = (
                self.workflow.get_step(&current),
                self.workflow.get_edge(&current),
            ) else {
                return Err(WorkflowError::Execution {
                    source: crate::error::StepError::failed("step is not part of the workflow"),
                    step: current,
                });
            };

            path.push(current.clone());
            let invocation = path.len();

            debug!("Starting step: {} (#{})", current, invocation);
            timeline.add_event(current.as_str(), invocation, EventType::Started);

            let next = step.invoke(state).and_then(|produced| {
                let target = edge.resolve(&produced)?.clone();
                Ok((produced, target))
            });

            match next {
                Ok((produced, target)) => {
                    timeline.add_event(current.as_str(), invocation, EventType::Completed);
                    state = produced;

                    match target {
                        Target::End => {
                            info!(
                                "Workflow completed after {} step(s) in {:.2?}",
                                invocation,
                                start_time.elapsed()
                            );
                            return Ok(RunReport {
                                state,
                                path,
                                invocations: invocation,
                                timeline,
                            });
                        }
                        Target::Step(name) => {
                            debug!("Step '{}' -> '{}'", current, name);
                            current = name;
                        }
                    }
                }
                Err(e) => {
                    timeline.add_event(current.as_str(), invocation, EventType::Failed);
                    error!("Step '{}' failed: {}", current, e);
                    return Err(WorkflowError::Execution {
                        step: current,
                        source: e,
                    });
                }
            }
        }
    }
}
