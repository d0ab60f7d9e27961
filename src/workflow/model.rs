//! Workflow Data Model
//!
//! Core data structures representing steps and the edges that wire them.
//!
//! A step is a named function over [`WorkflowState`]. Each step has exactly
//! one outgoing [`Edge`], which is either a fixed link to the next
//! [`Target`] or a conditional link evaluated by a [`Router`] against the
//! state the step produced.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::state::WorkflowState;
use crate::error::StepError;

/// Name of the terminal sentinel. No step may use it.
pub const END: &str = "__end__";

/// Outcome names produced by [`Router::branch`].
pub const TRUE_OUTCOME: &str = "true";
pub const FALSE_OUTCOME: &str = "false";

type StepFn = dyn Fn(WorkflowState) -> Result<WorkflowState, StepError> + Send + Sync;
type RouteFn = dyn Fn(&WorkflowState) -> String + Send + Sync;

/// A named unit of work in the workflow.
#[derive(Clone)]
pub struct Step {
    /// Unique name within the workflow
    pub name: String,
    func: Arc<StepFn>,
}

impl Step {
    /// Creates a new step from a name and a state transition.
    ///
    /// # Example
    ///
    /// ```
    /// use gatedflow::workflow::{Step, WorkflowState};
    ///
    /// let step = Step::new("plan", |state: WorkflowState| Ok(state.with("planned", true)));
    /// assert_eq!(step.name, "plan");
    /// ```
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(WorkflowState) -> Result<WorkflowState, StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into().trim().to_string(),
            func: Arc::new(func),
        }
    }

    /// Runs the step against `state`.
    pub fn invoke(&self, state: WorkflowState) -> Result<WorkflowState, StepError> {
        (self.func)(state)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Destination of an edge: another step or the end of the workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String", into = "String")]
pub enum Target {
    Step(String),
    End,
}

impl Target {
    /// Creates a step target, mapping the sentinel name to [`Target::End`].
    pub fn step(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == END {
            Self::End
        } else {
            Self::Step(name)
        }
    }

    /// Returns true for the terminal sentinel.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns the step name, or `None` for the sentinel.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::Step(name) => Some(name),
            Self::End => None,
        }
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::step(name)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::step(name)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(name) => write!(f, "{}", name),
            Self::End => write!(f, "{}", END),
        }
    }
}

/// Predicate over state with a closed set of possible outcomes.
///
/// Declaring outcomes up front lets construction reject a conditional edge
/// that forgets to map one of them.
#[derive(Clone)]
pub struct Router {
    outcomes: BTreeSet<String>,
    func: Arc<RouteFn>,
}

impl Router {
    /// Creates a router returning one of `outcomes`.
    pub fn new<I, S, F>(outcomes: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
    {
        Self {
            outcomes: outcomes.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    /// Creates a two-way router from a boolean predicate.
    pub fn branch<F>(predicate: F) -> Self
    where
        F: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
    {
        Self::new([TRUE_OUTCOME, FALSE_OUTCOME], move |state| {
            let outcome = if predicate(state) {
                TRUE_OUTCOME
            } else {
                FALSE_OUTCOME
            };
            outcome.to_string()
        })
    }

    /// Creates a router branching on a boolean state key.
    ///
    /// A missing or non-boolean value reads as false.
    pub fn on_flag(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::branch(move |state| state.get_bool(&key).unwrap_or(false))
    }

    /// The declared outcomes, sorted.
    pub fn outcomes(&self) -> &BTreeSet<String> {
        &self.outcomes
    }

    /// Evaluates the predicate.
    ///
    /// Fails if the predicate produced an outcome it never declared.
    pub fn route(&self, state: &WorkflowState) -> Result<String, StepError> {
        let outcome = (self.func)(state);
        if self.outcomes.contains(&outcome) {
            Ok(outcome)
        } else {
            Err(StepError::UndeclaredOutcome(outcome))
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("outcomes", &self.outcomes)
            .finish()
    }
}

/// Outgoing link of a step.
#[derive(Clone, Debug)]
pub enum Edge {
    /// Always continue to the same target
    Unconditional(Target),
    /// Evaluate a router and follow the mapped target
    Conditional {
        router: Router,
        routes: BTreeMap<String, Target>,
    },
}

impl Edge {
    /// Creates an unconditional edge.
    pub fn to(target: impl Into<Target>) -> Self {
        Self::Unconditional(target.into())
    }

    /// Creates a conditional edge from a router and an outcome table.
    pub fn conditional<I, K, T>(router: Router, routes: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Target>,
    {
        Self::Conditional {
            router,
            routes: routes
                .into_iter()
                .map(|(k, t)| (k.into(), t.into()))
                .collect(),
        }
    }

    /// Creates a two-way conditional edge from a boolean predicate.
    pub fn branch<F>(predicate: F, on_true: impl Into<Target>, on_false: impl Into<Target>) -> Self
    where
        F: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
    {
        Self::conditional(
            Router::branch(predicate),
            [(TRUE_OUTCOME, on_true.into()), (FALSE_OUTCOME, on_false.into())],
        )
    }

    /// Every target this edge can lead to.
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Self::Unconditional(target) => vec![target],
            Self::Conditional { routes, .. } => routes.values().collect(),
        }
    }

    /// Resolves the next target for the state a step just produced.
    pub fn resolve(&self, state: &WorkflowState) -> Result<&Target, StepError> {
        match self {
            Self::Unconditional(target) => Ok(target),
            Self::Conditional { router, routes } => {
                let outcome = router.route(state)?;
                routes
                    .get(&outcome)
                    .ok_or(StepError::UndeclaredOutcome(outcome))
            }
        }
    }
}
