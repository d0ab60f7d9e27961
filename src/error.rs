//! Error Types
//!
//! Structured errors for graph construction, configuration loading and
//! workflow runs. Every run-time error names the step it came from so
//! callers can diagnose a failure without re-running.

use thiserror::Error;

/// A structural or configuration defect detected before any run starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Workflow has no start step")]
    MissingStart,

    #[error("Start step '{0}' is not defined")]
    UndefinedStart(String),

    #[error("Duplicate step name: '{0}'")]
    DuplicateStep(String),

    #[error("Step has empty or whitespace-only name")]
    EmptyStepName,

    #[error("Step name '{0}' collides with the terminal sentinel")]
    ReservedStepName(String),

    #[error("Step '{0}' has no outgoing edge")]
    MissingEdge(String),

    #[error("Edge declared for unknown step '{0}'")]
    EdgeForUnknownStep(String),

    #[error("Step '{0}' has more than one outgoing edge")]
    DuplicateEdge(String),

    #[error("Step '{from}' routes to unknown step '{target}'")]
    UndefinedTarget { from: String, target: String },

    #[error("Conditional edge on '{step}' has no target for outcome '{outcome}'")]
    MissingOutcome { step: String, outcome: String },

    #[error("Conditional edge on '{step}' maps undeclared outcome '{outcome}'")]
    UndeclaredOutcome { step: String, outcome: String },

    #[error("Conditional edge on '{0}' declares no outcomes")]
    EmptyRouter(String),

    #[error("No step registered under name '{0}'")]
    UnregisteredStep(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{}", format_multiple(.0))]
    Multiple(Vec<ConfigurationError>),
}

fn format_multiple(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl ConfigurationError {
    /// Collapses a list of defects into a single error.
    ///
    /// Returns `None` for an empty list and the bare error for a list of one.
    pub fn from_list(mut errors: Vec<ConfigurationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Flattens this error into its individual defects.
    pub fn defects(&self) -> Vec<&ConfigurationError> {
        match self {
            Self::Multiple(list) => list.iter().flat_map(|e| e.defects()).collect(),
            other => vec![other],
        }
    }
}

/// Failure of an external decision source consulted by a gate step.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Decision source unavailable: {0}")]
    Unavailable(String),

    #[error("Decision I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised by a step function.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error("State key '{key}' is invalid: {reason}")]
    InvalidState { key: String, reason: String },

    #[error("Undeclared routing outcome '{0}'")]
    UndeclaredOutcome(String),

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

impl StepError {
    /// Convenience constructor for free-form failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Reports a missing or malformed state entry.
    pub fn invalid_state(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Error aborting a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow failed at step '{step}': {source}")]
    Execution {
        step: String,
        #[source]
        source: StepError,
    },

    #[error("Workflow exceeded {limit} step invocations (last step: '{last_step}')")]
    Runaway { limit: usize, last_step: String },
}

impl WorkflowError {
    /// Name of the step the run stopped at.
    pub fn step(&self) -> &str {
        match self {
            Self::Execution { step, .. } => step,
            Self::Runaway { last_step, .. } => last_step,
        }
    }
}
