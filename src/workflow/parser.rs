//! Workflow Definition Parser
//!
//! Loads edge tables from YAML so control flow can be changed without
//! touching step code. Step functions come from a [`StepRegistry`]; the
//! definition only names them.
//!
//! # Example YAML Format
//!
//! ```yaml
//! start: plan
//! edges:
//!   plan: wait
//!   wait:
//!     when: approved
//!     then: execute
//!     otherwise: __end__
//!   execute: report
//!   report: __end__
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::graph::{GraphBuilder, Workflow};
use super::model::{Edge, Router, Step, Target, FALSE_OUTCOME, TRUE_OUTCOME};
use crate::error::ConfigurationError;

/// Named step functions available to definitions.
#[derive(Debug, Default, Clone)]
pub struct StepRegistry {
    steps: HashMap<String, Step>,
}

impl StepRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step under its own name.
    pub fn register(&mut self, step: Step) -> Result<(), ConfigurationError> {
        if self.steps.contains_key(&step.name) {
            return Err(ConfigurationError::DuplicateStep(step.name));
        }
        self.steps.insert(step.name.clone(), step);
        Ok(())
    }

    /// Registers a step, builder style.
    pub fn with(mut self, step: Step) -> Result<Self, ConfigurationError> {
        self.register(step)?;
        Ok(self)
    }

    /// Gets a step by name.
    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Returns the number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parsed workflow definition: a start step and one edge per step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    /// Name of the first step
    pub start: String,

    /// Outgoing edge of every step, keyed by step name
    pub edges: BTreeMap<String, EdgeDefinition>,
}

/// Edge as written in YAML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EdgeDefinition {
    /// Plain target name
    Next(String),
    /// Branch on a boolean state key
    Branch(BranchDefinition),
}

/// Two-way branch on a boolean state key.
///
/// Both arms are optional at parse time so that a missing one is reported
/// as a structural defect rather than a YAML syntax error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BranchDefinition {
    pub when: String,
    #[serde(default)]
    pub then: Option<String>,
    #[serde(default)]
    pub otherwise: Option<String>,
}

impl WorkflowDefinition {
    /// Parses a definition from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let definition: WorkflowDefinition = serde_yaml::from_str(content)?;
        debug!(
            "Parsed definition: start '{}', {} edges",
            definition.start,
            definition.edges.len()
        );
        Ok(definition)
    }

    /// Builds a workflow, taking step functions from `registry`.
    ///
    /// Only steps named in the edge table become part of the workflow.
    pub fn bind(&self, registry: &StepRegistry) -> Result<Workflow, ConfigurationError> {
        let mut errors = Vec::new();
        let mut builder = GraphBuilder::new().set_start(self.start.clone());

        for (name, edge) in &self.edges {
            match registry.get(name) {
                Some(step) => builder = builder.add_step(step.clone()),
                None => {
                    errors.push(ConfigurationError::UnregisteredStep(name.clone()));
                    continue;
                }
            }

            match edge.to_edge(name) {
                Ok(edge) => builder = builder.insert_edge(name.clone(), edge),
                Err(mut defects) => errors.append(&mut defects),
            }
        }

        if let Some(err) = ConfigurationError::from_list(errors) {
            return Err(err);
        }

        builder.build()
    }
}

impl EdgeDefinition {
    fn to_edge(&self, from: &str) -> Result<Edge, Vec<ConfigurationError>> {
        match self {
            Self::Next(target) => Ok(Edge::to(target.as_str())),
            Self::Branch(branch) => {
                let missing = |arm: &str| ConfigurationError::MissingOutcome {
                    step: from.to_string(),
                    outcome: arm.to_string(),
                };

                match (&branch.then, &branch.otherwise) {
                    (Some(on_true), Some(on_false)) => Ok(Edge::conditional(
                        Router::on_flag(branch.when.clone()),
                        [
                            (TRUE_OUTCOME, Target::step(on_true.as_str())),
                            (FALSE_OUTCOME, Target::step(on_false.as_str())),
                        ],
                    )),
                    (None, Some(_)) => Err(vec![missing("then")]),
                    (Some(_), None) => Err(vec![missing("otherwise")]),
                    (None, None) => Err(vec![missing("then"), missing("otherwise")]),
                }
            }
        }
    }
}

/// Loads a workflow definition from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use gatedflow::workflow::{load_definition, StepRegistry};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let definition = load_definition("flow.yaml")?;
///     let workflow = definition.bind(&StepRegistry::new())?;
///     println!("Loaded {} steps", workflow.len());
///     Ok(())
/// }
/// ```
pub fn load_definition(path: &str) -> Result<WorkflowDefinition, ConfigurationError> {
    info!("Loading workflow definition from: {}", path);

    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_string(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", content.len());
    WorkflowDefinition::from_yaml_str(&content)
}
