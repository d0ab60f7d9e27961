//! Workflow Graph
//!
//! [`GraphBuilder`] collects steps and edges and validates them into an
//! immutable [`Workflow`]. A built workflow never changes and can be
//! shared between threads running independent executions.

use std::collections::HashMap;
use std::fmt;

use log::info;
use serde::Serialize;

use super::model::{Edge, Router, Step, Target};
use super::validator::validate_graph;
use crate::error::ConfigurationError;

/// Incrementally assembles a workflow graph.
///
/// # Example
///
/// ```
/// use gatedflow::workflow::{GraphBuilder, Step, END};
///
/// let workflow = GraphBuilder::new()
///     .add_step(Step::new("plan", |s| Ok(s)))
///     .add_step(Step::new("report", |s| Ok(s)))
///     .set_start("plan")
///     .add_edge("plan", "report")
///     .add_edge("report", END)
///     .build()
///     .unwrap();
///
/// assert_eq!(workflow.start(), "plan");
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    start: Option<String>,
    steps: Vec<Step>,
    edges: Vec<(String, Edge)>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step.
    pub fn add_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Designates the start step.
    pub fn set_start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Adds an unconditional edge.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<Target>) -> Self {
        self.edges.push((from.into(), Edge::to(to)));
        self
    }

    /// Adds a conditional edge routed by `router`.
    pub fn add_conditional_edge<I, K, T>(
        mut self,
        from: impl Into<String>,
        router: Router,
        routes: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Target>,
    {
        self.edges
            .push((from.into(), Edge::conditional(router, routes)));
        self
    }

    /// Adds a prebuilt edge.
    pub fn insert_edge(mut self, from: impl Into<String>, edge: Edge) -> Self {
        self.edges.push((from.into(), edge));
        self
    }

    /// Validates the graph and freezes it.
    pub fn build(self) -> Result<Workflow, ConfigurationError> {
        validate_graph(self.start.as_deref(), &self.steps, &self.edges)?;

        let start = self.start.ok_or(ConfigurationError::MissingStart)?;
        let order: Vec<String> = self.steps.iter().map(|s| s.name.clone()).collect();
        let steps: HashMap<String, Step> = self
            .steps
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let edges: HashMap<String, Edge> = self.edges.into_iter().collect();

        info!(
            "Workflow built: {} steps, start '{}'",
            steps.len(),
            start
        );

        Ok(Workflow {
            start,
            order,
            steps,
            edges,
        })
    }
}

/// An immutable, validated workflow graph.
#[derive(Debug, Clone)]
pub struct Workflow {
    start: String,
    order: Vec<String>,
    steps: HashMap<String, Step>,
    edges: HashMap<String, Edge>,
}

impl Workflow {
    /// Builds a workflow from its start name, steps, and step-to-edge map.
    pub fn from_parts(
        start: impl Into<String>,
        steps: Vec<Step>,
        edges: HashMap<String, Edge>,
    ) -> Result<Self, ConfigurationError> {
        let mut edges: Vec<(String, Edge)> = edges.into_iter().collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0));

        GraphBuilder {
            start: Some(start.into()),
            steps,
            edges,
        }
        .build()
    }

    /// Name of the start step.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Gets a step by name.
    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Gets a step's outgoing edge.
    pub fn get_edge(&self, name: &str) -> Option<&Edge> {
        self.edges.get(name)
    }

    /// Step names in declaration order.
    pub fn step_names(&self) -> &[String] {
        &self.order
    }

    /// Returns the number of steps in the workflow.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Read-only description of the graph for logging and introspection.
    pub fn describe(&self) -> GraphDescription {
        let edges = self
            .order
            .iter()
            .filter_map(|name| self.edges.get(name).map(|edge| (name, edge)))
            .map(|(name, edge)| match edge {
                Edge::Unconditional(target) => EdgeDescription::Unconditional {
                    from: name.clone(),
                    to: target.to_string(),
                },
                Edge::Conditional { routes, .. } => EdgeDescription::Conditional {
                    from: name.clone(),
                    routes: routes
                        .iter()
                        .map(|(outcome, target)| (outcome.clone(), target.to_string()))
                        .collect(),
                },
            })
            .collect();

        GraphDescription {
            start: self.start.clone(),
            steps: self.order.clone(),
            edges,
        }
    }
}

/// Serializable snapshot of a graph's names and edges.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GraphDescription {
    pub start: String,
    pub steps: Vec<String>,
    pub edges: Vec<EdgeDescription>,
}

/// Description of a single edge.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeDescription {
    Unconditional {
        from: String,
        to: String,
    },
    Conditional {
        from: String,
        routes: Vec<(String, String)>,
    },
}

impl fmt::Display for GraphDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start -> {}", self.start)?;
        for edge in &self.edges {
            match edge {
                EdgeDescription::Unconditional { from, to } => {
                    writeln!(f, "{} -> {}", from, to)?;
                }
                EdgeDescription::Conditional { from, routes } => {
                    for (outcome, to) in routes {
                        writeln!(f, "{} -[{}]-> {}", from, outcome, to)?;
                    }
                }
            }
        }
        Ok(())
    }
}
