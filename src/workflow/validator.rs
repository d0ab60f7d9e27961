//! Workflow Validation
//!
//! Structural checks run once when a graph is built:
//! - Start step presence
//! - Step name validity and uniqueness
//! - Edge ownership (one edge per step, none for unknown steps)
//! - Target integrity (no dangling transitions)
//! - Conditional outcome coverage
//!
//! Reachability problems are reported as warnings only. A step that can
//! never reach the end is legal to build; running into it trips the
//! executor's invocation ceiling instead.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info, warn};

use super::model::{Edge, Step, Target, END};
use crate::error::ConfigurationError;

/// Collects every structural defect of a graph.
///
/// Returns an empty list for a well-formed graph.
pub fn check_graph(
    start: Option<&str>,
    steps: &[Step],
    edges: &[(String, Edge)],
) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();

    // Step names
    let mut names: HashSet<&str> = HashSet::new();
    for step in steps {
        if step.name.is_empty() {
            errors.push(ConfigurationError::EmptyStepName);
            continue;
        }
        if step.name == END {
            errors.push(ConfigurationError::ReservedStepName(step.name.clone()));
            continue;
        }
        if !names.insert(step.name.as_str()) {
            errors.push(ConfigurationError::DuplicateStep(step.name.clone()));
        }
    }

    // Start step
    match start {
        None => errors.push(ConfigurationError::MissingStart),
        Some(name) if !names.contains(name) => {
            errors.push(ConfigurationError::UndefinedStart(name.to_string()));
        }
        Some(_) => {}
    }

    // Edge ownership
    let mut owners: HashSet<&str> = HashSet::new();
    for (from, edge) in edges {
        if !names.contains(from.as_str()) {
            errors.push(ConfigurationError::EdgeForUnknownStep(from.clone()));
            continue;
        }
        if !owners.insert(from.as_str()) {
            errors.push(ConfigurationError::DuplicateEdge(from.clone()));
            continue;
        }
        errors.extend(check_edge(from, edge, &names));
    }

    for step in steps {
        if names.contains(step.name.as_str()) && !owners.contains(step.name.as_str()) {
            errors.push(ConfigurationError::MissingEdge(step.name.clone()));
        }
    }

    errors
}

/// Validates a single edge's targets and outcome table.
fn check_edge(from: &str, edge: &Edge, names: &HashSet<&str>) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();

    if let Edge::Conditional { router, routes } = edge {
        if router.outcomes().is_empty() {
            errors.push(ConfigurationError::EmptyRouter(from.to_string()));
        }

        for outcome in router.outcomes() {
            if !routes.contains_key(outcome) {
                errors.push(ConfigurationError::MissingOutcome {
                    step: from.to_string(),
                    outcome: outcome.clone(),
                });
            }
        }

        for outcome in routes.keys() {
            if !router.outcomes().contains(outcome) {
                errors.push(ConfigurationError::UndeclaredOutcome {
                    step: from.to_string(),
                    outcome: outcome.clone(),
                });
            }
        }
    }

    for target in edge.targets() {
        if let Target::Step(name) = target {
            if !names.contains(name.as_str()) {
                errors.push(ConfigurationError::UndefinedTarget {
                    from: from.to_string(),
                    target: name.clone(),
                });
            }
        }
    }

    errors
}

/// Validates the entire graph structure.
///
/// Performs the checks of [`check_graph`] and, when they pass, logs
/// warnings for steps that are unreachable from the start or that can
/// never reach the end.
pub fn validate_graph(
    start: Option<&str>,
    steps: &[Step],
    edges: &[(String, Edge)],
) -> Result<(), ConfigurationError> {
    info!("Validating workflow with {} steps", steps.len());

    if let Some(err) = ConfigurationError::from_list(check_graph(start, steps, edges)) {
        return Err(err);
    }

    let adjacency: HashMap<&str, Vec<&Target>> = edges
        .iter()
        .map(|(from, edge)| (from.as_str(), edge.targets()))
        .collect();

    if let Some(start) = start {
        let reachable = reachable_from(start, &adjacency);
        for step in steps {
            if !reachable.contains(step.name.as_str()) {
                warn!("Step '{}' is unreachable from start '{}'", step.name, start);
            }
        }
    }

    let finishing = steps_reaching_end(&adjacency);
    for step in steps {
        if !finishing.contains(step.name.as_str()) {
            warn!(
                "Step '{}' can never reach {} - runs entering it will hit the invocation limit",
                step.name, END
            );
        }
    }

    debug!(
        "Workflow validated: start '{}', {} edges",
        start.unwrap_or_default(),
        edges.len()
    );
    Ok(())
}

/// Breadth-first walk over every possible transition from `start`.
fn reachable_from<'a>(start: &'a str, adjacency: &HashMap<&'a str, Vec<&'a Target>>) -> HashSet<&'a str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    seen.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Some(targets) = adjacency.get(current) else {
            continue;
        };
        for &target in targets {
            if let Some(next) = target.step_name() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    seen
}

/// Fixed point of "has a transition to the end or to a step that does".
fn steps_reaching_end<'a>(adjacency: &HashMap<&'a str, Vec<&'a Target>>) -> HashSet<&'a str> {
    let mut finishing: HashSet<&str> = HashSet::new();

    loop {
        let before = finishing.len();
        for (from, targets) in adjacency {
            if finishing.contains(from) {
                continue;
            }
            let reaches = targets.iter().any(|t| match t {
                Target::End => true,
                Target::Step(name) => finishing.contains(name.as_str()),
            });
            if reaches {
                finishing.insert(*from);
            }
        }
        if finishing.len() == before {
            return finishing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::Router;

    fn noop(name: &str) -> Step {
        Step::new(name, Ok)
    }

    fn edge(from: &str, to: &str) -> (String, Edge) {
        (from.to_string(), Edge::to(to))
    }

    #[test]
    fn test_valid_linear_graph() {
        let steps = vec![noop("a"), noop("b")];
        let edges = vec![edge("a", "b"), edge("b", END)];

        assert!(check_graph(Some("a"), &steps, &edges).is_empty());
        assert!(validate_graph(Some("a"), &steps, &edges).is_ok());
    }

    #[test]
    fn test_missing_start() {
        let steps = vec![noop("a")];
        let edges = vec![edge("a", END)];

        let errors = check_graph(None, &steps, &edges);
        assert!(errors.iter().any(|e| matches!(e, ConfigurationError::MissingStart)));
    }

    #[test]
    fn test_undefined_start() {
        let steps = vec![noop("a")];
        let edges = vec![edge("a", END)];

        let errors = check_graph(Some("ghost"), &steps, &edges);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::UndefinedStart(s) if s == "ghost")));
    }

    #[test]
    fn test_duplicate_step_name() {
        let steps = vec![noop("a"), noop("a")];
        let edges = vec![edge("a", END)];

        let errors = check_graph(Some("a"), &steps, &edges);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::DuplicateStep(s) if s == "a")));
    }

    #[test]
    fn test_reserved_and_empty_names() {
        let steps = vec![noop("a"), noop(END), noop("   ")];
        let edges = vec![edge("a", END)];

        let errors = check_graph(Some("a"), &steps, &edges);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::ReservedStepName(_))));
        assert!(errors.iter().any(|e| matches!(e, ConfigurationError::EmptyStepName)));
    }

    #[test]
    fn test_dangling_target() {
        let steps = vec![noop("a")];
        let edges = vec![edge("a", "nowhere")];

        let errors = check_graph(Some("a"), &steps, &edges);
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigurationError::UndefinedTarget { from, target } if from == "a" && target == "nowhere"
        )));
    }

    #[test]
    fn test_missing_and_duplicate_edges() {
        let steps = vec![noop("a"), noop("b")];
        let edges = vec![edge("a", "b"), edge("a", END), edge("ghost", END)];

        let errors = check_graph(Some("a"), &steps, &edges);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::MissingEdge(s) if s == "b")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::DuplicateEdge(s) if s == "a")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigurationError::EdgeForUnknownStep(s) if s == "ghost")));
    }

    #[test]
    fn test_conditional_missing_outcome() {
        let steps = vec![noop("wait"), noop("execute")];
        let router = Router::new(["approved", "rejected"], |_| "approved".to_string());
        let edges = vec![
            ("wait".to_string(), Edge::conditional(router, [("approved", "execute")])),
            edge("execute", END),
        ];

        let errors = check_graph(Some("wait"), &steps, &edges);
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigurationError::MissingOutcome { step, outcome } if step == "wait" && outcome == "rejected"
        )));
    }

    #[test]
    fn test_conditional_undeclared_outcome() {
        let steps = vec![noop("wait")];
        let router = Router::new(["yes"], |_| "yes".to_string());
        let edges = vec![(
            "wait".to_string(),
            Edge::conditional(router, [("yes", END), ("maybe", END)]),
        )];

        let errors = check_graph(Some("wait"), &steps, &edges);
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigurationError::UndeclaredOutcome { outcome, .. } if outcome == "maybe"
        )));
    }

    #[test]
    fn test_empty_router() {
        let steps = vec![noop("wait")];
        let router = Router::new(Vec::<String>::new(), |_| String::new());
        let edges = vec![("wait".to_string(), Edge::conditional(router, Vec::<(String, Target)>::new()))];

        let errors = check_graph(Some("wait"), &steps, &edges);
        assert!(errors.iter().any(|e| matches!(e, ConfigurationError::EmptyRouter(_))));
    }

    #[test]
    fn test_validate_reports_all_defects() {
        let steps = vec![noop("a"), noop("b")];
        let edges = vec![edge("a", "ghost")];

        let err = validate_graph(Some("missing"), &steps, &edges).unwrap_err();
        assert!(err.defects().len() >= 3);
    }

    #[test]
    fn test_cycle_without_end_is_still_valid() {
        let steps = vec![noop("a"), noop("b")];
        let edges = vec![edge("a", "b"), edge("b", "a")];

        assert!(validate_graph(Some("a"), &steps, &edges).is_ok());
    }

    #[test]
    fn test_reachability_helpers() {
        let steps = vec![noop("a"), noop("b"), noop("c"), noop("d")];
        let edges = vec![edge("a", "b"), edge("b", END), edge("c", "d"), edge("d", "c")];
        let adjacency: HashMap<&str, Vec<&Target>> = edges
            .iter()
            .map(|(from, edge)| (from.as_str(), edge.targets()))
            .collect();

        let reachable = reachable_from("a", &adjacency);
        assert!(reachable.contains("b"));
        assert!(!reachable.contains("c"));

        let finishing = steps_reaching_end(&adjacency);
        assert!(finishing.contains("a"));
        assert!(finishing.contains("b"));
        assert!(!finishing.contains("c"));
        assert!(!finishing.contains("d"));
        assert_eq!(steps.len(), 4);
    }
}
