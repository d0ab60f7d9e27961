//! Agent Workflow Steps
//!
//! Step functions of the plan / approve / execute / report workflow.
//! Each reads what it needs from state, fails with a descriptive
//! [`StepError`] if it is missing, and returns a new state.
//!
//! # State Keys
//!
//! - `instruction`, `project`, `items`: run input
//! - `plan`: `{ projectKey, creates: [{key}], tools, instructions }`
//! - `approved`: gate decision
//! - `results`: `[{key, status}]`
//! - `summary`, `completed_at`: report output

use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde_json::{json, Value};

use crate::config::AgentConfig;
use crate::error::{ConfigurationError, StepError};
use crate::workflow::{Step, WorkflowState};

/// Tool an agent needs on its allowlist to create anything.
pub const WRITE_TOOL: &str = "create_flag";

/// Upper bound on items a single range like `f1..f100` may expand to.
const MAX_RANGE_ITEMS: u64 = 1_000;

/// Builds the initial state of a run.
pub fn initial_state(instruction: &str, project: &str, items: &[String]) -> WorkflowState {
    [
        ("instruction", json!(instruction)),
        ("project", json!(project)),
        ("items", json!(items)),
        ("approved", json!(false)),
        ("results", json!([])),
    ]
    .into_iter()
    .collect()
}

/// Expands an item list like `f1..f5,legacy-flag` into item keys.
///
/// A range counts the trailing digits of its first bound and repeats
/// everything before them; the second bound may omit that prefix (`f1..5`).
pub fn parse_items(list: &str) -> Result<Vec<String>, ConfigurationError> {
    let mut items = Vec::new();

    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once("..") {
            Some((first, last)) => items.extend(expand_range(part, first.trim(), last.trim())?),
            None => items.push(part.to_string()),
        }
    }

    if items.is_empty() {
        return Err(ConfigurationError::InvalidConfig(format!(
            "item list '{}' names no items",
            list
        )));
    }
    Ok(items)
}

fn expand_range(part: &str, first: &str, last: &str) -> Result<Vec<String>, ConfigurationError> {
    let invalid = |reason: &str| {
        ConfigurationError::InvalidConfig(format!("invalid item range '{}': {}", part, reason))
    };

    let prefix = first.trim_end_matches(|c: char| c.is_ascii_digit());
    let start = &first[prefix.len()..];
    if start.is_empty() {
        return Err(invalid("start has no number"));
    }
    let end = last.strip_prefix(prefix).unwrap_or(last);

    let start: u64 = start.parse().map_err(|_| invalid("start is not a number"))?;
    let end: u64 = end.parse().map_err(|_| invalid("end is not a number"))?;

    if end < start {
        return Err(invalid("end is before start"));
    }
    if end - start >= MAX_RANGE_ITEMS {
        return Err(invalid("range is too large"));
    }

    Ok((start..=end).map(|n| format!("{}{}", prefix, n)).collect())
}

/// Reads the plan's item keys from state.
pub fn plan_items(state: &WorkflowState) -> Result<Vec<String>, StepError> {
    let plan = state.require("plan")?;
    let creates = plan
        .get("creates")
        .and_then(Value::as_array)
        .ok_or_else(|| StepError::invalid_state("plan", "missing 'creates' list"))?;

    creates
        .iter()
        .map(|item| {
            item.get("key")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| StepError::invalid_state("plan", "item without a key"))
        })
        .collect()
}

fn string_list(state: &WorkflowState, key: &str) -> Result<Vec<String>, StepError> {
    let values = state
        .require(key)?
        .as_array()
        .ok_or_else(|| StepError::invalid_state(key, "expected a list"))?;

    values
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| StepError::invalid_state(key, "expected strings"))
        })
        .collect()
}

/// Builds the `plan` step.
///
/// Plans only; nothing is written. Fails early when the plan would need
/// a tool the configuration does not allow.
pub fn plan_step(config: Arc<AgentConfig>) -> Step {
    Step::new("plan", move |state: WorkflowState| {
        let project = state.require_str("project")?.to_string();
        let instruction = state.require_str("instruction")?.to_string();
        let items = string_list(&state, "items")?;

        if !items.is_empty() && !config.allows_tool(WRITE_TOOL) {
            return Err(StepError::failed(format!(
                "plan needs tool '{}' which is not on the allowlist",
                WRITE_TOOL
            )));
        }

        info!("Planned {} item(s) for project '{}'", items.len(), project);

        let creates: Vec<Value> = items.iter().map(|key| json!({ "key": key })).collect();
        let plan = json!({
            "projectKey": project,
            "instruction": instruction,
            "instructions": config.instructions,
            "creates": creates,
            "tools": config.tools,
        });
        Ok(state.with("plan", plan))
    })
}

/// Renders the approval prompt for the planned state.
pub fn summarize_plan(state: &WorkflowState, config: &AgentConfig) -> String {
    let project = state
        .get("plan")
        .and_then(|p| p.get("projectKey"))
        .and_then(Value::as_str)
        .unwrap_or("<unknown>");
    let items = plan_items(state).unwrap_or_default();

    let mut lines = vec![
        format!("Project: {}", project),
        format!("Features to create: {}", items.len()),
    ];
    lines.extend(
        items
            .iter()
            .enumerate()
            .map(|(i, key)| format!("  {}. {}", i + 1, key)),
    );
    lines.push(format!("Tools: [{}]", config.tools.join(", ")));
    lines.push(format!("Dry run: {}", config.dry_run));
    lines.join("\n")
}

/// Builds the `execute` step.
///
/// With `dry_run` set, items are reported as planned but not created.
pub fn execute_step(config: Arc<AgentConfig>) -> Step {
    Step::new("execute", move |state: WorkflowState| {
        let items = plan_items(&state)?;
        let status = if config.dry_run { "planned" } else { "created" };

        let results: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(i, key)| {
                info!("Creating feature {}/{}: {}", i + 1, items.len(), key);
                json!({ "key": key, "status": status })
            })
            .collect();

        Ok(state.with("results", results))
    })
}

/// Builds the `report` step.
pub fn report_step() -> Step {
    Step::new("report", |state: WorkflowState| {
        let project = state
            .get("plan")
            .and_then(|p| p.get("projectKey"))
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();

        let results = state
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut lines = vec![
            format!("Project: {}", project),
            format!("Total features processed: {}", results.len()),
        ];
        if results.is_empty() {
            lines.push("Nothing executed (dry run)".to_string());
        }
        for result in &results {
            lines.push(format!(
                "  - {}: {}",
                result.get("key").and_then(Value::as_str).unwrap_or("?"),
                result.get("status").and_then(Value::as_str).unwrap_or("?")
            ));
        }

        Ok(state
            .with("summary", lines.join("\n"))
            .with("completed_at", Utc::now().to_rfc3339()))
    })
}
