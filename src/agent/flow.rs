//! Agent Workflow Wiring
//!
//! ```text
//! plan -> wait -[execute]-> execute -> report -> END
//!              -[dry_run]-> report
//!              -[rejected]-> END
//! ```
//!
//! The gate step `wait` only records the decision. Whether the run goes
//! on, skips to the report, or stops is decided by the conditional edge.

use std::sync::Arc;

use log::info;

use super::steps::{execute_step, plan_step, report_step, summarize_plan};
use crate::config::AgentConfig;
use crate::error::ConfigurationError;
use crate::execution::gate::{
    gate_step, DecisionProvider, RequireApproval, StaticDecision, DEFAULT_DECISION_KEY,
};
use crate::workflow::{
    GraphBuilder, GraphDescription, Router, StepRegistry, Workflow, WorkflowDefinition,
    WorkflowState, END,
};

/// Outcomes of the router after the approval gate.
pub const OUTCOME_EXECUTE: &str = "execute";
pub const OUTCOME_DRY_RUN: &str = "dry_run";
pub const OUTCOME_REJECTED: &str = "rejected";

/// Routes the approval decision, honoring the configured dry-run mode.
pub fn approval_router(dry_run: bool) -> Router {
    Router::new(
        [OUTCOME_EXECUTE, OUTCOME_DRY_RUN, OUTCOME_REJECTED],
        move |state: &WorkflowState| {
            let outcome = match (state.get_bool(DEFAULT_DECISION_KEY), dry_run) {
                (Some(true), false) => OUTCOME_EXECUTE,
                (Some(true), true) => OUTCOME_DRY_RUN,
                _ => OUTCOME_REJECTED,
            };
            outcome.to_string()
        },
    )
}

/// Builds the registry of agent steps for use with YAML definitions.
///
/// The approval provider is wrapped so that it is only consulted when
/// the configuration requires approval.
pub fn agent_registry<P>(config: &AgentConfig, provider: P) -> Result<StepRegistry, ConfigurationError>
where
    P: DecisionProvider + 'static,
{
    ensure_enabled(config)?;
    step_registry(config, provider)
}

/// Builds the plan / approve / execute / report workflow.
pub fn build_workflow<P>(config: &AgentConfig, provider: P) -> Result<Workflow, ConfigurationError>
where
    P: DecisionProvider + 'static,
{
    ensure_enabled(config)?;
    info!("Building agent workflow for '{}' ({})", config.key, config.summary());
    wire(config, step_registry(config, provider)?)
}

/// Describes the graph a configuration would run, bound to `definition`
/// if given, otherwise to the built-in wiring.
///
/// Nothing runs, so a disabled agent can still be described.
pub fn describe_workflow(
    config: &AgentConfig,
    definition: Option<&WorkflowDefinition>,
) -> Result<GraphDescription, ConfigurationError> {
    let registry = step_registry(config, StaticDecision::REJECT)?;
    let workflow = match definition {
        Some(definition) => definition.bind(&registry)?,
        None => wire(config, registry)?,
    };
    Ok(workflow.describe())
}

fn step_registry<P>(config: &AgentConfig, provider: P) -> Result<StepRegistry, ConfigurationError>
where
    P: DecisionProvider + 'static,
{
    config.validate()?;

    let shared = Arc::new(config.clone());
    let prompt_config = Arc::clone(&shared);
    let gate = gate_step(
        "wait",
        RequireApproval::new(config.require_approval, provider),
        DEFAULT_DECISION_KEY,
        move |state: &WorkflowState| summarize_plan(state, &prompt_config),
    );

    StepRegistry::new()
        .with(plan_step(Arc::clone(&shared)))?
        .with(gate)?
        .with(execute_step(shared))?
        .with(report_step())
}

fn wire(config: &AgentConfig, registry: StepRegistry) -> Result<Workflow, ConfigurationError> {
    let step = |name: &str| {
        registry
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnregisteredStep(name.to_string()))
    };

    GraphBuilder::new()
        .add_step(step("plan")?)
        .add_step(step("wait")?)
        .add_step(step("execute")?)
        .add_step(step("report")?)
        .set_start("plan")
        .add_edge("plan", "wait")
        .add_conditional_edge(
            "wait",
            approval_router(config.dry_run),
            [
                (OUTCOME_EXECUTE, "execute"),
                (OUTCOME_DRY_RUN, "report"),
                (OUTCOME_REJECTED, END),
            ],
        )
        .add_edge("execute", "report")
        .add_edge("report", END)
        .build()
}

fn ensure_enabled(config: &AgentConfig) -> Result<(), ConfigurationError> {
    if !config.enabled {
        return Err(ConfigurationError::InvalidConfig(format!(
            "agent '{}' is disabled",
            config.key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::steps::initial_state;
    use crate::config::ModelConfig;
    use crate::execution::Executor;

    fn config(require_approval: bool, dry_run: bool) -> AgentConfig {
        AgentConfig {
            key: "migration-agent".to_string(),
            enabled: true,
            model: Some(ModelConfig {
                name: "test-model".to_string(),
                provider: "test".to_string(),
                max_tokens: None,
            }),
            tools: vec!["create_flag".to_string()],
            require_approval,
            dry_run,
            ..AgentConfig::default()
        }
    }

    fn input() -> WorkflowState {
        initial_state(
            "Create f1..f3 in webapp",
            "webapp",
            &["f1".to_string(), "f2".to_string(), "f3".to_string()],
        )
    }

    #[test]
    fn test_approval_router() {
        let router = approval_router(false);
        let approved = WorkflowState::new().with(DEFAULT_DECISION_KEY, true);
        let rejected = WorkflowState::new().with(DEFAULT_DECISION_KEY, false);

        assert_eq!(router.route(&approved).unwrap(), OUTCOME_EXECUTE);
        assert_eq!(router.route(&rejected).unwrap(), OUTCOME_REJECTED);
        assert_eq!(router.route(&WorkflowState::new()).unwrap(), OUTCOME_REJECTED);
        assert_eq!(approval_router(true).route(&approved).unwrap(), OUTCOME_DRY_RUN);
    }

    #[test]
    fn test_approved_run_executes_and_reports() {
        let workflow = build_workflow(&config(true, false), StaticDecision::APPROVE).unwrap();
        let report = Executor::new(workflow).run_traced(input()).unwrap();

        assert_eq!(report.path, vec!["plan", "wait", "execute", "report"]);
        assert_eq!(report.state.get("results").unwrap().as_array().unwrap().len(), 3);
        assert!(report.state.get_str("summary").unwrap().contains("f3: created"));
    }

    #[test]
    fn test_rejected_run_stops_after_gate() {
        let workflow = build_workflow(&config(true, false), StaticDecision::REJECT).unwrap();
        let report = Executor::new(workflow).run_traced(input()).unwrap();

        assert_eq!(report.path, vec!["plan", "wait"]);
        assert_eq!(report.state.get_bool(DEFAULT_DECISION_KEY), Some(false));
        assert!(!report.state.contains("summary"));
    }

    #[test]
    fn test_dry_run_skips_execute() {
        let workflow = build_workflow(&config(true, true), StaticDecision::APPROVE).unwrap();
        let report = Executor::new(workflow).run_traced(input()).unwrap();

        assert_eq!(report.path, vec!["plan", "wait", "report"]);
        assert!(report.state.get_str("summary").unwrap().contains("Nothing executed"));
    }

    #[test]
    fn test_approval_not_required_skips_provider() {
        let workflow = build_workflow(&config(false, false), StaticDecision::REJECT).unwrap();
        let state = Executor::new(workflow).run(input()).unwrap();

        assert_eq!(state.get_bool(DEFAULT_DECISION_KEY), Some(true));
        assert!(state.contains("completed_at"));
    }

    #[test]
    fn test_disabled_agent_is_rejected() {
        let mut cfg = config(true, false);
        cfg.enabled = false;

        let result = build_workflow(&cfg, StaticDecision::APPROVE);
        assert!(matches!(result, Err(ConfigurationError::InvalidConfig(ref m)) if m.contains("disabled")));
    }

    #[test]
    fn test_registry_contents() {
        let registry = agent_registry(&config(true, false), StaticDecision::APPROVE).unwrap();
        assert_eq!(registry.len(), 4);
        for name in ["plan", "wait", "execute", "report"] {
            assert!(registry.get(name).is_some(), "missing step {}", name);
        }
    }

    #[test]
    fn test_describe_disabled_agent() {
        let mut cfg = config(true, false);
        cfg.enabled = false;

        let text = describe_workflow(&cfg, None).unwrap().to_string();
        assert!(text.contains("plan -> wait"));
        assert!(text.contains("wait -[dry_run]-> report"));
        assert!(text.contains("execute -> report"));
    }

    #[test]
    fn test_describe_with_definition() {
        let definition = WorkflowDefinition::from_yaml_str(
            "start: plan\nedges:\n  plan: wait\n  wait:\n    when: approved\n    then: execute\n    otherwise: __end__\n  execute: __end__\n",
        )
        .unwrap();

        let description = describe_workflow(&AgentConfig::default(), Some(&definition)).unwrap();
        assert_eq!(description.start, "plan");
        assert!(description.to_string().contains("wait -[true]-> execute"));
        assert!(!description.steps.contains(&"report".to_string()));
    }

    #[test]
    fn test_describe_rejects_invalid_config() {
        let cfg = AgentConfig {
            enabled: true,
            ..AgentConfig::default()
        };
        assert!(describe_workflow(&cfg, None).is_err());
    }
}
