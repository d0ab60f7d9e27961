//! Agent Configuration Module
//!
//! Explicit, validated configuration injected into the agent workflow.
//! Everything the workflow needs to know about model choice, tools and
//! approval policy arrives through [`AgentConfig`]; nothing is read from
//! process-wide state inside a step.

pub mod agent;

pub use agent::{AgentConfig, ModelConfig, DEFAULT_CONFIG_PATH, KNOWN_TOOLS};
