//! Agent Configuration Record
//!
//! # Config Path Resolution Priority
//!
//! The default config file is resolved in the following order:
//! 1. Production path: `agent.yaml` next to the gatedflow executable
//! 2. Development path: `{project_root}/config/agent.yaml`
//! 3. Current working directory: `agent.yaml`
//!
//! # Example YAML Format
//!
//! ```yaml
//! key: migration-agent
//! enabled: true
//! model:
//!   name: claude-3-7-sonnet-20250219
//!   provider: anthropic
//!   max_tokens: 4096
//! instructions: Plan flag migrations, then execute them after approval.
//! tools: [search]
//! require_approval: true
//! dry_run: false
//! max_results: 2
//! ```

use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Tool names an agent may be allowed to use.
pub const KNOWN_TOOLS: &[&str] = &["search", "list_flags", "create_flag"];

/// Config file name looked up by [`DEFAULT_CONFIG_PATH`].
const CONFIG_FILE_NAME: &str = "agent.yaml";

/// Lazily-resolved path to the default agent configuration.
pub static DEFAULT_CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    // Priority 1: Production environment (next to executable)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let prod_path = exe_dir.join(CONFIG_FILE_NAME);
            if prod_path.exists() {
                info!("Using production config: {}", prod_path.display());
                return prod_path;
            }
        }
    }

    // Priority 2: Development environment
    let dev_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(CONFIG_FILE_NAME);

    if dev_path.exists() {
        info!("Using development config: {}", dev_path.display());
        return dev_path;
    }

    // Priority 3: Current working directory
    let cwd_path = PathBuf::from(CONFIG_FILE_NAME);
    info!("Using CWD config: {}", cwd_path.display());
    cwd_path
});

/// Model selection for the agent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Model identifier passed to the provider
    pub name: String,

    /// Provider name (e.g., "anthropic", "openai")
    pub provider: String,

    /// Optional completion token cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Validated agent configuration.
///
/// A disabled agent is a valid configuration; callers decide what to do
/// with it. Defaults are the safe choice: disabled, approval required.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Identifier of this agent configuration
    #[serde(default = "default_key")]
    pub key: String,

    /// Whether the agent may run at all
    #[serde(default)]
    pub enabled: bool,

    /// Model selection (required when enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,

    /// System instructions for the agent
    #[serde(default)]
    pub instructions: String,

    /// Tool allowlist
    #[serde(default)]
    pub tools: Vec<String>,

    /// Whether plans must be approved before execution
    #[serde(default = "default_require_approval")]
    pub require_approval: bool,

    /// Plan only; never execute
    #[serde(default)]
    pub dry_run: bool,

    /// Result cap for the search tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

fn default_key() -> String {
    "default-agent".to_string()
}

fn default_require_approval() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            enabled: false,
            model: None,
            instructions: String::new(),
            tools: Vec::new(),
            require_approval: default_require_approval(),
            dry_run: false,
            max_results: None,
        }
    }
}

impl AgentConfig {
    /// Parses and validates a configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let config: AgentConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        debug!("Agent config '{}' parsed (enabled: {})", config.key, config.enabled);
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &str) -> Result<Self, ConfigurationError> {
        info!("Loading agent config from: {}", path);

        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_string(),
            source,
        })?;

        Self::from_yaml_str(&content)
    }

    /// Checks the record for values no step could work with.
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut problems: Vec<String> = Vec::new();

        if self.key.trim().is_empty() {
            problems.push("key must not be empty".to_string());
        }

        if self.enabled {
            match &self.model {
                None => problems.push("model is required when the agent is enabled".to_string()),
                Some(model) => {
                    if model.name.trim().is_empty() {
                        problems.push("model.name must not be empty".to_string());
                    }
                    if model.provider.trim().is_empty() {
                        problems.push("model.provider must not be empty".to_string());
                    }
                    if model.max_tokens == Some(0) {
                        problems.push("model.max_tokens must be positive".to_string());
                    }
                }
            }
        }

        for tool in &self.tools {
            if !KNOWN_TOOLS.contains(&tool.as_str()) {
                problems.push(format!(
                    "unknown tool '{}' (known: {})",
                    tool,
                    KNOWN_TOOLS.join(", ")
                ));
            }
        }

        if self.max_results == Some(0) {
            problems.push("max_results must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidConfig(problems.join("; ")))
        }
    }

    /// Returns true if `tool` is on the allowlist.
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }

    /// One-line summary for logs and banners.
    pub fn summary(&self) -> String {
        let model = self
            .model
            .as_ref()
            .map(|m| format!("{}/{}", m.provider, m.name))
            .unwrap_or_else(|| "none".to_string());

        format!(
            "model={}, tools=[{}], approval={}, dry_run={}",
            model,
            self.tools.join(", "),
            self.require_approval,
            self.dry_run
        )
    }
}
