//! Configuration System
//!
//! Layered configuration for stack assembly: defaults, global and workspace
//! files, and `AGENTSTACK_*` environment overrides. Resolution runs once at
//! process start; the resulting [`StackConfig`] and [`DeploymentTarget`] are
//! passed explicitly to the assembler.

use crate::artifact::Platform;
use crate::error::ConfigurationError;
use crate::logging::LoggingConfig;
use crate::runtime::is_valid_env_key;
use crate::stack::{ObservabilityMode, PolicyScope};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;
mod target;

pub use facade::ConfigLoader;
pub use merge::ENV_PREFIX;
pub use sources::workspace_file::{ENV_SELECTOR, WORKSPACE_CONFIG_FILE};
pub use target::{DeploymentTarget, ACCOUNT_ENV_CHAIN, REGION_ENV_CHAIN};

/// Serializes tests that read or write `AGENTSTACK_*` variables
#[cfg(test)]
pub(crate) static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Log levels understood by the agent container
const CONTAINER_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    /// Stack identity and deployment target
    #[serde(default)]
    pub stack: StackSettings,

    /// Agent runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Policy option set
    #[serde(default)]
    pub policy: PolicySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stack identity and deployment target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSettings {
    /// Stack identifier; the runtime name is derived from it
    #[serde(default = "default_stack_name")]
    pub name: String,

    /// Template description
    #[serde(default = "default_stack_description")]
    pub description: Option<String>,

    /// AWS account id (falls back to CDK_DEFAULT_ACCOUNT, AWS_DEFAULT_ACCOUNT_ID)
    #[serde(default)]
    pub account: Option<String>,

    /// AWS region (falls back to CDK_DEFAULT_REGION, AWS_DEFAULT_REGION)
    #[serde(default)]
    pub region: Option<String>,

    /// Bedrock model the agent invokes
    #[serde(default)]
    pub model_id: Option<String>,

    /// Agent build context, relative to the workspace root
    #[serde(default = "default_agent_dir")]
    pub agent_dir: PathBuf,

    /// Bootstrap qualifier of the asset repository
    #[serde(default = "default_bootstrap_qualifier")]
    pub bootstrap_qualifier: String,
}

fn default_stack_name() -> String {
    "StrandsAgentStack".to_string()
}

fn default_stack_description() -> Option<String> {
    Some("Demo template for strands-agents".to_string())
}

fn default_agent_dir() -> PathBuf {
    PathBuf::from("agent")
}

fn default_bootstrap_qualifier() -> String {
    "hnb659fds".to_string()
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: default_stack_name(),
            description: default_stack_description(),
            account: None,
            region: None,
            model_id: None,
            agent_dir: default_agent_dir(),
            bootstrap_qualifier: default_bootstrap_qualifier(),
        }
    }
}

/// Agent runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Runtime description
    #[serde(default = "default_runtime_description")]
    pub description: String,

    /// Appended to the normalized stack name
    #[serde(default = "default_name_suffix")]
    pub name_suffix: String,

    /// LOG_LEVEL passed to the container
    #[serde(default = "default_container_log_level")]
    pub log_level: String,

    /// Container platform
    #[serde(default)]
    pub platform: Platform,

    /// Build file inside the agent directory
    #[serde(default = "default_build_file")]
    pub build_file: String,

    /// Extra environment variables; these win over generated ones
    #[serde(default)]
    pub environment: Vec<EnvironmentEntry>,
}

fn default_runtime_description() -> String {
    "Strands agent with calculator, time, and letter counter tools".to_string()
}

fn default_name_suffix() -> String {
    "StrandsAgent".to_string()
}

fn default_container_log_level() -> String {
    "INFO".to_string()
}

fn default_build_file() -> String {
    "Dockerfile".to_string()
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            description: default_runtime_description(),
            name_suffix: default_name_suffix(),
            log_level: default_container_log_level(),
            platform: Platform::default(),
            build_file: default_build_file(),
            environment: Vec::new(),
        }
    }
}

/// One `[[runtime.environment]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub value: String,
}

/// Policy option set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default)]
    pub scope: PolicyScope,

    #[serde(default)]
    pub observability: ObservabilityMode,

    /// Added to the built-in unscoped action allow-list
    #[serde(default)]
    pub unscoped_actions: Vec<String>,
}

impl StackConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigurationError>> {
        let mut errors = Vec::new();

        if !self
            .stack
            .name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
        {
            errors.push(ConfigurationError::InvalidStackName(self.stack.name.clone()));
        }

        let qualifier = &self.stack.bootstrap_qualifier;
        if qualifier.is_empty()
            || !qualifier
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            errors.push(ConfigurationError::Invalid(format!(
                "stack.bootstrap_qualifier '{}' must be lowercase alphanumeric",
                qualifier
            )));
        }

        if self.policy.scope == PolicyScope::ModelScoped
            && self
                .stack
                .model_id
                .as_deref()
                .map(str::is_empty)
                .unwrap_or(true)
        {
            errors.push(ConfigurationError::MissingModelId);
        }

        if !CONTAINER_LOG_LEVELS.contains(&self.runtime.log_level.as_str()) {
            errors.push(ConfigurationError::Invalid(format!(
                "runtime.log_level '{}' must be one of {}",
                self.runtime.log_level,
                CONTAINER_LOG_LEVELS.join(", ")
            )));
        }

        if self.runtime.build_file.trim().is_empty() {
            errors.push(ConfigurationError::Invalid(
                "runtime.build_file must not be empty".to_string(),
            ));
        }

        for entry in &self.runtime.environment {
            if !is_valid_env_key(&entry.name) {
                errors.push(ConfigurationError::InvalidEnvironmentKey(entry.name.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every error into one fatal configuration error
    pub fn ensure_valid(&self) -> Result<(), ConfigurationError> {
        self.validate().map_err(|errors| match errors.len() {
            1 => errors.into_iter().next().unwrap_or_else(|| {
                ConfigurationError::Invalid("configuration validation failed".to_string())
            }),
            _ => {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                ConfigurationError::Invalid(format!(
                    "Configuration validation failed:\n{}",
                    messages.join("\n")
                ))
            }
        })
    }
}
