//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Prefix of environment overrides, e.g. `AGENTSTACK_STACK__ACCOUNT`
pub const ENV_PREFIX: &str = "AGENTSTACK";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("stack.name", "StrandsAgentStack")?
        .set_default("stack.agent_dir", "agent")?
        .set_default("stack.bootstrap_qualifier", "hnb659fds")?
        .set_default("runtime.log_level", "INFO")?
        .set_default("policy.scope", "standard")?
        .set_default("policy.observability", "manual")
}

/// Environment overrides always win over files.
///
/// Sections and keys are separated by a double underscore so keys that
/// contain single underscores (`model_id`) survive.
pub fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
