//! ConfigLoader: layered loading entry points.

use crate::config::merge::{builder_with_defaults, environment_source};
use crate::config::sources::{global_file, workspace_file};
use crate::config::StackConfig;
use crate::error::ConfigurationError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`StackConfig`] from defaults, files and environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace
    /// `agentstack.toml`, `config/{AGENTSTACK_ENV}.toml`, `AGENTSTACK_*` variables.
    pub fn load(workspace_root: &Path) -> Result<StackConfig, ConfigurationError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(environment_source()).build()?;

        let loaded: StackConfig = config.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), stack = %loaded.stack.name, "Configuration loaded");
        Ok(loaded)
    }

    /// Load configuration from one explicit file plus environment overrides.
    ///
    /// Global and workspace files are skipped.
    pub fn load_from_file(path: &Path) -> Result<StackConfig, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::Source(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(environment_source())
            .build()?;

        let loaded: StackConfig = config.try_deserialize()?;
        debug!(config_path = %path.display(), stack = %loaded.stack.name, "Configuration loaded");
        Ok(loaded)
    }

    /// Path of the global configuration file, if one can be determined
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
