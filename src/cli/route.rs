//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::config::{ConfigLoader, DeploymentTarget, StackConfig, ENV_SELECTOR, WORKSPACE_CONFIG_FILE};
use crate::error::{ConfigurationError, StackError};
use crate::iam::ActionAllowList;
use crate::runtime::derive_runtime_name;
use crate::stack::{self, AgentStack, StackOptions};
use crate::synthesis::{synthesize, Template};
use crate::validate::{validate_stack, TemplateExpectations, TemplateValidator, ValidationReport};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cli::parse::{command_name, Commands};
use crate::cli::presentation::{
    format_config_json, format_config_text, format_lint_json, format_lint_text,
    format_validation_report_json, format_validation_report_text, format_written_files,
    ConfigView,
};

/// Values given on the command line; these win over every config layer
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub account: Option<String>,
    pub region: Option<String>,
    pub stack_name: Option<String>,
}

/// Runtime context for CLI execution: workspace, resolved config and target.
/// Configuration and target are resolved once, here.
pub struct RunContext {
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
    config: StackConfig,
    target: Result<DeploymentTarget, ConfigurationError>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        overrides: CliOverrides,
    ) -> Result<Self, StackError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        if let Some(account) = overrides.account {
            config.stack.account = Some(account);
        }
        if let Some(region) = overrides.region {
            config.stack.region = Some(region);
        }
        if let Some(name) = overrides.stack_name {
            config.stack.name = name;
        }

        // Resolution failures only matter to commands that assemble
        let target = DeploymentTarget::resolve(&config.stack);
        match &target {
            Ok(t) => debug!(account = %t.account(), region = %t.region(), "Deployment target resolved"),
            Err(e) => debug!(error = %e, "Deployment target unresolved"),
        }

        Ok(Self {
            workspace_root,
            config_path,
            config,
            target,
        })
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The resolved target, or the fatal error explaining why there is none
    pub fn target(&self) -> Result<&DeploymentTarget, StackError> {
        self.target.as_ref().map_err(|e| StackError::from(e.clone()))
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, StackError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = command_name(command), duration_ms, "Command finished"),
            Err(e) => warn!(command = command_name(command), duration_ms, error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, StackError> {
        match command {
            Commands::Synth { out } => self.handle_synth(out.as_deref()),
            Commands::Validate { template, format } => {
                self.handle_validate(template.as_deref(), format)
            }
            Commands::Lint { format } => self.handle_lint(format),
            Commands::Name { stack_id } => self.handle_name(stack_id),
            Commands::Config { format } => self.handle_config(format),
        }
    }

    fn assemble(&self) -> Result<AgentStack, StackError> {
        stack::assemble(&self.config, self.target()?, &self.workspace_root)
    }

    fn handle_synth(&self, out: Option<&Path>) -> Result<String, StackError> {
        let stack = self.assemble()?;
        let template = synthesize(&stack);
        validate_stack(&stack, &template).into_result()?;

        match out {
            Some(dir) => {
                let dir = if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    self.workspace_root.join(dir)
                };
                let written = template.write_to(&dir)?;
                Ok(format_written_files(&written))
            }
            None => template.to_string_pretty(),
        }
    }

    fn handle_validate(&self, template: Option<&Path>, format: &str) -> Result<String, StackError> {
        let report = match template {
            Some(path) => {
                let template = Template::load(path)?;
                self.existing_template_validator().validate(&template)
            }
            None => {
                let stack = self.assemble()?;
                let template = synthesize(&stack);
                validate_stack(&stack, &template)
            }
        };
        render_report(report, format)
    }

    /// Standard expectations, narrowed by whatever configuration is known
    fn existing_template_validator(&self) -> TemplateValidator {
        let mut expectations = TemplateExpectations {
            allow_list: ActionAllowList::with_extra(
                self.config.policy.unscoped_actions.iter().cloned(),
            ),
            ..TemplateExpectations::default()
        };
        if let Ok(target) = &self.target {
            expectations.account = Some(target.account().to_string());
            match derive_runtime_name(&self.config.stack.name, &self.config.runtime.name_suffix) {
                Ok(name) => {
                    let options = StackOptions::from_config(&self.config);
                    expectations.environment = stack::runtime_environment(target, &options, &name);
                    expectations.runtime_name = Some(name);
                }
                Err(e) => debug!(error = %e, "Runtime name unavailable, skipping name checks"),
            }
        }
        TemplateValidator::new(expectations)
    }

    fn handle_lint(&self, format: &str) -> Result<String, StackError> {
        let stack = self.assemble()?;
        let findings = stack.lint();
        if format == "json" {
            format_lint_json(&findings)
        } else {
            Ok(format_lint_text(&findings))
        }
    }

    fn handle_name(&self, stack_id: &str) -> Result<String, StackError> {
        Ok(derive_runtime_name(stack_id, &self.config.runtime.name_suffix)?)
    }

    fn handle_config(&self, format: &str) -> Result<String, StackError> {
        let view = ConfigView {
            config: &self.config,
            target: self.target.as_ref().ok(),
            target_error: self.target.as_ref().err().map(|e| e.to_string()),
            runtime_name: derive_runtime_name(
                &self.config.stack.name,
                &self.config.runtime.name_suffix,
            )
            .ok(),
            sources: self.config_sources(),
        };
        if format == "json" {
            format_config_json(&view)
        } else {
            Ok(format_config_text(&view))
        }
    }

    /// Config files that exist and took part in loading
    fn config_sources(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.config_path {
            return vec![path.clone()];
        }
        let mut sources: Vec<PathBuf> = ConfigLoader::global_config_path().into_iter().collect();
        sources.push(self.workspace_root.join(WORKSPACE_CONFIG_FILE));
        let env_name = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());
        sources.push(
            self.workspace_root
                .join("config")
                .join(format!("{}.toml", env_name)),
        );
        sources.into_iter().filter(|p| p.is_file()).collect()
    }
}

/// Passing reports render; failing ones become the error
fn render_report(report: ValidationReport, format: &str) -> Result<String, StackError> {
    if !report.is_ok() {
        return report.into_result().map(|_| String::new());
    }
    if format == "json" {
        format_validation_report_json(&report)
    } else {
        Ok(format_validation_report_text(&report))
    }
}
