//! Stack assembly
//!
//! One parameterized assembler covers the whole option space
//! (`scope` × `observability`). The pipeline runs in a fixed order:
//! statements, documents, role, artifact, default policy, runtime.

use crate::artifact::{ArtifactOptions, ContainerArtifact, Platform};
use crate::config::{DeploymentTarget, StackConfig};
use crate::error::{ConfigurationError, StackError};
use crate::iam::{
    ActionAllowList, PolicyStatement, Role, RoleAssembler, RolePolicy, StatementFinding,
    StatementGroup, AGENTCORE_SERVICE_PRINCIPAL,
};
use crate::runtime::{derive_runtime_name, RuntimeDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Construct id of the execution role
pub const ROLE_CONSTRUCT_ID: &str = "AgentCoreRole";

/// Name of the role's inline policy
pub const INLINE_POLICY_NAME: &str = "AgentCorePolicy";

/// CloudWatch namespace the metrics statement is conditioned on
pub const METRICS_NAMESPACE: &str = "bedrock-agentcore";

/// Cross-region inference profile prefixes
const INFERENCE_PROFILE_PREFIXES: &[&str] = &["us.", "eu.", "apac.", "us-gov.", "global."];

/// How narrowly Bedrock access is scoped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyScope {
    /// Any foundation model, any inference profile in the target
    #[default]
    Standard,
    /// Only the configured model id
    ModelScoped,
}

/// How much of the tracing pipeline the stack wires up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservabilityMode {
    /// Metrics and trace write permissions only
    #[default]
    Manual,
    /// Adds OpenTelemetry environment for the container
    OtelEnv,
    /// Adds transaction search and log discovery on top of `OtelEnv`
    FullyAutomated,
}

/// Inputs to [`StackAssembler`], resolved from configuration
#[derive(Debug, Clone)]
pub struct StackOptions {
    pub description: Option<String>,
    pub scope: PolicyScope,
    pub observability: ObservabilityMode,
    pub model_id: Option<String>,
    pub allow_list: ActionAllowList,
    pub runtime_description: String,
    pub name_suffix: String,
    pub log_level: String,
    pub platform: Platform,
    pub build_file: String,
    pub qualifier: String,
    /// Applied last; wins over generated variables
    pub environment: Vec<(String, String)>,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self::from_config(&StackConfig::default())
    }
}

impl StackOptions {
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            description: config.stack.description.clone(),
            scope: config.policy.scope,
            observability: config.policy.observability,
            model_id: config.stack.model_id.clone().filter(|m| !m.is_empty()),
            allow_list: ActionAllowList::with_extra(config.policy.unscoped_actions.iter().cloned()),
            runtime_description: config.runtime.description.clone(),
            name_suffix: config.runtime.name_suffix.clone(),
            log_level: config.runtime.log_level.clone(),
            platform: config.runtime.platform,
            build_file: config.runtime.build_file.clone(),
            qualifier: config.stack.bootstrap_qualifier.clone(),
            environment: config
                .runtime
                .environment
                .iter()
                .map(|e| (e.name.clone(), e.value.clone()))
                .collect(),
        }
    }
}

/// The assembled stack: one role, its default policy and one runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStack {
    name: String,
    description: Option<String>,
    target: DeploymentTarget,
    role: Role,
    default_policy: RolePolicy,
    runtime: RuntimeDescriptor,
    #[serde(skip)]
    allow_list: ActionAllowList,
}

impl AgentStack {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn default_policy(&self) -> &RolePolicy {
        &self.default_policy
    }

    pub fn runtime(&self) -> &RuntimeDescriptor {
        &self.runtime
    }

    pub fn allow_list(&self) -> &ActionAllowList {
        &self.allow_list
    }

    /// Lint findings across the role and its default policy
    pub fn lint(&self) -> Vec<StatementFinding> {
        self.role
            .statements()
            .chain(self.default_policy.document().statements())
            .flat_map(|s| s.lint(&self.allow_list))
            .collect()
    }
}

/// Runs the assembly pipeline for one option set
pub struct StackAssembler {
    stack_name: String,
    target: DeploymentTarget,
    options: StackOptions,
}

impl StackAssembler {
    pub fn new(stack_name: impl Into<String>, target: DeploymentTarget, options: StackOptions) -> Self {
        Self {
            stack_name: stack_name.into(),
            target,
            options,
        }
    }

    /// Assemble the stack around the build context at `agent_dir`
    pub fn assemble(self, agent_dir: &Path) -> Result<AgentStack, StackError> {
        let options = &self.options;
        let runtime_name = derive_runtime_name(&self.stack_name, &options.name_suffix)?;
        debug!(stack = %self.stack_name, runtime = %runtime_name, "Assembling stack");

        let groups = vec![StatementGroup::new(
            INLINE_POLICY_NAME,
            standard_statements(&self.target, options)?,
        )];
        let role = RoleAssembler::new(&self.stack_name, ROLE_CONSTRUCT_ID, AGENTCORE_SERVICE_PRINCIPAL)
            .groups(groups)
            .assemble()?;
        debug!(role = %role.logical_id(), "Role assembled");

        let artifact = ContainerArtifact::from_asset(
            agent_dir,
            &ArtifactOptions {
                build_file: options.build_file.clone(),
                platform: options.platform,
                extra_hash: Some(self.target.qualifier()),
                qualifier: options.qualifier.clone(),
            },
        )?;
        let default_policy =
            RolePolicy::default_for(&self.stack_name, &role, artifact.grant_pull(&self.target)?)?;

        let runtime = RuntimeDescriptor::builder(&self.stack_name)
            .name_suffix(&options.name_suffix)
            .artifact(artifact)
            .role(&role)
            .depends_on(default_policy.logical_id())
            .description(&options.runtime_description)
            .environment(runtime_environment(&self.target, options, &runtime_name))
            .build()?;

        info!(
            stack = %self.stack_name,
            runtime = %runtime.name(),
            asset_hash = %runtime.artifact().asset_hash(),
            "Stack assembled"
        );

        Ok(AgentStack {
            name: self.stack_name,
            description: self.options.description.clone(),
            target: self.target,
            role,
            default_policy,
            runtime,
            allow_list: self.options.allow_list,
        })
    }
}

/// Assemble from resolved configuration.
///
/// The agent directory is taken relative to `workspace_root` unless absolute.
pub fn assemble(
    config: &StackConfig,
    target: &DeploymentTarget,
    workspace_root: &Path,
) -> Result<AgentStack, StackError> {
    config.ensure_valid()?;
    let agent_dir: PathBuf = if config.stack.agent_dir.is_absolute() {
        config.stack.agent_dir.clone()
    } else {
        workspace_root.join(&config.stack.agent_dir)
    };
    StackAssembler::new(
        config.stack.name.clone(),
        target.clone(),
        StackOptions::from_config(config),
    )
    .assemble(&agent_dir)
}

/// Statements of the `AgentCorePolicy` inline policy
pub fn standard_statements(
    target: &DeploymentTarget,
    options: &StackOptions,
) -> Result<Vec<PolicyStatement>, ConfigurationError> {
    let partition = target.partition();
    let region = target.region();
    let account = target.account();
    let allow_list = &options.allow_list;

    let ecr = PolicyStatement::allow()
        .sid("ECRAccess")
        .actions([
            "ecr:BatchGetImage",
            "ecr:GetDownloadUrlForLayer",
            "ecr:BatchCheckLayerAvailability",
            "ecr:GetAuthorizationToken",
        ])
        .resource(format!(
            "arn:{}:ecr:{}:{}:repository/cdk-*",
            partition, region, account
        ))
        .resource("*")
        .build_checked(allow_list)?;

    let logs = PolicyStatement::allow()
        .sid("CloudWatchLogs")
        .actions([
            "logs:CreateLogGroup",
            "logs:CreateLogStream",
            "logs:PutLogEvents",
        ])
        .resource(format!(
            "arn:{}:logs:{}:{}:log-group:/aws/bedrock-agentcore/runtimes/*",
            partition, region, account
        ))
        .build_checked(allow_list)?;

    let mut observability = PolicyStatement::allow().sid("Observability").actions([
        "xray:PutTraceSegments",
        "xray:PutTelemetryRecords",
        "cloudwatch:PutMetricData",
    ]);
    if options.observability == ObservabilityMode::FullyAutomated {
        observability = observability.actions(["xray:GetSamplingRules", "xray:GetSamplingTargets"]);
    }
    let observability = observability
        .resource("*")
        .condition("StringEquals", "cloudwatch:namespace", METRICS_NAMESPACE)
        .build_checked(allow_list)?;

    let bedrock = PolicyStatement::allow()
        .sid("BedrockModels")
        .actions([
            "bedrock:InvokeModel",
            "bedrock:InvokeModelWithResponseStream",
        ])
        .resources(bedrock_resources(target, options)?)
        .build_checked(allow_list)?;

    let mut statements = vec![ecr, logs, observability, bedrock];

    if options.observability == ObservabilityMode::FullyAutomated {
        statements.push(
            PolicyStatement::allow()
                .sid("TransactionSearchLogs")
                .actions(["logs:CreateLogStream", "logs:PutLogEvents"])
                .resource(format!(
                    "arn:{}:logs:{}:{}:log-group:aws/spans:*",
                    partition, region, account
                ))
                .build_checked(allow_list)?,
        );
        statements.push(
            PolicyStatement::allow()
                .sid("LogGroupDiscovery")
                .action("logs:DescribeLogGroups")
                .resource("*")
                .build_checked(allow_list)?,
        );
    }

    Ok(statements)
}

fn bedrock_resources(
    target: &DeploymentTarget,
    options: &StackOptions,
) -> Result<Vec<String>, ConfigurationError> {
    let partition = target.partition();
    match options.scope {
        PolicyScope::Standard => Ok(vec![
            format!("arn:{}:bedrock:*::foundation-model/*", partition),
            format!(
                "arn:{}:bedrock:{}:{}:inference-profile/*",
                partition,
                target.region(),
                target.account()
            ),
        ]),
        PolicyScope::ModelScoped => {
            let model_id = options
                .model_id
                .as_deref()
                .ok_or(ConfigurationError::MissingModelId)?;
            // Inference profiles route to the base model in any region
            let base_model = INFERENCE_PROFILE_PREFIXES
                .iter()
                .find_map(|prefix| model_id.strip_prefix(prefix))
                .unwrap_or(model_id);
            Ok(vec![
                format!("arn:{}:bedrock:*::foundation-model/{}", partition, base_model),
                format!(
                    "arn:{}:bedrock:{}:{}:inference-profile/{}",
                    partition,
                    target.region(),
                    target.account(),
                    model_id
                ),
            ])
        }
    }
}

/// Container environment: base, observability, model, then user entries
pub fn runtime_environment(
    target: &DeploymentTarget,
    options: &StackOptions,
    runtime_name: &str,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("AWS_REGION".to_string(), target.region().to_string());
    env.insert("AWS_DEFAULT_REGION".to_string(), target.region().to_string());
    env.insert("LOG_LEVEL".to_string(), options.log_level.clone());

    if options.observability != ObservabilityMode::Manual {
        for (key, value) in [
            ("OTEL_PYTHON_DISTRO", "aws_distro"),
            ("OTEL_PYTHON_CONFIGURATOR", "aws_configurator"),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", "http/protobuf"),
            ("OTEL_TRACES_EXPORTER", "otlp"),
        ] {
            env.insert(key.to_string(), value.to_string());
        }
        env.insert(
            "OTEL_RESOURCE_ATTRIBUTES".to_string(),
            format!("service.name={}", runtime_name),
        );
    }
    if options.observability == ObservabilityMode::FullyAutomated {
        env.insert("AGENT_OBSERVABILITY_ENABLED".to_string(), "true".to_string());
    }
    if let Some(model_id) = &options.model_id {
        env.insert("BEDROCK_MODEL_ID".to_string(), model_id.clone());
    }
    for (key, value) in &options.environment {
        env.insert(key.clone(), value.clone());
    }
    env
}
