//! AgentCore runtime descriptor and runtime name derivation.

use crate::artifact::ContainerArtifact;
use crate::error::ConfigurationError;
use crate::iam::Role;
use crate::types::LogicalId;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Construct id of the runtime resource
pub const RUNTIME_CONSTRUCT_ID: &str = "StrandsAgentRuntime";

/// Suffix appended to the normalized stack identifier
pub const DEFAULT_NAME_SUFFIX: &str = "StrandsAgent";

/// Provider limit on runtime names
pub const MAX_RUNTIME_NAME_LEN: usize = 48;

pub const DEFAULT_NETWORK_MODE: &str = "PUBLIC";
pub const DEFAULT_PROTOCOL: &str = "HTTP";

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Collapse every run of characters outside `[A-Za-z0-9]` into one `_`.
/// A trailing underscore is dropped.
fn normalize_identifier(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Derive the runtime name from a stack identifier.
///
/// `Test-Stack` becomes `Test_Stack_StrandsAgent`. Normalized input that
/// already ends in `_<suffix>` is returned unchanged, so the derivation is
/// idempotent. As a consequence stacks `Foo` and `Foo_StrandsAgent` derive the
/// same name and collide if deployed to one account.
pub fn derive_runtime_name(stack_id: &str, suffix: &str) -> Result<String, ConfigurationError> {
    if !stack_id
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        return Err(ConfigurationError::InvalidStackName(stack_id.to_string()));
    }
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigurationError::InvalidRuntimeName {
            name: suffix.to_string(),
            reason: "suffix must be non-empty and alphanumeric".to_string(),
        });
    }

    let normalized = normalize_identifier(stack_id);
    let tail = format!("_{}", suffix);
    let name = if normalized.ends_with(&tail) {
        debug!(stack = %stack_id, name = %normalized, "Identifier already carries the suffix");
        normalized
    } else {
        format!("{}{}", normalized, tail)
    };

    if name.len() > MAX_RUNTIME_NAME_LEN {
        return Err(ConfigurationError::InvalidRuntimeName {
            reason: format!(
                "{} characters exceeds the limit of {}",
                name.len(),
                MAX_RUNTIME_NAME_LEN
            ),
            name,
        });
    }
    Ok(name)
}

/// The managed runtime resource.
///
/// Holds the role by logical id; provisioning order is expressed through
/// [`RuntimeDescriptor::depends_on`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDescriptor {
    logical_id: LogicalId,
    name: String,
    artifact: ContainerArtifact,
    role: LogicalId,
    environment: BTreeMap<String, String>,
    description: Option<String>,
    depends_on: Vec<LogicalId>,
    network_mode: String,
    protocol: String,
}

impl RuntimeDescriptor {
    pub fn builder(stack_id: impl Into<String>) -> RuntimeDescriptorBuilder {
        RuntimeDescriptorBuilder::new(stack_id)
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &ContainerArtifact {
        &self.artifact
    }

    /// Logical id of the execution role
    pub fn role(&self) -> &LogicalId {
        &self.role
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resources that must exist before this one, role last
    pub fn depends_on(&self) -> &[LogicalId] {
        &self.depends_on
    }

    pub fn network_mode(&self) -> &str {
        &self.network_mode
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Properties block of the runtime resource
    pub fn to_template_properties(&self) -> Value {
        let mut props = Map::new();
        props.insert(
            "AgentRuntimeArtifact".to_string(),
            self.artifact.to_template_value(),
        );
        props.insert(
            "AgentRuntimeName".to_string(),
            Value::String(self.name.clone()),
        );
        if let Some(description) = &self.description {
            props.insert(
                "Description".to_string(),
                Value::String(description.clone()),
            );
        }
        props.insert("EnvironmentVariables".to_string(), json!(self.environment));
        props.insert(
            "NetworkConfiguration".to_string(),
            json!({ "NetworkMode": self.network_mode }),
        );
        props.insert(
            "ProtocolConfiguration".to_string(),
            Value::String(self.protocol.clone()),
        );
        props.insert(
            "RoleArn".to_string(),
            json!({ "Fn::GetAtt": [self.role.as_str(), "Arn"] }),
        );
        Value::Object(props)
    }
}

/// Builder for [`RuntimeDescriptor`]
#[derive(Debug, Clone)]
pub struct RuntimeDescriptorBuilder {
    stack_id: String,
    suffix: String,
    artifact: Option<ContainerArtifact>,
    role: Option<LogicalId>,
    environment: BTreeMap<String, String>,
    description: Option<String>,
    depends_on: Vec<LogicalId>,
    network_mode: String,
    protocol: String,
}

impl RuntimeDescriptorBuilder {
    pub fn new(stack_id: impl Into<String>) -> Self {
        Self {
            stack_id: stack_id.into(),
            suffix: DEFAULT_NAME_SUFFIX.to_string(),
            artifact: None,
            role: None,
            environment: BTreeMap::new(),
            description: None,
            depends_on: Vec::new(),
            network_mode: DEFAULT_NETWORK_MODE.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    pub fn name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn artifact(mut self, artifact: ContainerArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Execution role; also recorded as a dependency
    pub fn role(mut self, role: &Role) -> Self {
        self.role = Some(role.logical_id().clone());
        self
    }

    /// Set one variable, replacing any earlier value
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn environment<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        vars.into_iter().fold(self, |b, (k, v)| b.env(k, v))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Extra prerequisite, listed before the role
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    pub fn network_mode(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = mode.into();
        self
    }

    pub fn build(self) -> Result<RuntimeDescriptor, ConfigurationError> {
        let name = derive_runtime_name(&self.stack_id, &self.suffix)?;
        let artifact = self.artifact.ok_or_else(|| {
            ConfigurationError::Invalid(format!("runtime '{}' needs a container artifact", name))
        })?;
        let role = self.role.ok_or_else(|| {
            ConfigurationError::Invalid(format!("runtime '{}' needs an execution role", name))
        })?;
        if let Some(key) = self.environment.keys().find(|k| !is_valid_env_key(k)) {
            return Err(ConfigurationError::InvalidEnvironmentKey(key.clone()));
        }

        let mut depends_on = self.depends_on;
        if !depends_on.contains(&role) {
            depends_on.push(role.clone());
        }

        let logical_id = LogicalId::for_path(&self.stack_id, &[RUNTIME_CONSTRUCT_ID]);
        debug!(
            runtime = %name,
            logical_id = %logical_id,
            role = %role,
            env_vars = self.environment.len(),
            "Runtime descriptor built"
        );

        Ok(RuntimeDescriptor {
            logical_id,
            name,
            artifact,
            role,
            environment: self.environment,
            description: self.description,
            depends_on,
            network_mode: self.network_mode,
            protocol: self.protocol,
        })
    }
}
