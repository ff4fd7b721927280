//! Template Synthesis
//!
//! Renders an assembled [`AgentStack`] into a CloudFormation-shaped JSON
//! document plus an asset manifest. Synthesis is a pure function of the stack:
//! object keys are sorted, so the same stack always yields the same bytes.

use crate::artifact::ContainerArtifact;
use crate::error::StackError;
use crate::stack::AgentStack;
use crate::types::{AGENT_RUNTIME_TYPE, IAM_POLICY_TYPE, IAM_ROLE_TYPE};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output carrying the runtime id
pub const OUTPUT_RUNTIME_ID: &str = "RuntimeId";
/// Output carrying the runtime ARN
pub const OUTPUT_RUNTIME_ARN: &str = "RuntimeArn";

const TEMPLATE_SUFFIX: &str = ".template.json";
const ASSETS_SUFFIX: &str = ".assets.json";

/// One container image the template depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub source_directory: PathBuf,
    pub build_file: String,
    pub platform: String,
    pub asset_hash: String,
    pub image_uri: String,
    pub repository_name: String,
}

/// A synthesized (or loaded) template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    stack_name: String,
    body: Value,
    assets: Vec<AssetEntry>,
}

/// Render the stack into a template
pub fn synthesize(stack: &AgentStack) -> Template {
    let role = stack.role();
    let policy = stack.default_policy();
    let runtime = stack.runtime();

    let mut resources = Map::new();
    resources.insert(
        role.logical_id().to_string(),
        json!({
            "Type": IAM_ROLE_TYPE,
            "Properties": role.to_template_properties(),
        }),
    );
    resources.insert(
        policy.logical_id().to_string(),
        json!({
            "Type": IAM_POLICY_TYPE,
            "Properties": policy.to_template_properties(),
        }),
    );
    let depends_on: Vec<&str> = runtime.depends_on().iter().map(|id| id.as_str()).collect();
    resources.insert(
        runtime.logical_id().to_string(),
        json!({
            "Type": AGENT_RUNTIME_TYPE,
            "Properties": runtime.to_template_properties(),
            "DependsOn": depends_on,
        }),
    );

    let outputs = json!({
        OUTPUT_RUNTIME_ID: {
            "Description": "AgentCore Runtime ID",
            "Value": { "Fn::GetAtt": [runtime.logical_id().as_str(), "AgentRuntimeId"] },
        },
        OUTPUT_RUNTIME_ARN: {
            "Description": "AgentCore Runtime ARN",
            "Value": { "Fn::GetAtt": [runtime.logical_id().as_str(), "AgentRuntimeArn"] },
        },
    });

    let mut body = Map::new();
    if let Some(description) = stack.description() {
        body.insert(
            "Description".to_string(),
            Value::String(description.to_string()),
        );
    }
    body.insert("Resources".to_string(), Value::Object(resources));
    body.insert("Outputs".to_string(), outputs);

    let assets = vec![asset_entry(runtime.artifact(), stack)];
    debug!(stack = %stack.name(), resources = 3, "Template synthesized");

    Template {
        stack_name: stack.name().to_string(),
        body: Value::Object(body),
        assets,
    }
}

fn asset_entry(artifact: &ContainerArtifact, stack: &AgentStack) -> AssetEntry {
    AssetEntry {
        source_directory: artifact.build_context().to_path_buf(),
        build_file: artifact.build_file().to_string(),
        platform: artifact.platform().to_string(),
        asset_hash: artifact.asset_hash().to_string(),
        image_uri: artifact.image_uri(stack.target()),
        repository_name: artifact.repository_name(stack.target()),
    }
}

impl Template {
    /// Wrap an existing template document.
    ///
    /// The document must be an object with a `Resources` object.
    pub fn from_value(stack_name: impl Into<String>, body: Value) -> Result<Self, StackError> {
        match body.get("Resources") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(StackError::InvalidTemplate(
                    "Resources must be an object".to_string(),
                ))
            }
            None => {
                return Err(StackError::InvalidTemplate(
                    "missing Resources section".to_string(),
                ))
            }
        }
        Ok(Self {
            stack_name: stack_name.into(),
            body,
            assets: Vec::new(),
        })
    }

    /// Load a template file written by [`Template::write_to`] or any other tool
    pub fn load(path: &Path) -> Result<Self, StackError> {
        let contents = std::fs::read_to_string(path)?;
        let body: Value = serde_json::from_str(&contents)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stack_name = file_name
            .strip_suffix(TEMPLATE_SUFFIX)
            .or_else(|| file_name.strip_suffix(".json"))
            .unwrap_or(&file_name)
            .to_string();
        Self::from_value(stack_name, body)
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }

    pub fn assets(&self) -> &[AssetEntry] {
        &self.assets
    }

    pub fn description(&self) -> Option<&str> {
        self.body.get("Description").and_then(Value::as_str)
    }

    /// Resources keyed by logical id
    pub fn resources(&self) -> Option<&Map<String, Value>> {
        self.body.get("Resources").and_then(Value::as_object)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources().and_then(|r| r.get(logical_id))
    }

    /// `(logical id, resource)` pairs of one type, in key order
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.resources()
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
                    .map(|(id, r)| (id.as_str(), r))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.body.get("Outputs").and_then(Value::as_object)
    }

    pub fn to_string_pretty(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    /// Asset manifest document
    pub fn asset_manifest(&self) -> Value {
        json!({
            "version": 1,
            "dockerImages": self.assets,
        })
    }

    /// Write `<stack>.template.json` and `<stack>.assets.json` into `out_dir`
    pub fn write_to(&self, out_dir: &Path) -> Result<Vec<PathBuf>, StackError> {
        std::fs::create_dir_all(out_dir)?;

        let template_path = out_dir.join(format!("{}{}", self.stack_name, TEMPLATE_SUFFIX));
        std::fs::write(&template_path, self.to_string_pretty()? + "\n")?;

        let assets_path = out_dir.join(format!("{}{}", self.stack_name, ASSETS_SUFFIX));
        std::fs::write(
            &assets_path,
            serde_json::to_string_pretty(&self.asset_manifest())? + "\n",
        )?;

        info!(
            template = %template_path.display(),
            assets = %assets_path.display(),
            "Template written"
        );
        Ok(vec![template_path, assets_path])
    }
}
