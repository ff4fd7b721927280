//! Container artifact: build context identity, image URI and pull grant.
//!
//! The asset hash covers every non-ignored file in the build context plus the
//! platform, build file and extra hash input, so any change re-identifies the
//! runtime that references the image.

pub mod hasher;
pub mod path;
pub mod walker;

use crate::config::DeploymentTarget;
use crate::error::{ArtifactError, ConfigurationError};
use crate::iam::PolicyStatement;
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use self::hasher::{compute_asset_hash, compute_content_hash, compute_context_root, compute_file_leaf};
use self::path::{canonicalize_context, relative_key};
use self::walker::{ContextWalker, WalkerConfig};

/// Default bootstrap qualifier of the asset repository
pub const DEFAULT_QUALIFIER: &str = "hnb659fds";

/// Actions needed to pull an image from the asset repository
pub const PULL_ACTIONS: &[&str] = &[
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
];

/// Container image platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    #[serde(rename = "linux/arm64")]
    LinuxArm64,
    #[serde(rename = "linux/amd64")]
    LinuxAmd64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinuxArm64 => "linux/arm64",
            Platform::LinuxAmd64 => "linux/amd64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`ContainerArtifact::from_asset`]
#[derive(Debug, Clone)]
pub struct ArtifactOptions {
    pub build_file: String,
    pub platform: Platform,
    /// Mixed into the asset hash; `account-region` separates environments
    pub extra_hash: Option<String>,
    pub qualifier: String,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self {
            build_file: "Dockerfile".to_string(),
            platform: Platform::default(),
            extra_hash: None,
            qualifier: DEFAULT_QUALIFIER.to_string(),
        }
    }
}

/// A container image built from a local directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerArtifact {
    build_context: PathBuf,
    build_file: String,
    platform: Platform,
    extra_hash: Option<String>,
    qualifier: String,
    file_count: usize,
    asset_hash: String,
}

impl ContainerArtifact {
    /// Hash the build context at `dir`.
    ///
    /// Fails when the directory or its build file does not exist.
    pub fn from_asset(dir: &Path, options: &ArtifactOptions) -> Result<Self, ArtifactError> {
        if !dir.is_dir() {
            return Err(ArtifactError::MissingBuildContext(dir.to_path_buf()));
        }
        let build_context = canonicalize_context(dir)?;
        let build_file_path = build_context.join(&options.build_file);
        if !build_file_path.is_file() {
            return Err(ArtifactError::MissingBuildFile(build_file_path));
        }

        let config = WalkerConfig::default().with_dockerignore(&build_context)?;
        let files = ContextWalker::with_config(build_context.clone(), config).walk()?;

        let mut keyed: Vec<(String, Hash)> = Vec::with_capacity(files.len());
        for file in &files {
            let key = relative_key(&build_context, &file.path)?;
            let content = std::fs::read(&file.path)?;
            keyed.push((key, compute_content_hash(&content)));
        }
        // NFC keys may order differently from raw paths
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let leaves: Vec<Hash> = keyed
            .iter()
            .map(|(key, content)| compute_file_leaf(key, content))
            .collect();
        let root = compute_context_root(&leaves);
        let asset_hash = compute_asset_hash(
            &root,
            options.platform.as_str(),
            &options.build_file,
            options.extra_hash.as_deref(),
        );

        debug!(
            context = %build_context.display(),
            files = files.len(),
            asset_hash = %asset_hash,
            "Build context hashed"
        );

        Ok(Self {
            build_context,
            build_file: options.build_file.clone(),
            platform: options.platform,
            extra_hash: options.extra_hash.clone(),
            qualifier: options.qualifier.clone(),
            file_count: files.len(),
            asset_hash,
        })
    }

    /// 64 lowercase hex characters
    pub fn asset_hash(&self) -> &str {
        &self.asset_hash
    }

    pub fn build_context(&self) -> &Path {
        &self.build_context
    }

    pub fn build_file(&self) -> &str {
        &self.build_file
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Asset repository name for the bootstrap qualifier and target
    pub fn repository_name(&self, target: &DeploymentTarget) -> String {
        format!(
            "cdk-{}-container-assets-{}-{}",
            self.qualifier,
            target.account(),
            target.region()
        )
    }

    pub fn repository_arn(&self, target: &DeploymentTarget) -> String {
        format!(
            "arn:{}:ecr:{}:{}:repository/{}",
            target.partition(),
            target.region(),
            target.account(),
            self.repository_name(target)
        )
    }

    /// Image URI as an `Fn::Sub` body resolved by the provisioning engine
    pub fn image_uri_sub(&self) -> String {
        format!(
            "${{AWS::AccountId}}.dkr.ecr.${{AWS::Region}}.${{AWS::URLSuffix}}/cdk-{}-container-assets-${{AWS::AccountId}}-${{AWS::Region}}:{}",
            self.qualifier, self.asset_hash
        )
    }

    /// Image URI with the target substituted in
    pub fn image_uri(&self, target: &DeploymentTarget) -> String {
        let url_suffix = if target.partition() == "aws-cn" {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        };
        format!(
            "{}.dkr.ecr.{}.{}/{}:{}",
            target.account(),
            target.region(),
            url_suffix,
            self.repository_name(target),
            self.asset_hash
        )
    }

    /// Statements that let a role pull this image
    pub fn grant_pull(
        &self,
        target: &DeploymentTarget,
    ) -> Result<Vec<PolicyStatement>, ConfigurationError> {
        let layers = PolicyStatement::allow()
            .actions(PULL_ACTIONS.iter().copied())
            .resource(self.repository_arn(target))
            .build()?;
        let token = PolicyStatement::allow()
            .action("ecr:GetAuthorizationToken")
            .resource("*")
            .build()?;
        Ok(vec![layers, token])
    }

    /// `AgentRuntimeArtifact` property value
    pub fn to_template_value(&self) -> Value {
        json!({
            "ContainerConfiguration": {
                "ContainerUri": { "Fn::Sub": self.image_uri_sub() },
            },
        })
    }
}
