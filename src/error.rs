//! Error types for stack assembly, synthesis, and template validation.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. Fatal: assembly stops at the first one.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error(
        "AWS {missing} not found.\n\n\
         Please configure AWS CLI credentials by running \"aws configure\", set the AWS_PROFILE \
         environment variable, or set CDK_DEFAULT_ACCOUNT/CDK_DEFAULT_REGION environment variables."
    )]
    MissingDeploymentTarget { missing: String },

    #[error("Invalid AWS account id '{0}': expected 12 digits")]
    InvalidAccount(String),

    #[error("Invalid AWS region '{0}'")]
    InvalidRegion(String),

    #[error("Duplicate statement group name '{0}'; every inline policy needs a unique name")]
    DuplicateStatementGroup(String),

    #[error("Role '{0}' has no policy statements")]
    EmptyStatements(String),

    #[error("Invalid policy statement {statement}: {reason}")]
    InvalidStatement { statement: String, reason: String },

    #[error("Invalid stack identifier '{0}': must start with an ASCII letter")]
    InvalidStackName(String),

    #[error("Invalid runtime name '{name}': {reason}")]
    InvalidRuntimeName { name: String, reason: String },

    #[error("Invalid environment variable name '{0}'")]
    InvalidEnvironmentKey(String),

    #[error("Policy scope 'model_scoped' requires stack.model_id to be set")]
    MissingModelId,

    #[error("Configuration source error: {0}")]
    Source(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::Source(err.to_string())
    }
}

/// A single deviation found in a synthesized template
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum ValidationError {
    #[error("Expected exactly {expected} resource(s) of type {resource_type}, found {actual}")]
    CountMismatch {
        resource_type: String,
        expected: usize,
        actual: usize,
    },

    #[error("{logical_id} statement {statement}: {detail}")]
    PrivilegeViolation {
        logical_id: String,
        statement: String,
        detail: String,
    },

    #[error("{logical_id}: property {path} expected {expected}, found {}", .actual.as_deref().unwrap_or("nothing"))]
    PropertyMismatch {
        logical_id: String,
        path: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("{resource_type} logical id '{logical_id}' does not contain '{expected_fragment}'")]
    NamingViolation {
        resource_type: String,
        logical_id: String,
        expected_fragment: String,
    },
}

impl ValidationError {
    /// Stable short name of the error category
    pub fn category(&self) -> &'static str {
        match self {
            ValidationError::CountMismatch { .. } => "count",
            ValidationError::PrivilegeViolation { .. } => "privilege",
            ValidationError::PropertyMismatch { .. } => "property",
            ValidationError::NamingViolation { .. } => "naming",
        }
    }
}

/// Container build context errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Build context not found: {0}")]
    MissingBuildContext(PathBuf),

    #[error("Build file not found: {0}")]
    MissingBuildFile(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for library entry points and the CLI
#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Template validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationError>),

    #[error("Template serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for StackError {
    fn from(err: config::ConfigError) -> Self {
        StackError::Configuration(err.into())
    }
}
