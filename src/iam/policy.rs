//! Standalone role policy (`AWS::IAM::Policy`) attached to a role.
//!
//! Grants made by other constructs land here rather than in the role's
//! inline policies, so the role's own documents stay as assembled.

use crate::error::ConfigurationError;
use crate::iam::document::PolicyDocument;
use crate::iam::role::Role;
use crate::iam::statement::PolicyStatement;
use crate::types::LogicalId;
use serde::Serialize;
use serde_json::{json, Value};

/// Construct path component of a role's default policy
pub const DEFAULT_POLICY_ID: &str = "DefaultPolicy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePolicy {
    logical_id: LogicalId,
    role: LogicalId,
    document: PolicyDocument,
}

impl RolePolicy {
    /// Default policy of `role` holding the given grant statements
    pub fn default_for(
        stack_name: &str,
        role: &Role,
        statements: Vec<PolicyStatement>,
    ) -> Result<Self, ConfigurationError> {
        if statements.is_empty() {
            return Err(ConfigurationError::EmptyStatements(format!(
                "{}/{}",
                role.construct_id(),
                DEFAULT_POLICY_ID
            )));
        }
        Ok(Self {
            logical_id: LogicalId::for_path(stack_name, &[role.construct_id(), DEFAULT_POLICY_ID]),
            role: role.logical_id().clone(),
            document: PolicyDocument::new(statements),
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Logical id of the role this policy is attached to
    pub fn role(&self) -> &LogicalId {
        &self.role
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn to_template_properties(&self) -> Value {
        json!({
            "PolicyName": self.logical_id.as_str(),
            "PolicyDocument": self.document.to_template_value(),
            "Roles": [{ "Ref": self.role.as_str() }],
        })
    }
}
