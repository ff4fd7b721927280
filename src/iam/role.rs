//! Role assembly: trust principal plus named inline policies.

use crate::error::ConfigurationError;
use crate::iam::document::{PolicyDocument, StatementGroup};
use crate::iam::statement::{Effect, PolicyStatement};
use crate::types::{LogicalId, POLICY_VERSION};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::debug;

/// Service principal AgentCore runtimes assume roles as
pub const AGENTCORE_SERVICE_PRINCIPAL: &str = "bedrock-agentcore.amazonaws.com";

/// Inline policy attached directly to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinePolicy {
    pub name: String,
    pub document: PolicyDocument,
}

/// An IAM role with exactly one trusted service principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    construct_id: String,
    logical_id: LogicalId,
    principal: String,
    inline_policies: Vec<InlinePolicy>,
}

impl Role {
    pub fn construct_id(&self) -> &str {
        &self.construct_id
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// The single trusted service principal
    pub fn trust_principal(&self) -> &str {
        &self.principal
    }

    pub fn inline_policies(&self) -> &[InlinePolicy] {
        &self.inline_policies
    }

    pub fn policy(&self, name: &str) -> Option<&PolicyDocument> {
        self.inline_policies
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.document)
    }

    /// Read the inline policies back as statement groups
    pub fn groups(&self) -> Vec<StatementGroup> {
        self.inline_policies
            .iter()
            .map(|p| StatementGroup::new(p.name.clone(), p.document.statements().to_vec()))
            .collect()
    }

    /// All statements across inline policies, in order
    pub fn statements(&self) -> impl Iterator<Item = &PolicyStatement> {
        self.inline_policies
            .iter()
            .flat_map(|p| p.document.statements())
    }

    pub fn assume_role_policy_value(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": Effect::Allow.as_str(),
                "Principal": { "Service": self.principal },
            }],
        })
    }

    /// Properties block of the `AWS::IAM::Role` resource
    pub fn to_template_properties(&self) -> Value {
        let policies: Vec<Value> = self
            .inline_policies
            .iter()
            .map(|p| {
                json!({
                    "PolicyName": p.name,
                    "PolicyDocument": p.document.to_template_value(),
                })
            })
            .collect();
        json!({
            "AssumeRolePolicyDocument": self.assume_role_policy_value(),
            "Policies": policies,
        })
    }
}

/// Builds a [`Role`] from named statement groups
#[derive(Debug, Clone)]
pub struct RoleAssembler {
    stack_name: String,
    construct_id: String,
    principal: String,
    groups: Vec<StatementGroup>,
}

impl RoleAssembler {
    pub fn new(
        stack_name: impl Into<String>,
        construct_id: impl Into<String>,
        principal: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            construct_id: construct_id.into(),
            principal: principal.into(),
            groups: Vec::new(),
        }
    }

    pub fn group(mut self, name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        self.groups.push(StatementGroup::new(name, statements));
        self
    }

    pub fn groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = StatementGroup>,
    {
        self.groups.extend(groups);
        self
    }

    /// Merge the groups into inline policies.
    ///
    /// Fails on duplicate group names, on any empty group, and when there are
    /// no statements at all.
    pub fn assemble(self) -> Result<Role, ConfigurationError> {
        if self.principal.trim().is_empty() {
            return Err(ConfigurationError::Invalid(format!(
                "role '{}' needs a trust principal",
                self.construct_id
            )));
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigurationError::DuplicateStatementGroup(
                    group.name.clone(),
                ));
            }
            if group.statements.is_empty() {
                return Err(ConfigurationError::EmptyStatements(format!(
                    "{}/{}",
                    self.construct_id, group.name
                )));
            }
        }
        if self.groups.is_empty() {
            return Err(ConfigurationError::EmptyStatements(
                self.construct_id.clone(),
            ));
        }

        let logical_id = LogicalId::for_path(&self.stack_name, &[&self.construct_id]);
        let inline_policies: Vec<InlinePolicy> = self
            .groups
            .into_iter()
            .map(|g| InlinePolicy {
                name: g.name,
                document: PolicyDocument::new(g.statements),
            })
            .collect();

        debug!(
            role = %logical_id,
            principal = %self.principal,
            policies = inline_policies.len(),
            "Role assembled"
        );

        Ok(Role {
            construct_id: self.construct_id,
            logical_id,
            principal: self.principal,
            inline_policies,
        })
    }
}
