//! Policy documents: ordered statement lists.

use crate::iam::statement::PolicyStatement;
use crate::types::POLICY_VERSION;
use serde::Serialize;
use serde_json::{json, Value};

/// Ordered sequence of statements owned by one role or role policy.
///
/// Order carries no meaning for evaluation but is kept so that synthesis is
/// reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Look up a statement by Sid
    pub fn statement(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statements.iter().find(|s| s.sid() == Some(sid))
    }

    pub fn to_template_value(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self
                .statements
                .iter()
                .map(PolicyStatement::to_template_value)
                .collect::<Vec<_>>(),
        })
    }
}

/// A named group of statements, rendered as one inline policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementGroup {
    pub name: String,
    pub statements: Vec<PolicyStatement>,
}

impl StatementGroup {
    pub fn new(name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }
}
