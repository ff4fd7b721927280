//! Policy statement value objects and their builder.

use crate::error::ConfigurationError;
use crate::iam::actions::{
    is_sensitive_action, is_wildcard_action, is_wildcard_resource, ActionAllowList,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Condition block: operator -> condition key -> value
pub type ConditionMap = BTreeMap<String, BTreeMap<String, String>>;

/// A single access-control statement.
///
/// Effect and at least one action and resource are always present. A
/// condition map, when present, is never empty. Actions behave as a set:
/// duplicates are dropped, first occurrence wins the position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<String>,
    conditions: Option<ConditionMap>,
}

impl PolicyStatement {
    /// Start a statement with the given effect
    pub fn builder(effect: Effect) -> StatementBuilder {
        StatementBuilder::new(effect)
    }

    /// Start an Allow statement
    pub fn allow() -> StatementBuilder {
        StatementBuilder::new(Effect::Allow)
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn conditions(&self) -> Option<&ConditionMap> {
        self.conditions.as_ref()
    }

    /// Sid if present, otherwise a placeholder for diagnostics
    pub fn label(&self) -> String {
        self.sid.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }

    pub fn has_wildcard_resource(&self) -> bool {
        self.resources.iter().any(|r| is_wildcard_resource(r))
    }

    /// Flag actions that make a wildcard resource dangerous.
    ///
    /// Only Allow statements with a `*` resource can produce findings.
    pub fn lint(&self, allow_list: &ActionAllowList) -> Vec<StatementFinding> {
        if self.effect != Effect::Allow || !self.has_wildcard_resource() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for action in &self.actions {
            if allow_list.contains(action) {
                continue;
            }
            let kind = if is_wildcard_action(action) {
                FindingKind::WildcardActionOnWildcardResource
            } else if is_sensitive_action(action) {
                FindingKind::SensitiveVerbOnWildcardResource
            } else {
                continue;
            };
            findings.push(StatementFinding {
                statement: self.label(),
                action: action.clone(),
                kind,
            });
        }
        findings
    }

    /// Render as an IAM JSON statement
    pub fn to_template_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(sid) = &self.sid {
            obj.insert("Sid".to_string(), Value::String(sid.clone()));
        }
        obj.insert(
            "Effect".to_string(),
            Value::String(self.effect.as_str().to_string()),
        );
        obj.insert("Action".to_string(), one_or_many(&self.actions));
        obj.insert("Resource".to_string(), one_or_many(&self.resources));
        if let Some(conditions) = &self.conditions {
            let rendered: Map<String, Value> = conditions
                .iter()
                .map(|(operator, entries)| {
                    let entries: Map<String, Value> = entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect();
                    (operator.clone(), Value::Object(entries))
                })
                .collect();
            obj.insert("Condition".to_string(), Value::Object(rendered));
        }
        Value::Object(obj)
    }
}

/// Single values render as a string, several as an array
pub(crate) fn one_or_many(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        _ => Value::Array(values.iter().cloned().map(Value::String).collect()),
    }
}

/// Kind of lint finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    WildcardActionOnWildcardResource,
    SensitiveVerbOnWildcardResource,
}

/// An action that widens a wildcard-resource statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementFinding {
    pub statement: String,
    pub action: String,
    pub kind: FindingKind,
}

impl fmt::Display for StatementFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FindingKind::WildcardActionOnWildcardResource => write!(
                f,
                "statement {}: wildcard action '{}' on wildcard resource",
                self.statement, self.action
            ),
            FindingKind::SensitiveVerbOnWildcardResource => write!(
                f,
                "statement {}: sensitive action '{}' on wildcard resource",
                self.statement, self.action
            ),
        }
    }
}

/// Builder for [`PolicyStatement`]
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<String>,
    conditions: ConditionMap,
}

impl StatementBuilder {
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
            conditions: ConditionMap::new(),
        }
    }

    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        let action = action.into();
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    pub fn actions<I, S>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        actions.into_iter().fold(self, |b, a| b.action(a))
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn resources<I, S>(self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        resources.into_iter().fold(self, |b, r| b.resource(r))
    }

    /// Add `operator: { key: value }` to the condition block
    pub fn condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.conditions
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Build, linting against the default allow-list
    pub fn build(self) -> Result<PolicyStatement, ConfigurationError> {
        self.build_checked(&ActionAllowList::default())
    }

    /// Build, linting against the given allow-list. Findings are logged, not fatal.
    pub fn build_checked(
        self,
        allow_list: &ActionAllowList,
    ) -> Result<PolicyStatement, ConfigurationError> {
        let label = self
            .sid
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string());
        let invalid = |reason: &str| ConfigurationError::InvalidStatement {
            statement: label.clone(),
            reason: reason.to_string(),
        };

        if self.actions.is_empty() {
            return Err(invalid("action set must not be empty"));
        }
        if self.resources.is_empty() {
            return Err(invalid("resource set must not be empty"));
        }
        for action in &self.actions {
            if action != "*" && !action.contains(':') {
                return Err(invalid(&format!(
                    "action '{}' must have the form service:Action",
                    action
                )));
            }
        }
        if self.resources.iter().any(|r| r.trim().is_empty()) {
            return Err(invalid("resources must not be blank"));
        }
        if let Some(sid) = &self.sid {
            if sid.is_empty() || !sid.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid("sid must be non-empty and alphanumeric"));
            }
        }

        let statement = PolicyStatement {
            sid: self.sid,
            effect: self.effect,
            actions: self.actions,
            resources: self.resources,
            conditions: if self.conditions.is_empty() {
                None
            } else {
                Some(self.conditions)
            },
        };

        for finding in statement.lint(allow_list) {
            warn!(
                statement = %finding.statement,
                action = %finding.action,
                "Policy statement flagged: {}", finding
            );
        }

        Ok(statement)
    }
}
