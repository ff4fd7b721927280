//! Template Validation
//!
//! A stateless pass over a synthesized template. Every check runs and every
//! deviation is collected into a [`ValidationReport`]; nothing short-circuits.

use crate::error::{StackError, ValidationError};
use crate::iam::actions::{
    arn_account, is_sensitive_action, is_wildcard_action, is_wildcard_resource,
};
use crate::iam::{ActionAllowList, AGENTCORE_SERVICE_PRINCIPAL};
use crate::runtime::RUNTIME_CONSTRUCT_ID;
use crate::stack::{AgentStack, ROLE_CONSTRUCT_ID};
use crate::synthesis::{Template, OUTPUT_RUNTIME_ARN, OUTPUT_RUNTIME_ID};
use crate::types::{AGENT_RUNTIME_TYPE, IAM_POLICY_TYPE, IAM_ROLE_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A resource type whose logical ids must contain a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRule {
    pub resource_type: String,
    pub fragment: String,
}

impl NamingRule {
    pub fn new(resource_type: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            fragment: fragment.into(),
        }
    }
}

/// What a template is checked against
#[derive(Debug, Clone)]
pub struct TemplateExpectations {
    /// Exact resource count per type
    pub resource_counts: BTreeMap<String, usize>,
    pub allow_list: ActionAllowList,
    /// Account every scoped ARN must name
    pub account: Option<String>,
    pub trust_principal: Option<String>,
    pub runtime_name: Option<String>,
    /// Variables that must be present with these values
    pub environment: BTreeMap<String, String>,
    pub naming: Vec<NamingRule>,
}

impl Default for TemplateExpectations {
    fn default() -> Self {
        let resource_counts = [IAM_ROLE_TYPE, IAM_POLICY_TYPE, AGENT_RUNTIME_TYPE]
            .iter()
            .map(|t| (t.to_string(), 1))
            .collect();
        Self {
            resource_counts,
            allow_list: ActionAllowList::default(),
            account: None,
            trust_principal: Some(AGENTCORE_SERVICE_PRINCIPAL.to_string()),
            runtime_name: None,
            environment: BTreeMap::new(),
            naming: vec![
                NamingRule::new(IAM_ROLE_TYPE, ROLE_CONSTRUCT_ID),
                NamingRule::new(AGENT_RUNTIME_TYPE, RUNTIME_CONSTRUCT_ID),
            ],
        }
    }
}

impl TemplateExpectations {
    /// Standard expectations plus everything the stack itself declares
    pub fn for_stack(stack: &AgentStack) -> Self {
        Self {
            allow_list: stack.allow_list().clone(),
            account: Some(stack.target().account().to_string()),
            trust_principal: Some(stack.role().trust_principal().to_string()),
            runtime_name: Some(stack.runtime().name().to_string()),
            environment: stack.runtime().environment().clone(),
            ..Self::default()
        }
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub resources_checked: usize,
    pub statements_checked: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Error counts per category, sorted by category name
    pub fn counts_by_category(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            *counts.entry(error.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_result(self) -> Result<(), StackError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(StackError::ValidationFailed(self.errors))
        }
    }
}

/// Checks templates against a fixed set of expectations
#[derive(Debug, Clone, Default)]
pub struct TemplateValidator {
    expectations: TemplateExpectations,
}

impl TemplateValidator {
    pub fn new(expectations: TemplateExpectations) -> Self {
        Self { expectations }
    }

    pub fn expectations(&self) -> &TemplateExpectations {
        &self.expectations
    }

    pub fn validate(&self, template: &Template) -> ValidationReport {
        let mut report = ValidationReport {
            resources_checked: template.resources().map(|r| r.len()).unwrap_or(0),
            ..ValidationReport::default()
        };

        self.check_counts(template, &mut report);
        self.check_naming(template, &mut report);
        self.check_privileges(template, &mut report);
        self.check_roles(template, &mut report);
        self.check_runtimes(template, &mut report);
        self.check_outputs(template, &mut report);

        info!(
            stack = %template.stack_name(),
            resources = report.resources_checked,
            statements = report.statements_checked,
            errors = report.errors.len(),
            "Template validated"
        );
        report
    }

    fn check_counts(&self, template: &Template, report: &mut ValidationReport) {
        for (resource_type, expected) in &self.expectations.resource_counts {
            let actual = template.resources_of_type(resource_type).len();
            if actual != *expected {
                report.errors.push(ValidationError::CountMismatch {
                    resource_type: resource_type.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }
    }

    fn check_naming(&self, template: &Template, report: &mut ValidationReport) {
        for rule in &self.expectations.naming {
            for (logical_id, _) in template.resources_of_type(&rule.resource_type) {
                if !logical_id.contains(&rule.fragment) {
                    report.errors.push(ValidationError::NamingViolation {
                        resource_type: rule.resource_type.clone(),
                        logical_id: logical_id.to_string(),
                        expected_fragment: rule.fragment.clone(),
                    });
                }
            }
        }
    }

    fn check_privileges(&self, template: &Template, report: &mut ValidationReport) {
        for (logical_id, resource) in template.resources_of_type(IAM_ROLE_TYPE) {
            let policies = resource
                .pointer("/Properties/Policies")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for policy in policies {
                let name = policy
                    .get("PolicyName")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>");
                let scope = format!("{}/{}", logical_id, name);
                self.check_document(&scope, policy.get("PolicyDocument"), report);
            }
        }
        for (logical_id, resource) in template.resources_of_type(IAM_POLICY_TYPE) {
            self.check_document(
                logical_id,
                resource.pointer("/Properties/PolicyDocument"),
                report,
            );
        }
    }

    fn check_document(&self, scope: &str, document: Option<&Value>, report: &mut ValidationReport) {
        let statements: Vec<&Value> = match document.and_then(|d| d.get("Statement")) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            _ => Vec::new(),
        };
        for (index, statement) in statements.into_iter().enumerate() {
            report.statements_checked += 1;
            let label = statement
                .get("Sid")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));
            for detail in self.statement_violations(statement) {
                report.errors.push(ValidationError::PrivilegeViolation {
                    logical_id: scope.to_string(),
                    statement: label.clone(),
                    detail,
                });
            }
        }
    }

    /// Privilege findings for one Allow statement.
    ///
    /// A `*`-only statement may carry allow-listed actions only. A statement
    /// mixing scoped ARNs with `*` needs at least one allow-listed action for
    /// the wildcard to serve, and never carries unlisted sensitive verbs.
    /// `NotResource` counts as a wildcard resource; `NotAction` on a wildcard
    /// resource is always a violation.
    fn statement_violations(&self, statement: &Value) -> Vec<String> {
        if statement.get("Effect").and_then(Value::as_str) == Some("Deny") {
            return Vec::new();
        }
        let allow_list = &self.expectations.allow_list;
        let actions = string_values(statement.get("Action"));
        let resources: Vec<&Value> = match statement.get("Resource") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => Vec::new(),
        };
        let is_star = |r: &&Value| r.as_str().map(is_wildcard_resource).unwrap_or(false);
        let not_resource = statement.get("NotResource").is_some();
        let has_wildcard = not_resource || resources.iter().any(is_star);
        let only_wildcard = has_wildcard && resources.iter().all(is_star);

        let mut violations = Vec::new();
        if has_wildcard {
            if let Some(not_action) = statement.get("NotAction") {
                violations.push(format!(
                    "NotAction {} on wildcard resource allows every other action",
                    render(not_action)
                ));
            }
            for action in &actions {
                if is_wildcard_action(action) && !allow_list.contains(action) {
                    violations.push(format!("wildcard action '{}' on wildcard resource", action));
                }
            }
            let unlisted: Vec<&&str> = actions
                .iter()
                .filter(|a| !is_wildcard_action(a) && !allow_list.contains(a))
                .collect();
            if only_wildcard {
                for action in unlisted {
                    violations.push(format!(
                        "action '{}' is not on the unscoped allow-list but targets '*'",
                        action
                    ));
                }
            } else if !actions.iter().any(|a| allow_list.contains(a)) {
                for action in unlisted {
                    violations.push(format!(
                        "action '{}' reaches '*' but no action in the statement is allow-listed",
                        action
                    ));
                }
            } else {
                for action in unlisted.into_iter().filter(|a| is_sensitive_action(a)) {
                    violations.push(format!(
                        "sensitive action '{}' reaches '*' through a mixed resource list",
                        action
                    ));
                }
            }
        }

        if let Some(expected) = &self.expectations.account {
            for resource in resources.iter().filter_map(|r| r.as_str()) {
                if let Some(account) = arn_account(resource) {
                    if !account.is_empty() && account != "*" && account != expected {
                        violations.push(format!(
                            "resource '{}' names account {}, expected {}",
                            resource, account, expected
                        ));
                    }
                }
            }
        }
        violations
    }

    fn check_roles(&self, template: &Template, report: &mut ValidationReport) {
        let Some(expected) = &self.expectations.trust_principal else {
            return;
        };
        for (logical_id, resource) in template.resources_of_type(IAM_ROLE_TYPE) {
            let statements = resource
                .pointer("/Properties/AssumeRolePolicyDocument/Statement")
                .and_then(Value::as_array);
            match statements.map(Vec::as_slice) {
                Some([single]) => {
                    let principal = single.pointer("/Principal/Service");
                    if principal.and_then(Value::as_str) != Some(expected.as_str()) {
                        report.errors.push(ValidationError::PropertyMismatch {
                            logical_id: logical_id.to_string(),
                            path: "AssumeRolePolicyDocument.Statement[0].Principal.Service"
                                .to_string(),
                            expected: expected.clone(),
                            actual: principal.map(render),
                        });
                    }
                }
                other => report.errors.push(ValidationError::PropertyMismatch {
                    logical_id: logical_id.to_string(),
                    path: "AssumeRolePolicyDocument.Statement".to_string(),
                    expected: "exactly one trust statement".to_string(),
                    actual: other.map(|s| format!("{} statements", s.len())),
                }),
            }
        }
    }

    fn check_runtimes(&self, template: &Template, report: &mut ValidationReport) {
        let role_ids: Vec<&str> = template
            .resources_of_type(IAM_ROLE_TYPE)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        for (logical_id, resource) in template.resources_of_type(AGENT_RUNTIME_TYPE) {
            let mismatch = |path: &str, expected: String, actual: Option<&Value>| {
                ValidationError::PropertyMismatch {
                    logical_id: logical_id.to_string(),
                    path: path.to_string(),
                    expected,
                    actual: actual.map(render),
                }
            };
            let props = resource.get("Properties");
            let prop = |name: &str| props.and_then(|p| p.get(name));

            if let Some(expected) = &self.expectations.runtime_name {
                let actual = prop("AgentRuntimeName");
                if actual.and_then(Value::as_str) != Some(expected.as_str()) {
                    report
                        .errors
                        .push(mismatch("AgentRuntimeName", expected.clone(), actual));
                }
            }

            for (key, expected) in &self.expectations.environment {
                let actual = prop("EnvironmentVariables").and_then(|env| env.get(key));
                if actual.and_then(Value::as_str) != Some(expected.as_str()) {
                    report.errors.push(mismatch(
                        &format!("EnvironmentVariables.{}", key),
                        expected.clone(),
                        actual,
                    ));
                }
            }

            let container_uri = props.and_then(|p| {
                p.pointer("/AgentRuntimeArtifact/ContainerConfiguration/ContainerUri")
            });
            if container_uri.is_none() {
                report.errors.push(mismatch(
                    "AgentRuntimeArtifact.ContainerConfiguration.ContainerUri",
                    "a container image URI".to_string(),
                    None,
                ));
            }

            let role_arn = prop("RoleArn");
            let role_ref = role_arn
                .and_then(|v| v.get("Fn::GetAtt"))
                .and_then(Value::as_array)
                .and_then(|parts| match parts.as_slice() {
                    [Value::String(id), Value::String(attr)] if attr == "Arn" => Some(id.as_str()),
                    _ => None,
                })
                .filter(|id| role_ids.contains(id));
            match role_ref {
                Some(role_id) => {
                    let depends_on = string_values(resource.get("DependsOn"));
                    if !depends_on.contains(&role_id) {
                        report.errors.push(mismatch(
                            "DependsOn",
                            format!("a dependency on {}", role_id),
                            resource.get("DependsOn"),
                        ));
                    }
                }
                None => report.errors.push(mismatch(
                    "RoleArn",
                    "Fn::GetAtt of a role in this template".to_string(),
                    role_arn,
                )),
            }
        }
    }

    fn check_outputs(&self, template: &Template, report: &mut ValidationReport) {
        let runtimes = template.resources_of_type(AGENT_RUNTIME_TYPE);
        let [(runtime_id, _)] = runtimes.as_slice() else {
            // Count mismatches are reported separately
            return;
        };

        for (output, attribute) in [
            (OUTPUT_RUNTIME_ID, "AgentRuntimeId"),
            (OUTPUT_RUNTIME_ARN, "AgentRuntimeArn"),
        ] {
            let value = template
                .outputs()
                .and_then(|o| o.get(output))
                .and_then(|o| o.get("Value"));
            let points_at_runtime = value
                .and_then(|v| v.get("Fn::GetAtt"))
                .and_then(Value::as_array)
                .map(|parts| {
                    parts.len() == 2 && parts[0] == *runtime_id && parts[1] == attribute
                })
                .unwrap_or(false);
            if !points_at_runtime {
                debug!(output, "Output does not reference the runtime");
                report.errors.push(ValidationError::PropertyMismatch {
                    logical_id: format!("Outputs.{}", output),
                    path: "Value".to_string(),
                    expected: format!("Fn::GetAtt [{}, {}]", runtime_id, attribute),
                    actual: value.map(render),
                });
            }
        }
    }
}

/// Check a template against what the stack itself declares
pub fn validate_stack(stack: &AgentStack, template: &Template) -> ValidationReport {
    TemplateValidator::new(TemplateExpectations::for_stack(stack)).validate(template)
}

/// A string or an array of strings; anything else contributes nothing
fn string_values(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
