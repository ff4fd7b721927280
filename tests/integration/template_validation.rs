//! Template validation against synthesized and hand-modified templates

use super::test_utils::{agent_workspace, synthesize_default, TEST_ACCOUNT};
use agentstack::error::{StackError, ValidationError};
use agentstack::iam::ActionAllowList;
use agentstack::synthesis::Template;
use agentstack::types::{AGENT_RUNTIME_TYPE, IAM_ROLE_TYPE};
use agentstack::validate::{validate_stack, TemplateExpectations, TemplateValidator};
use serde_json::{json, Value};

/// Copy of `template` with `edit` applied to its body
fn mutate<F>(template: &Template, edit: F) -> Template
where
    F: FnOnce(&mut Value),
{
    let mut body = template.as_value().clone();
    edit(&mut body);
    Template::from_value(template.stack_name(), body).unwrap()
}

fn logical_id(template: &Template, resource_type: &str) -> String {
    template.resources_of_type(resource_type)[0].0.to_string()
}

/// Append a statement to the role's inline policy
fn with_inline_statement(template: &Template, statement: Value) -> Template {
    let role_id = logical_id(template, IAM_ROLE_TYPE);
    mutate(template, |body| {
        body["Resources"][&role_id]["Properties"]["Policies"][0]["PolicyDocument"]["Statement"]
            .as_array_mut()
            .unwrap()
            .push(statement);
    })
}

fn validator() -> TemplateValidator {
    TemplateValidator::new(TemplateExpectations {
        account: Some(TEST_ACCOUNT.to_string()),
        ..TemplateExpectations::default()
    })
}

fn privilege_details(errors: &[ValidationError]) -> Vec<String> {
    errors
        .iter()
        .filter_map(|e| match e {
            ValidationError::PrivilegeViolation { detail, .. } => Some(detail.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_fresh_synthesis_passes() {
    let workspace = agent_workspace();
    let (stack, template) = synthesize_default(&workspace);
    let report = validate_stack(&stack, &template);
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors());
    assert_eq!(report.resources_checked, 3);
    // Four inline statements plus the two pull statements
    assert_eq!(report.statements_checked, 6);

    assert!(validator().validate(&template).is_ok());
}

#[test]
fn test_wildcard_action_on_wildcard_resource() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let broken = with_inline_statement(
        &template,
        json!({ "Sid": "Broad", "Effect": "Allow", "Action": "s3:*", "Resource": "*" }),
    );
    let report = validator().validate(&broken);
    let details = privilege_details(report.errors());
    assert_eq!(details, vec!["wildcard action 's3:*' on wildcard resource".to_string()]);
    assert!(matches!(
        &report.errors()[0],
        ValidationError::PrivilegeViolation { statement, .. } if statement == "Broad"
    ));
}

#[test]
fn test_unlisted_action_on_wildcard_only_statement() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let broken = with_inline_statement(
        &template,
        json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "xray:PutTraceSegments"],
            "Resource": "*",
        }),
    );
    let details = privilege_details(validator().validate(&broken).errors());
    assert_eq!(details.len(), 1);
    assert!(details[0].contains("s3:GetObject"));
}

#[test]
fn test_mixed_statement_needs_an_allow_listed_action() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let broken = with_inline_statement(
        &template,
        json!({
            "Sid": "Mixed",
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:PutObject"],
            "Resource": ["arn:aws:s3:::agent-bucket/*", "*"],
        }),
    );
    let details = privilege_details(validator().validate(&broken).errors());
    assert_eq!(details.len(), 2, "every unlisted action is reported: {:?}", details);

    // One allow-listed action justifies the wildcard
    let justified = with_inline_statement(
        &template,
        json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "ecr:GetAuthorizationToken"],
            "Resource": ["arn:aws:s3:::agent-bucket/*", "*"],
        }),
    );
    assert!(validator().validate(&justified).is_ok());

    // but never sensitive verbs
    let sensitive = with_inline_statement(
        &template,
        json!({
            "Effect": "Allow",
            "Action": ["s3:PutObject", "ecr:GetAuthorizationToken"],
            "Resource": ["arn:aws:s3:::agent-bucket/*", "*"],
        }),
    );
    let details = privilege_details(validator().validate(&sensitive).errors());
    assert_eq!(details.len(), 1);
    assert!(details[0].contains("s3:PutObject"));
}

#[test]
fn test_deny_statements_are_exempt() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let template = with_inline_statement(
        &template,
        json!({ "Effect": "Deny", "Action": "*", "Resource": "*" }),
    );
    assert!(validator().validate(&template).is_ok());
}

#[test]
fn test_foreign_account_is_reported() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let broken = with_inline_statement(
        &template,
        json!({
            "Effect": "Allow",
            "Action": "logs:PutLogEvents",
            "Resource": "arn:aws:logs:us-west-2:999999999999:log-group:other:*",
        }),
    );
    let details = privilege_details(validator().validate(&broken).errors());
    assert_eq!(details.len(), 1);
    assert!(details[0].contains("999999999999"));

    // Without an expected account the same template passes
    assert!(TemplateValidator::default().validate(&broken).is_ok());
}

#[test]
fn test_extended_allow_list() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let template = with_inline_statement(
        &template,
        json!({ "Effect": "Allow", "Action": "s3:ListAllMyBuckets", "Resource": "*" }),
    );
    assert!(!validator().validate(&template).is_ok());

    let extended = TemplateValidator::new(TemplateExpectations {
        allow_list: ActionAllowList::with_extra(["s3:ListAllMyBuckets"]),
        ..TemplateExpectations::default()
    });
    assert!(extended.validate(&template).is_ok());
}

#[test]
fn test_every_error_is_collected() {
    let workspace = agent_workspace();
    let (stack, template) = synthesize_default(&workspace);
    let role_id = logical_id(&template, IAM_ROLE_TYPE);
    let runtime_id = logical_id(&template, AGENT_RUNTIME_TYPE);
    let broken = mutate(&template, |body| {
        let runtime = &mut body["Resources"][&runtime_id]["Properties"];
        runtime["AgentRuntimeName"] = json!("Renamed");
        runtime["EnvironmentVariables"]
            .as_object_mut()
            .unwrap()
            .remove("LOG_LEVEL");
        body["Resources"][&role_id]["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]
            ["Principal"]["Service"] = json!("lambda.amazonaws.com");
        body["Outputs"].as_object_mut().unwrap().remove("RuntimeArn");
    });

    let report = validate_stack(&stack, &broken);
    let paths: Vec<String> = report
        .errors()
        .iter()
        .filter_map(|e| match e {
            ValidationError::PropertyMismatch { logical_id, path, .. } => {
                Some(format!("{}:{}", logical_id, path))
            }
            _ => None,
        })
        .collect();
    assert_eq!(report.errors().len(), 4, "{:?}", report.errors());
    assert!(paths.contains(&format!("{}:AgentRuntimeName", runtime_id)));
    assert!(paths.contains(&format!("{}:EnvironmentVariables.LOG_LEVEL", runtime_id)));
    assert!(paths.contains(&"Outputs.RuntimeArn:Value".to_string()));
    assert!(paths
        .iter()
        .any(|p| p.ends_with("AssumeRolePolicyDocument.Statement[0].Principal.Service")));

    match report.into_result() {
        Err(StackError::ValidationFailed(errors)) => assert_eq!(errors.len(), 4),
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_second_trust_statement_is_rejected() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let role_id = logical_id(&template, IAM_ROLE_TYPE);
    let broken = mutate(&template, |body| {
        body["Resources"][&role_id]["Properties"]["AssumeRolePolicyDocument"]["Statement"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": "ec2.amazonaws.com" },
            }));
    });
    let report = validator().validate(&broken);
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].category(), "property");
}

#[test]
fn test_naming_and_count_rules() {
    let workspace = agent_workspace();
    let (_, template) = synthesize_default(&workspace);
    let role_id = logical_id(&template, IAM_ROLE_TYPE);
    let renamed = mutate(&template, |body| {
        let resources = body["Resources"].as_object_mut().unwrap();
        let role = resources.remove(&role_id).unwrap();
        resources.insert("ExecutionRole".to_string(), role.clone());
        resources.insert("ExtraRole".to_string(), role);
    });
    let report = TemplateValidator::default().validate(&renamed);
    let counts = report.counts_by_category();
    assert_eq!(counts.get("count"), Some(&1));
    assert_eq!(counts.get("naming"), Some(&2));
    // The runtime still points at the old role id
    assert!(report
        .errors()
        .iter()
        .any(|e| matches!(e, ValidationError::PropertyMismatch { path, .. } if path == "RoleArn")));
}

#[test]
fn test_load_rejects_documents_without_resources() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("Empty.template.json");
    std::fs::write(&path, "{\"Outputs\": {}}").unwrap();
    assert!(matches!(
        Template::load(&path),
        Err(StackError::InvalidTemplate(_))
    ));
}
