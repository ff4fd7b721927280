//! Property-based tests for the unscoped action rules

use agentstack::iam::actions::{is_sensitive_action, DEFAULT_UNSCOPED_ACTIONS};
use agentstack::iam::ActionAllowList;
use agentstack::synthesis::Template;
use agentstack::validate::{TemplateExpectations, TemplateValidator};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

/// Validator that only checks privileges
fn privilege_validator() -> TemplateValidator {
    TemplateValidator::new(TemplateExpectations {
        resource_counts: BTreeMap::new(),
        trust_principal: None,
        naming: Vec::new(),
        ..TemplateExpectations::default()
    })
}

fn policy_template(actions: &[String], resources: &[&str]) -> Template {
    Template::from_value(
        "PropStack",
        json!({
            "Resources": {
                "ExtraPolicy": {
                    "Type": "AWS::IAM::Policy",
                    "Properties": {
                        "PolicyName": "ExtraPolicy",
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Action": actions,
                                "Resource": resources,
                            }],
                        },
                    },
                },
            },
        }),
    )
    .unwrap()
}

/// Scoped actions that are never on the default allow-list
fn scoped_action() -> impl Strategy<Value = String> {
    ("s3|dynamodb|sqs", "(Get|Put|Delete|List)[A-Z][a-z]{2,8}")
        .prop_map(|(service, verb)| format!("{}:{}", service, verb))
}

fn listed_action() -> impl Strategy<Value = String> {
    prop::sample::select(DEFAULT_UNSCOPED_ACTIONS).prop_map(str::to_string)
}

proptest! {
    /// On a `*`-only statement every unlisted action is a violation, and listed
    /// ones never are
    #[test]
    fn prop_wildcard_only_statement(
        unlisted in prop::collection::btree_set(scoped_action(), 0..4),
        listed in prop::collection::btree_set(listed_action(), 0..4),
    ) {
        prop_assume!(!unlisted.is_empty() || !listed.is_empty());
        let actions: Vec<String> = unlisted.iter().chain(listed.iter()).cloned().collect();
        let report = privilege_validator().validate(&policy_template(&actions, &["*"]));
        prop_assert_eq!(report.errors().len(), unlisted.len());
        prop_assert_eq!(report.statements_checked, 1);
    }

    /// A statement mixing a scoped ARN with `*` passes once any action is listed,
    /// except for unlisted sensitive verbs which always fail
    #[test]
    fn prop_mixed_statement(
        unlisted in prop::collection::btree_set(scoped_action(), 1..4),
        listed in prop::option::of(listed_action()),
    ) {
        let mut actions: Vec<String> = unlisted.iter().cloned().collect();
        if let Some(action) = &listed {
            actions.push(action.clone());
        }
        let template = policy_template(&actions, &["arn:aws:s3:::agent-bucket/*", "*"]);
        let report = privilege_validator().validate(&template);
        let expected = if listed.is_some() {
            unlisted.iter().filter(|a| is_sensitive_action(a)).count()
        } else {
            unlisted.len()
        };
        prop_assert_eq!(report.errors().len(), expected);
    }

    /// Scoped resources alone never produce wildcard findings
    #[test]
    fn prop_scoped_resources_pass(actions in prop::collection::vec(scoped_action(), 1..4)) {
        let template = policy_template(&actions, &["arn:aws:s3:::agent-bucket/*"]);
        prop_assert!(privilege_validator().validate(&template).is_ok());
    }

    /// Extending the allow-list admits exactly the added actions
    #[test]
    fn prop_extended_allow_list(action in scoped_action()) {
        let template = policy_template(&[action.clone()], &["*"]);
        prop_assert!(!privilege_validator().validate(&template).is_ok());

        let validator = TemplateValidator::new(TemplateExpectations {
            resource_counts: BTreeMap::new(),
            trust_principal: None,
            naming: Vec::new(),
            allow_list: ActionAllowList::with_extra([action]),
            ..TemplateExpectations::default()
        });
        prop_assert!(validator.validate(&template).is_ok());
    }
}
