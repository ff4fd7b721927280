//! Property-based tests for determinism guarantees

use agentstack::artifact::{ArtifactOptions, ContainerArtifact};
use agentstack::iam::{PolicyStatement, RoleAssembler, StatementGroup, AGENTCORE_SERVICE_PRINCIPAL};
use agentstack::runtime::{derive_runtime_name, DEFAULT_NAME_SUFFIX, MAX_RUNTIME_NAME_LEN};
use agentstack::types::LogicalId;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tempfile::TempDir;

#[test]
fn test_runtime_name_examples() {
    assert_eq!(
        derive_runtime_name("Test-Stack", DEFAULT_NAME_SUFFIX).unwrap(),
        "Test_Stack_StrandsAgent"
    );
    assert_eq!(
        derive_runtime_name("TestStrandsAgentStack", DEFAULT_NAME_SUFFIX).unwrap(),
        "TestStrandsAgentStack_StrandsAgent"
    );
    assert_eq!(
        derive_runtime_name("Test_Stack_StrandsAgent", DEFAULT_NAME_SUFFIX).unwrap(),
        "Test_Stack_StrandsAgent"
    );
}

proptest! {
    /// Derived names use the runtime charset, carry the suffix and are stable
    /// under re-derivation
    #[test]
    fn prop_runtime_name_idempotent(stack_id in "[A-Za-z][A-Za-z0-9 ._-]{0,24}") {
        let name = derive_runtime_name(&stack_id, DEFAULT_NAME_SUFFIX).unwrap();
        prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        prop_assert!(name.ends_with("_StrandsAgent"));
        prop_assert!(!name.contains("__"));
        prop_assert!(name.len() <= MAX_RUNTIME_NAME_LEN);
        prop_assert_eq!(derive_runtime_name(&name, DEFAULT_NAME_SUFFIX).unwrap(), name);
    }

    #[test]
    fn prop_runtime_name_requires_leading_letter(stack_id in "[0-9_ .-][A-Za-z0-9]{0,10}") {
        prop_assert!(derive_runtime_name(&stack_id, DEFAULT_NAME_SUFFIX).is_err());
    }

    /// Logical ids keep the readable path and append eight uppercase hex characters
    #[test]
    fn prop_logical_id_shape(
        stack in "[A-Za-z][A-Za-z0-9-]{0,15}",
        component in "[A-Za-z][A-Za-z0-9]{0,15}",
    ) {
        let id = LogicalId::for_path(&stack, &[&component]);
        prop_assert_eq!(&id, &LogicalId::for_path(&stack, &[&component]));
        let (readable, digest) = id.as_str().split_at(component.len());
        prop_assert_eq!(readable, component.as_str());
        prop_assert_eq!(digest.len(), 8);
        prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    /// Groups survive role assembly unchanged and in order, under a single trust principal
    #[test]
    fn prop_role_groups_round_trip(
        groups in prop::collection::btree_map(
            "[A-Z][A-Za-z]{2,10}",
            prop::collection::vec(("[a-z]{2,8}", "[A-Z][A-Za-z]{2,10}", "[a-z]{3,10}"), 1..4),
            1..4,
        )
    ) {
        let groups: Vec<StatementGroup> = groups
            .into_iter()
            .map(|(name, specs)| {
                let statements = specs
                    .into_iter()
                    .map(|(service, verb, bucket)| {
                        PolicyStatement::allow()
                            .action(format!("{}:{}", service, verb))
                            .resource(format!("arn:aws:s3:::{}", bucket))
                            .build()
                            .unwrap()
                    })
                    .collect();
                StatementGroup::new(name, statements)
            })
            .collect();

        let role = RoleAssembler::new("PropStack", "AgentCoreRole", AGENTCORE_SERVICE_PRINCIPAL)
            .groups(groups.clone())
            .assemble()
            .unwrap();
        prop_assert_eq!(role.groups(), groups);
        prop_assert_eq!(role.trust_principal(), AGENTCORE_SERVICE_PRINCIPAL);
        let trust = role.assume_role_policy_value();
        prop_assert_eq!(trust["Statement"].as_array().unwrap().len(), 1);
    }

    /// Duplicate group names are always rejected
    #[test]
    fn prop_duplicate_group_rejected(name in "[A-Z][A-Za-z]{2,10}") {
        let statement = PolicyStatement::allow()
            .action("s3:GetObject")
            .resource("arn:aws:s3:::bucket/*")
            .build()
            .unwrap();
        let result = RoleAssembler::new("PropStack", "AgentCoreRole", AGENTCORE_SERVICE_PRINCIPAL)
            .group(name.clone(), vec![statement.clone()])
            .group(name, vec![statement])
            .assemble();
        prop_assert!(result.is_err());
    }
}

/// Asset hashes depend on the build context contents, not on where or in
/// which order the files were written
#[test]
fn test_asset_hash_independent_of_location_and_write_order() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(16));
    let files = prop::collection::btree_map(
        "[a-z]{1,8}\\.py",
        prop::collection::vec(any::<u8>(), 0..64),
        1..6,
    );

    runner
        .run(&files, |files: BTreeMap<String, Vec<u8>>| {
            let first = TempDir::new().unwrap();
            let second = TempDir::new().unwrap();
            std::fs::write(first.path().join("Dockerfile"), "FROM scratch\n").unwrap();
            for (name, content) in &files {
                std::fs::write(first.path().join(name), content).unwrap();
            }
            for (name, content) in files.iter().rev() {
                std::fs::write(second.path().join(name), content).unwrap();
            }
            std::fs::write(second.path().join("Dockerfile"), "FROM scratch\n").unwrap();

            let options = ArtifactOptions::default();
            let a = ContainerArtifact::from_asset(first.path(), &options).unwrap();
            let b = ContainerArtifact::from_asset(second.path(), &options).unwrap();
            assert_eq!(a.asset_hash(), b.asset_hash());
            assert_eq!(a.file_count(), files.len() + 1);

            // Distinct names keep distinct leaves
            let names: BTreeSet<&String> = files.keys().collect();
            assert_eq!(names.len(), files.len());
            Ok(())
        })
        .unwrap();
}
