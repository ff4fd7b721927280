//! Content-addressed hashing of container build contexts

use super::test_utils::{test_target, write_agent};
use agentstack::artifact::{ArtifactOptions, ContainerArtifact, Platform};
use agentstack::error::ArtifactError;
use std::fs;
use tempfile::TempDir;

fn agent_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_agent(dir.path());
    dir
}

fn hash(dir: &TempDir, options: &ArtifactOptions) -> String {
    ContainerArtifact::from_asset(dir.path(), options)
        .unwrap()
        .asset_hash()
        .to_string()
}

#[test]
fn test_identical_trees_hash_identically() {
    let a = agent_dir();
    let b = agent_dir();
    let options = ArtifactOptions::default();
    assert_eq!(hash(&a, &options), hash(&b, &options));
}

#[test]
fn test_content_and_layout_changes_change_the_hash() {
    let dir = agent_dir();
    let options = ArtifactOptions::default();
    let original = hash(&dir, &options);

    fs::write(dir.path().join("agent.py"), "from strands import Agent, tool\n").unwrap();
    let edited = hash(&dir, &options);
    assert_ne!(original, edited);

    fs::create_dir_all(dir.path().join("tools")).unwrap();
    fs::rename(dir.path().join("agent.py"), dir.path().join("tools").join("agent.py")).unwrap();
    assert_ne!(edited, hash(&dir, &options));
}

#[test]
fn test_build_parameters_enter_the_hash() {
    let dir = agent_dir();
    let base = hash(&dir, &ArtifactOptions::default());

    let amd = ArtifactOptions {
        platform: Platform::LinuxAmd64,
        ..ArtifactOptions::default()
    };
    assert_ne!(base, hash(&dir, &amd));

    let other_env = ArtifactOptions {
        extra_hash: Some("210987654321-eu-west-1".to_string()),
        ..ArtifactOptions::default()
    };
    assert_ne!(base, hash(&dir, &other_env));

    fs::copy(dir.path().join("Dockerfile"), dir.path().join("Dockerfile.dev")).unwrap();
    let with_copy = hash(&dir, &ArtifactOptions::default());
    let dev_file = ArtifactOptions {
        build_file: "Dockerfile.dev".to_string(),
        ..ArtifactOptions::default()
    };
    assert_ne!(with_copy, hash(&dir, &dev_file));
}

#[test]
fn test_ignored_files_do_not_affect_the_hash() {
    let dir = agent_dir();
    fs::write(dir.path().join(".dockerignore"), "# local only\nnotes.md\n/scratch/\n").unwrap();
    let options = ArtifactOptions::default();
    let base = hash(&dir, &options);

    fs::write(dir.path().join("notes.md"), "todo\n").unwrap();
    fs::create_dir_all(dir.path().join("scratch")).unwrap();
    fs::write(dir.path().join("scratch").join("tmp.txt"), "x").unwrap();
    fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
    fs::write(dir.path().join("__pycache__").join("agent.cpython-312.pyc"), [0u8, 1, 2]).unwrap();

    let artifact = ContainerArtifact::from_asset(dir.path(), &options).unwrap();
    assert_eq!(artifact.asset_hash(), base);
    // Dockerfile, agent.py, requirements.txt, .dockerignore
    assert_eq!(artifact.file_count(), 4);
}

#[test]
fn test_missing_context_and_build_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        ContainerArtifact::from_asset(&missing, &ArtifactOptions::default()),
        Err(ArtifactError::MissingBuildContext(_))
    ));

    fs::write(dir.path().join("agent.py"), "print()\n").unwrap();
    assert!(matches!(
        ContainerArtifact::from_asset(dir.path(), &ArtifactOptions::default()),
        Err(ArtifactError::MissingBuildFile(_))
    ));
}

#[test]
fn test_repository_naming_and_pull_grant() {
    let dir = agent_dir();
    let artifact = ContainerArtifact::from_asset(dir.path(), &ArtifactOptions::default()).unwrap();
    let target = test_target();

    assert_eq!(
        artifact.repository_name(&target),
        "cdk-hnb659fds-container-assets-123456789012-us-west-2"
    );
    assert_eq!(
        artifact.image_uri(&target),
        format!(
            "123456789012.dkr.ecr.us-west-2.amazonaws.com/cdk-hnb659fds-container-assets-123456789012-us-west-2:{}",
            artifact.asset_hash()
        )
    );

    let grant = artifact.grant_pull(&target).unwrap();
    assert_eq!(grant.len(), 2);
    assert_eq!(grant[0].resources(), &[artifact.repository_arn(&target)]);
    assert_eq!(grant[1].actions(), &["ecr:GetAuthorizationToken".to_string()]);
    assert_eq!(grant[1].resources(), &["*".to_string()]);
}
