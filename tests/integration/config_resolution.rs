//! Layered configuration loading and deployment target resolution

use super::test_utils::{agent_workspace, with_env};
use agentstack::config::{ConfigLoader, DeploymentTarget, StackConfig, WORKSPACE_CONFIG_FILE};
use agentstack::error::{ConfigurationError, StackError};
use agentstack::stack::{self, ObservabilityMode, PolicyScope};
use tempfile::TempDir;

#[test]
fn test_defaults_without_files() {
    let workspace = TempDir::new().unwrap();
    let config = with_env(&[], || ConfigLoader::load(workspace.path()).unwrap());
    assert_eq!(config.stack.name, "StrandsAgentStack");
    assert_eq!(config.stack.agent_dir, std::path::PathBuf::from("agent"));
    assert_eq!(config.runtime.log_level, "INFO");
    assert_eq!(config.policy.scope, PolicyScope::Standard);
    assert_eq!(config.policy.observability, ObservabilityMode::Manual);
    assert!(config.validate().is_ok());
}

#[test]
fn test_file_layers_and_environment_precedence() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        r#"
[stack]
name = "BaseStack"
account = "111111111111"
region = "us-east-1"

[policy]
observability = "otel_env"
"#,
    )
    .unwrap();
    std::fs::create_dir_all(workspace.path().join("config")).unwrap();
    std::fs::write(
        workspace.path().join("config").join("production.toml"),
        "[stack]\nregion = \"eu-west-1\"\n",
    )
    .unwrap();

    let config = with_env(
        &[
            ("AGENTSTACK_ENV", "production"),
            ("AGENTSTACK_STACK__ACCOUNT", "222222222222"),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );
    assert_eq!(config.stack.name, "BaseStack");
    assert_eq!(config.stack.region.as_deref(), Some("eu-west-1"));
    assert_eq!(config.stack.account.as_deref(), Some("222222222222"));
    assert_eq!(config.policy.observability, ObservabilityMode::OtelEnv);
}

#[test]
fn test_global_file_is_lowest_file_layer() {
    let xdg = TempDir::new().unwrap();
    let global_dir = xdg.path().join("agentstack");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(
        global_dir.join("config.toml"),
        "[stack]\nname = \"GlobalStack\"\nmodel_id = \"anthropic.claude-3-haiku\"\n",
    )
    .unwrap();

    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        "[stack]\nname = \"WorkspaceStack\"\n",
    )
    .unwrap();

    let xdg_path = xdg.path().to_string_lossy().to_string();
    let config = with_env(&[("XDG_CONFIG_HOME", xdg_path.as_str())], || {
        ConfigLoader::load(workspace.path()).unwrap()
    });
    assert_eq!(config.stack.name, "WorkspaceStack");
    assert_eq!(
        config.stack.model_id.as_deref(),
        Some("anthropic.claude-3-haiku")
    );
}

#[test]
fn test_explicit_file_skips_workspace_file() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        "[stack]\nname = \"WorkspaceStack\"\n",
    )
    .unwrap();
    let explicit = workspace.path().join("other.toml");
    std::fs::write(&explicit, "[stack]\nname = \"ExplicitStack\"\n").unwrap();

    let config = with_env(&[], || ConfigLoader::load_from_file(&explicit).unwrap());
    assert_eq!(config.stack.name, "ExplicitStack");

    let missing = workspace.path().join("missing.toml");
    let err = with_env(&[], || ConfigLoader::load_from_file(&missing).unwrap_err());
    assert!(matches!(err, ConfigurationError::Source(_)));
}

#[test]
fn test_target_falls_back_through_environment_chain() {
    let config = StackConfig::default();
    let target = with_env(
        &[
            ("CDK_DEFAULT_ACCOUNT", "123456789012"),
            ("AWS_DEFAULT_REGION", "ap-southeast-2"),
        ],
        || DeploymentTarget::resolve(&config.stack).unwrap(),
    );
    assert_eq!(target.account(), "123456789012");
    assert_eq!(target.region(), "ap-southeast-2");

    // CDK variables win over AWS ones
    let target = with_env(
        &[
            ("CDK_DEFAULT_ACCOUNT", "123456789012"),
            ("CDK_DEFAULT_REGION", "us-west-2"),
            ("AWS_DEFAULT_REGION", "ap-southeast-2"),
        ],
        || DeploymentTarget::resolve(&config.stack).unwrap(),
    );
    assert_eq!(target.region(), "us-west-2");
}

#[test]
fn test_missing_target_is_fatal() {
    let config = StackConfig::default();
    let err = with_env(&[], || DeploymentTarget::resolve(&config.stack).unwrap_err());
    match &err {
        ConfigurationError::MissingDeploymentTarget { missing } => {
            assert_eq!(missing, "account and region")
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("aws configure"));

    let err = with_env(&[("CDK_DEFAULT_REGION", "us-west-2")], || {
        DeploymentTarget::resolve(&config.stack).unwrap_err()
    });
    assert!(matches!(
        err,
        ConfigurationError::MissingDeploymentTarget { ref missing } if missing == "account"
    ));
}

#[test]
fn test_assemble_rejects_invalid_configuration() {
    let workspace = agent_workspace();
    let target = DeploymentTarget::new("123456789012", "us-west-2").unwrap();

    let mut config = StackConfig::default();
    config.policy.scope = PolicyScope::ModelScoped;
    let err = stack::assemble(&config, &target, workspace.path()).unwrap_err();
    assert!(matches!(
        err,
        StackError::Configuration(ConfigurationError::MissingModelId)
    ));

    config.stack.model_id = Some("anthropic.claude-3-haiku".to_string());
    config.stack.name = "1Stack".to_string();
    config.runtime.log_level = "LOUD".to_string();
    let err = stack::assemble(&config, &target, workspace.path()).unwrap_err();
    match err {
        StackError::Configuration(ConfigurationError::Invalid(message)) => {
            assert!(message.contains("1Stack"));
            assert!(message.contains("LOUD"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_assemble_resolves_agent_dir_against_workspace() {
    let workspace = agent_workspace();
    let target = DeploymentTarget::new("123456789012", "us-west-2").unwrap();
    let stack = stack::assemble(&StackConfig::default(), &target, workspace.path()).unwrap();
    assert_eq!(stack.runtime().name(), "StrandsAgentStack_StrandsAgent");
    assert_eq!(stack.runtime().artifact().file_count(), 3);

    let mut config = StackConfig::default();
    config.stack.agent_dir = "missing".into();
    let err = stack::assemble(&config, &target, workspace.path()).unwrap_err();
    assert!(matches!(err, StackError::Artifact(_)));
}
