//! Tests for SystemCollaborators against fake tool scripts
//!
//! The runtime and compose tool are shell scripts in a temp directory that
//! log their argv. `chown` is the real one, applied with the current uid:gid
//! so no privilege is needed.

mod common;

use std::fs;
use std::path::Path;

use common::FakeTools;
use stackrefresh::{
    Collaborators, DeploymentRefresher, OwnerSpec, RefreshConfig, RefreshError, RefreshPlan,
    StepKind, SystemCollaborators,
};

fn config_for(tools: &FakeTools, workdir: &Path) -> RefreshConfig {
    RefreshConfig {
        image: "img:latest".to_string(),
        data_dir: workdir.join("data"),
        owner: OwnerSpec::current(),
        compose_file: workdir.join("docker-compose.yml"),
        runtime: tools.path().join("docker").display().to_string(),
        compose_command: vec![tools.path().join("compose").display().to_string()],
        escalate: vec![],
        step_timeout_secs: Some(30),
    }
}

#[test]
fn test_full_refresh_invokes_tools_in_order() {
    let tools = FakeTools::new();
    tools.install("docker", "exit 0");
    tools.install("compose", "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = config_for(&tools, work.path());

    let collaborators = SystemCollaborators::from_config(&config, false);
    DeploymentRefresher::new(collaborators)
        .run(&RefreshPlan::default_plan(&config))
        .expect("refresh should succeed");

    let compose_file = config.compose_file.display().to_string();
    assert_eq!(
        tools.calls(),
        vec![
            "docker pull img:latest".to_string(),
            format!("compose -f {} down", compose_file),
            format!("compose -f {} up -d", compose_file),
        ]
    );
    assert!(config.data_dir.is_dir());
}

#[test]
fn test_pull_failure_leaves_filesystem_untouched() {
    let tools = FakeTools::new();
    tools.install("docker", "echo 'Error response from daemon: manifest unknown' >&2; exit 1");
    tools.install("compose", "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = config_for(&tools, work.path());

    let err = DeploymentRefresher::new(SystemCollaborators::from_config(&config, false))
        .run(&RefreshPlan::default_plan(&config))
        .unwrap_err();

    match err {
        RefreshError::StepFailed { kind, detail } => {
            assert_eq!(kind, StepKind::PullImage);
            assert!(detail.contains("manifest unknown"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.data_dir.exists());
    assert_eq!(tools.calls().len(), 1);
}

#[test]
fn test_stop_on_stopped_stack_succeeds() {
    let tools = FakeTools::new();
    // compose down prints nothing and exits 0 when no containers exist
    tools.install("compose", "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = config_for(&tools, work.path());

    let mut c = SystemCollaborators::from_config(&config, false);
    assert!(c.stop_stack(&config.compose_file).is_ok());
    assert!(c.stop_stack(&config.compose_file).is_ok());
}

#[test]
fn test_existing_data_dir_is_preserved() {
    let tools = FakeTools::new();
    tools.install("docker", "exit 0");
    tools.install("compose", "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = config_for(&tools, work.path());
    fs::create_dir_all(&config.data_dir).unwrap();
    fs::write(config.data_dir.join("db.sqlite"), "state").unwrap();

    DeploymentRefresher::new(SystemCollaborators::from_config(&config, false))
        .run(&RefreshPlan::default_plan(&config))
        .expect("refresh should succeed");

    assert_eq!(
        fs::read_to_string(config.data_dir.join("db.sqlite")).unwrap(),
        "state"
    );
}

#[test]
fn test_start_timeout_is_step_failure() {
    let tools = FakeTools::new();
    tools.install("docker", "exit 0");
    tools.install(
        "compose",
        "case \"$*\" in *' up -d') sleep 30 ;; esac\nexit 0",
    );
    let work = tempfile::tempdir().unwrap();
    let mut config = config_for(&tools, work.path());
    config.step_timeout_secs = Some(1);

    let err = DeploymentRefresher::new(SystemCollaborators::from_config(&config, false))
        .run(&RefreshPlan::default_plan(&config))
        .unwrap_err();

    assert_eq!(err.step_kind(), Some(StepKind::StartStack));
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("timed out after 1s"));
}

#[test]
fn test_dry_run_only_pulls() {
    let tools = FakeTools::new();
    tools.install("docker", "exit 0");
    tools.install("compose", "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = config_for(&tools, work.path());

    DeploymentRefresher::new(SystemCollaborators::from_config(&config, true))
        .run(&RefreshPlan::default_plan(&config))
        .expect("dry run should succeed");

    assert_eq!(tools.calls(), vec!["docker pull img:latest".to_string()]);
    assert!(!config.data_dir.exists());
}
