//! End-to-end tests for the Docker backend against a stub engine CLI.
//!
//! A shell script stands in for the `docker` binary so the full
//! create/start/stop/inspect/list/remove command construction and output
//! parsing run without a daemon. `job-1` is a finished workload, `job-2`
//! a running one; everything else is unknown.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;

use dms_agent::config::DockerConfig;
use dms_agent::docker::DockerClient;
use dms_agent::runner::docker::DockerRunner;
use dms_agent::runner::{JobConfig, JobStatusCode, Runner};
use dms_agent::watchdog::{Cleaner, DockerCleaner};
use dms_agent::AgentError;

const STUB_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  version) echo "24.0.7" ;;
  create) echo "f00dcafe" ;;
  start|pause|unpause|pull|rmi|rm) : ;;
  stop)
    name="$4"
    case "$name" in
      DMS_ghost)
        echo "Error response from daemon: No such container: $name" >&2
        exit 1
        ;;
      *) : ;;
    esac
    ;;
  ps) printf 'DMS_worker1\nother_service\n/DMS_worker2\n' ;;
  inspect)
    name="$4"
    case "$name" in
      DMS_job-1) cat <<'EOF'
[{"State":{"Status":"exited","Running":false,"Paused":false,"Restarting":false,"ExitCode":0,"Error":"","StartedAt":"2024-03-01T10:00:00Z","FinishedAt":"2024-03-01T10:00:05Z"}}]
EOF
        ;;
      DMS_job-2) cat <<'EOF'
[{"State":{"Status":"running","Running":true,"Paused":false,"Restarting":false,"ExitCode":0,"Error":"","StartedAt":"2024-03-01T10:00:00Z","FinishedAt":"0001-01-01T00:00:00Z"}}]
EOF
        ;;
      *)
        echo "Error: No such container: $name" >&2
        exit 1
        ;;
    esac
    ;;
  *)
    echo "unknown command: $1" >&2
    exit 1
    ;;
esac
"#;

static STUB: OnceLock<PathBuf> = OnceLock::new();

fn stub_client() -> DockerClient {
    let path = STUB.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("dms-agent-stub-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docker");
        std::fs::write(&path, STUB_SCRIPT).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    });
    DockerClient::with_binary(path.to_string_lossy())
}

fn stub_runner() -> DockerRunner {
    DockerRunner::with_client(stub_client(), DockerConfig::default())
}

#[tokio::test]
async fn health_check_reaches_the_engine() {
    stub_runner().health_check().await.unwrap();
}

#[tokio::test]
async fn start_reports_running() {
    let mut config = JobConfig::new("job-2", "alpine:latest");
    config.command = vec!["sleep".to_string(), "60".to_string()];

    let status = stub_runner().start(config).await.unwrap();
    assert_eq!(status.status, JobStatusCode::Running);
    assert_eq!(status.id, "job-2");
}

#[tokio::test]
async fn status_of_running_workload_is_non_terminal() {
    let status = stub_runner().status("job-2").await.unwrap();
    assert_eq!(status.status, JobStatusCode::Running);
    assert!(status.exit_code.is_none());
    assert!(status.start_time.is_some());
    assert!(status.completion_time.is_none());
}

#[tokio::test]
async fn status_of_finished_workload_is_completed() {
    let status = stub_runner().status("job-1").await.unwrap();
    assert_eq!(status.status, JobStatusCode::Completed);
    assert_eq!(status.exit_code, Some(0));
    let start = status.start_time.unwrap();
    let done = status.completion_time.unwrap();
    assert!(done > start);
}

#[tokio::test]
async fn stop_succeeds_and_unknown_id_is_not_found() {
    let runner = stub_runner();
    runner.stop("job-1").await.unwrap();

    let err = runner.stop("ghost").await.unwrap_err();
    // Engine errors name the container; callers get their job ID back.
    assert!(matches!(err, AgentError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn status_of_unknown_id_is_not_found() {
    let err = stub_runner().status("ghost").await.unwrap_err();
    assert!(matches!(err, AgentError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn image_lifecycle_operations_round_trip() {
    let client = stub_client();
    client.pull_image("alpine:latest").await.unwrap();
    client.remove_image("alpine:latest").await.unwrap();
}

#[tokio::test]
async fn cleaner_removes_only_owned_containers() {
    let cleaner = DockerCleaner::new(stub_client(), "DMS_");
    let report = cleaner.cleanup().await.unwrap();
    // DMS_worker1 and /DMS_worker2 match; other_service is untouched.
    assert_eq!(report.matched, 2);
    assert_eq!(report.removed, 2);
    assert_eq!(report.failed, 0);
}
