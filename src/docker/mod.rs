//! Thin client for a Docker-Engine-compatible container engine.
//!
//! Drives the engine through the `docker` CLI, which resolves the daemon
//! from `DOCKER_HOST` or the local socket on its own. Calls are synchronous
//! from the caller's view and carry no internal retry; engine errors are
//! surfaced verbatim, wrapped with the failing operation and workload ID.

use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::{AgentError, Result};

/// The engine's "never finished" timestamp.
pub const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Container state as reported by `docker inspect`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Running", default)]
    pub running: bool,
    #[serde(rename = "Paused", default)]
    pub paused: bool,
    #[serde(rename = "Restarting", default)]
    pub restarting: bool,
    #[serde(rename = "ExitCode", default)]
    pub exit_code: i64,
    #[serde(rename = "Error", default)]
    pub error: String,
    #[serde(rename = "StartedAt", default)]
    pub started_at: String,
    #[serde(rename = "FinishedAt", default)]
    pub finished_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerInspect {
    #[serde(rename = "State")]
    pub state: ContainerState,
}

/// Client handle for the container engine.
#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerClient {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Override the engine CLI binary (tests point this at a stub).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run one engine command, classifying failures into the agent's error
    /// taxonomy. Returns trimmed stdout on success.
    async fn exec(&self, operation: &'static str, id: &str, args: &[String]) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                AgentError::BackendUnavailable(format!("cannot invoke {}: {}", self.binary, e))
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_engine_error(operation, id, &stderr))
    }

    /// Verify engine reachability. Does not inspect individual containers.
    pub async fn ping(&self) -> Result<()> {
        self.exec(
            "ping",
            "",
            &[
                "version".to_string(),
                "--format".to_string(),
                "{{.Server.Version}}".to_string(),
            ],
        )
        .await
        .map(|_| ())
    }

    /// `docker create` with prebuilt arguments (image, name, binds, ports).
    /// Returns the engine-assigned container ID.
    pub async fn create_container(&self, name: &str, args: Vec<String>) -> Result<String> {
        let mut full = vec!["create".to_string()];
        full.extend(args);
        self.exec("create", name, &full).await
    }

    pub async fn start_container(&self, id: &str) -> Result<()> {
        self.exec("start", id, &["start".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    /// Stop with a grace period before the engine sends SIGKILL.
    pub async fn stop_container(&self, id: &str, grace: Duration) -> Result<()> {
        self.exec(
            "stop",
            id,
            &[
                "stop".to_string(),
                "--time".to_string(),
                grace.as_secs().to_string(),
                id.to_string(),
            ],
        )
        .await
        .map(|_| ())
    }

    pub async fn pause_container(&self, id: &str) -> Result<()> {
        self.exec("pause", id, &["pause".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    pub async fn unpause_container(&self, id: &str) -> Result<()> {
        self.exec("unpause", id, &["unpause".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    pub async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        let stdout = self
            .exec(
                "inspect",
                id,
                &[
                    "inspect".to_string(),
                    "--type".to_string(),
                    "container".to_string(),
                    id.to_string(),
                ],
            )
            .await?;
        // `docker inspect` always emits an array.
        let mut parsed: Vec<ContainerInspect> = serde_json::from_str(&stdout)?;
        parsed.pop().ok_or_else(|| AgentError::NotFound(id.to_string()))
    }

    /// Primary names of all containers, running or not.
    pub async fn list_container_names(&self) -> Result<Vec<String>> {
        let stdout = self
            .exec(
                "list",
                "",
                &[
                    "ps".to_string(),
                    "--all".to_string(),
                    "--format".to_string(),
                    "{{.Names}}".to_string(),
                ],
            )
            .await?;
        Ok(stdout.lines().map(|l| l.trim().to_string()).collect())
    }

    pub async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("--force".to_string());
        }
        args.push(id.to_string());
        self.exec("remove", id, &args).await.map(|_| ())
    }

    pub async fn pull_image(&self, image: &str) -> Result<()> {
        self.exec("pull", image, &["pull".to_string(), image.to_string()])
            .await
            .map(|_| ())
    }

    pub async fn remove_image(&self, image: &str) -> Result<()> {
        self.exec("rmi", image, &["rmi".to_string(), image.to_string()])
            .await
            .map(|_| ())
    }
}

/// Map engine stderr onto the agent error taxonomy. Fail-open to a generic
/// engine error carrying the full message when nothing matches.
fn classify_engine_error(operation: &'static str, id: &str, stderr: &str) -> AgentError {
    if stderr.contains("No such container") || stderr.contains("No such object") {
        AgentError::NotFound(id.to_string())
    } else if stderr.contains("is already in use") {
        AgentError::DuplicateId(id.to_string())
    } else if stderr.contains("Cannot connect to the Docker daemon")
        || stderr.contains("error during connect")
    {
        AgentError::BackendUnavailable(stderr.to_string())
    } else {
        AgentError::Engine {
            operation,
            id: id.to_string(),
            message: stderr.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found() {
        let err = classify_engine_error("inspect", "job-1", "Error: No such container: job-1");
        assert!(matches!(err, AgentError::NotFound(id) if id == "job-1"));
    }

    #[test]
    fn classifies_duplicate_name() {
        let err = classify_engine_error(
            "create",
            "job-1",
            "docker: Error response from daemon: Conflict. The container name \"/DMS_job-1\" is already in use",
        );
        assert!(matches!(err, AgentError::DuplicateId(_)));
    }

    #[test]
    fn classifies_daemon_unreachable() {
        let err = classify_engine_error(
            "ping",
            "",
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock",
        );
        assert!(matches!(err, AgentError::BackendUnavailable(_)));
    }

    #[test]
    fn unknown_errors_keep_operation_context() {
        let err = classify_engine_error("stop", "job-2", "something unexpected");
        match err {
            AgentError::Engine { operation, id, message } => {
                assert_eq!(operation, "stop");
                assert_eq!(id, "job-2");
                assert_eq!(message, "something unexpected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parses_inspect_state() {
        let raw = r#"[{"State":{"Status":"exited","Running":false,"Paused":false,
            "Restarting":false,"ExitCode":0,"Error":"",
            "StartedAt":"2024-03-01T10:00:00.000000000Z",
            "FinishedAt":"2024-03-01T10:00:05.000000000Z"}}]"#;
        let parsed: Vec<ContainerInspect> = serde_json::from_str(raw).unwrap();
        let state = &parsed[0].state;
        assert_eq!(state.status, "exited");
        assert_eq!(state.exit_code, 0);
        assert!(!state.running);
    }
}
