//! Reference [`Runner`] implementation against a container engine.
//!
//! Containers are named with the reserved ownership prefix plus the job ID
//! (one-to-one, no indirection table), which makes them reclaimable by the
//! crash-recovery watchdog.

use chrono::{DateTime, Utc};

use async_trait::async_trait;

use crate::config::DockerConfig;
use crate::docker::{ContainerState, DockerClient, ZERO_TIME};
use crate::runner::{Capability, JobConfig, JobStatus, JobStatusCode, Runner, StatusStream};
use crate::{AgentError, Result};

pub struct DockerRunner {
    client: DockerClient,
    config: DockerConfig,
}

impl DockerRunner {
    pub fn new(config: DockerConfig) -> Self {
        Self {
            client: DockerClient::new(),
            config,
        }
    }

    pub fn with_client(client: DockerClient, config: DockerConfig) -> Self {
        Self { client, config }
    }

    /// Engine-native identifier for a job ID.
    fn name(&self, id: &str) -> String {
        format!("{}{}", self.config.name_prefix, id)
    }

    /// Engine errors reference the container name; report the job ID the
    /// caller knows instead.
    fn rewrite_id(err: AgentError, id: &str) -> AgentError {
        match err {
            AgentError::NotFound(_) => AgentError::NotFound(id.to_string()),
            AgentError::DuplicateId(_) => AgentError::DuplicateId(id.to_string()),
            other => other,
        }
    }
}

#[async_trait]
impl Runner for DockerRunner {
    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::Networking,
            Capability::VolumeMounts,
            Capability::PauseResume,
        ]
    }

    async fn start(&self, config: JobConfig) -> Result<JobStatus> {
        config.validate()?;
        if config.resources.gpus > 0 {
            // Capability-gated: this backend does not advertise
            // GpuPassthrough.
            return Err(AgentError::Unsupported("gpu passthrough"));
        }

        let name = self.name(&config.id);
        let args = build_create_args(&name, &config);
        tracing::info!(job_id = %config.id, image = %config.source, "Starting workload");

        self.client
            .create_container(&name, args)
            .await
            .map_err(|e| Self::rewrite_id(e, &config.id))?;
        self.client
            .start_container(&name)
            .await
            .map_err(|e| Self::rewrite_id(e, &config.id))?;

        Ok(JobStatus::running(config.id))
    }

    async fn stop(&self, id: &str) -> Result<()> {
        tracing::info!(job_id = %id, "Stopping workload");
        self.client
            .stop_container(&self.name(id), self.config.stop_grace)
            .await
            .map_err(|e| Self::rewrite_id(e, id))
    }

    async fn pause(&self, id: &str) -> Result<()> {
        self.client
            .pause_container(&self.name(id))
            .await
            .map_err(|e| Self::rewrite_id(e, id))
    }

    async fn resume(&self, id: &str) -> Result<()> {
        self.client
            .unpause_container(&self.name(id))
            .await
            .map_err(|e| Self::rewrite_id(e, id))
    }

    async fn health_check(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn status(&self, id: &str) -> Result<JobStatus> {
        let inspect = self
            .client
            .inspect_container(&self.name(id))
            .await
            .map_err(|e| Self::rewrite_id(e, id))?;
        Ok(status_from_state(id, &inspect.state))
    }

    async fn status_stream(&self, _id: &str) -> Result<StatusStream> {
        // Extension point: needs an event subscription or a polling loop
        // against the engine's event API.
        Err(AgentError::Unimplemented("status streaming"))
    }
}

/// Translate a `JobConfig` into `docker create` arguments.
///
/// Environment becomes `KEY=VALUE` flags, storage bindings become
/// `source:destination:mode` bind strings, and every port binding is
/// published on `0.0.0.0`.
pub fn build_create_args(name: &str, config: &JobConfig) -> Vec<String> {
    let mut args = vec!["--name".to_string(), name.to_string()];

    let mut env: Vec<_> = config.environment.iter().collect();
    env.sort_by_key(|(k, _)| k.clone());
    for (key, value) in env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }

    for binding in &config.storage.bindings {
        let mode = if config.storage.read_only {
            "ro"
        } else {
            binding.mode.as_str()
        };
        args.push("--volume".to_string());
        args.push(format!("{}:{}:{}", binding.source, binding.destination, mode));
    }

    for port in &config.network.port_bindings {
        args.push("--publish".to_string());
        args.push(format!(
            "0.0.0.0:{}:{}/{}",
            port.host_port, port.workload_port, port.protocol
        ));
    }

    if !config.network.network_mode.is_empty() {
        args.push("--network".to_string());
        args.push(config.network.network_mode.clone());
    }

    if config.resources.cpu > 0.0 {
        args.push("--cpus".to_string());
        args.push(config.resources.cpu.to_string());
    }
    if config.resources.memory_bytes > 0 {
        args.push("--memory".to_string());
        args.push(config.resources.memory_bytes.to_string());
    }

    args.push(config.source.clone());
    args.extend(config.command.iter().cloned());
    args
}

/// Engine-reported container state to a status code, fail-closed: anything
/// unrecognized is Failed.
pub fn derive_status(state: &ContainerState) -> JobStatusCode {
    if state.running {
        JobStatusCode::Running
    } else if state.paused || state.restarting {
        JobStatusCode::Pending
    } else if state.status == "exited" || state.status == "dead" {
        if state.exit_code == 0 {
            JobStatusCode::Completed
        } else {
            JobStatusCode::Failed
        }
    } else {
        JobStatusCode::Failed
    }
}

/// Parse an engine timestamp; the zero timestamp means "not yet".
pub fn parse_engine_time(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() || raw == ZERO_TIME || raw.starts_with("0001-01-01T00:00:00") {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Assemble the authoritative status for one workload from inspect output.
pub fn status_from_state(id: &str, state: &ContainerState) -> JobStatus {
    let status = derive_status(state);
    JobStatus {
        id: id.to_string(),
        status,
        exit_code: if status.is_terminal() {
            Some(state.exit_code)
        } else {
            None
        },
        start_time: parse_engine_time(&state.started_at),
        completion_time: if status.is_terminal() {
            parse_engine_time(&state.finished_at)
        } else {
            None
        },
        error_message: if state.error.is_empty() {
            None
        } else {
            Some(state.error.clone())
        },
    }
}
