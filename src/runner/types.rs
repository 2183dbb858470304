use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource limits for a single workload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU cores (fractional allowed, e.g. 0.5).
    pub cpu: f64,
    /// Memory limit in bytes. Zero means unlimited.
    pub memory_bytes: i64,
    /// Number of GPUs to pass through.
    pub gpus: u32,
}

impl ResourceLimits {
    /// Element-wise sum, used when aggregating across co-located requests.
    pub fn add(&self, other: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            cpu: self.cpu + other.cpu,
            memory_bytes: self.memory_bytes + other.memory_bytes,
            gpus: self.gpus + other.gpus,
        }
    }
}

/// One host-to-workload port publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host port, e.g. "8080".
    pub host_port: String,
    /// Workload-side port, e.g. "80".
    pub workload_port: String,
    /// Protocol (tcp, udp).
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub port_bindings: Vec<PortBinding>,
    /// Backend-specific network mode (e.g. "bridge", "none"). Empty means
    /// the backend default.
    pub network_mode: String,
}

/// One storage bind: a host path mounted into the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBinding {
    pub source: String,
    pub destination: String,
    /// Mount mode, "rw" or "ro".
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bindings: Vec<StorageBinding>,
    /// Force every binding read-only regardless of its own mode.
    pub read_only: bool,
}

/// Everything a backend needs to start one workload.
///
/// The ID doubles as the backend's native workload identifier; it must be
/// unique among workloads currently tracked by the backend instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub id: String,
    /// Image or VM identifier.
    pub source: String,
    /// Command and arguments to execute.
    pub command: Vec<String>,
    pub environment: HashMap<String, String>,
    pub resources: ResourceLimits,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

impl JobConfig {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Reject configurations the backends cannot act on.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(crate::AgentError::InvalidConfig("empty job ID".into()));
        }
        if self.source.is_empty() {
            return Err(crate::AgentError::InvalidConfig(format!(
                "job {}: empty source image",
                self.id
            )));
        }
        for b in &self.storage.bindings {
            if b.source.is_empty() || b.destination.is_empty() {
                return Err(crate::AgentError::InvalidConfig(format!(
                    "job {}: storage binding with empty path",
                    self.id
                )));
            }
        }
        for p in &self.network.port_bindings {
            if p.host_port.parse::<u16>().is_err() || p.workload_port.parse::<u16>().is_err() {
                return Err(crate::AgentError::InvalidConfig(format!(
                    "job {}: malformed port binding {}:{}",
                    self.id, p.host_port, p.workload_port
                )));
            }
        }
        Ok(())
    }
}

/// Lifecycle state of a workload as reported by its backend.
///
/// `Pending -> Running -> {Completed, Failed}`; `Running -> Pending` only
/// through the backend's own pause/resume cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatusCode {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatusCode {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatusCode::Completed | JobStatusCode::Failed)
    }
}

impl std::fmt::Display for JobStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatusCode::Pending => write!(f, "pending"),
            JobStatusCode::Running => write!(f, "running"),
            JobStatusCode::Completed => write!(f, "completed"),
            JobStatusCode::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time, backend-reported truth about one workload.
///
/// Re-derived on every query; never cached. `completion_time` stays `None`
/// while the status is non-terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub status: JobStatusCode,
    pub exit_code: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl JobStatus {
    pub fn pending(id: impl Into<String>) -> Self {
        Self::with_code(id, JobStatusCode::Pending)
    }

    pub fn running(id: impl Into<String>) -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::with_code(id, JobStatusCode::Running)
        }
    }

    fn with_code(id: impl Into<String>, status: JobStatusCode) -> Self {
        Self {
            id: id.into(),
            status,
            exit_code: None,
            start_time: None,
            completion_time: None,
            error_message: None,
        }
    }
}
