//! The pluggable execution backend contract.
//!
//! A [`Runner`] is the minimal capability surface any execution technology
//! (container engine, VM hypervisor, micro-VM) must expose so the rest of
//! the agent stays backend-agnostic. Backends are concrete variants selected
//! at configuration time; [`docker::DockerRunner`] is the reference
//! implementation and compliance target.

pub mod docker;
pub mod types;

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::Result;
pub use types::{
    JobConfig, JobStatus, JobStatusCode, NetworkConfig, PortBinding, ResourceLimits,
    StorageBinding, StorageConfig,
};

/// Features a backend may support. Placement logic filters eligible
/// backends on these; operations behind an absent capability fail with
/// `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Networking,
    VolumeMounts,
    GpuPassthrough,
    PauseResume,
    StatusStreaming,
}

/// Lazy sequence of status transitions for one workload. Ends when the
/// workload reaches a terminal state or the caller drops the stream. Not
/// buffered: a slow consumer may miss intermediate transitions but always
/// observes the terminal one.
pub type StatusStream = Pin<Box<dyn Stream<Item = JobStatus> + Send>>;

/// Lifecycle contract for one execution backend instance.
///
/// Workload state transitions are backend-authoritative; the contract never
/// infers a transition itself.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Supported feature set. Pure and side-effect free.
    fn capabilities(&self) -> &'static [Capability];

    /// Create and start the workload described by `config`.
    ///
    /// `config.id` must be unique among workloads currently tracked by this
    /// backend. Returns `Running` (or `Pending` if the backend defers
    /// start). Fails with `BackendUnavailable`, `InvalidConfig` or
    /// `DuplicateId`.
    async fn start(&self, config: JobConfig) -> Result<JobStatus>;

    /// Stop a workload, granting it a grace period before forceful
    /// termination. Idempotent on an already-stopped workload; `NotFound`
    /// if the ID is unknown.
    async fn stop(&self, id: &str) -> Result<()>;

    /// Suspend a running workload. `NotFound` if unknown, `Unsupported`
    /// if the backend cannot pause.
    async fn pause(&self, id: &str) -> Result<()>;

    /// Resume a paused workload. `NotFound` if unknown, `Unsupported`
    /// if the backend cannot resume.
    async fn resume(&self, id: &str) -> Result<()>;

    /// Verify backend reachability only; individual workloads are not
    /// inspected.
    async fn health_check(&self) -> Result<()>;

    /// Synchronous point-in-time status query. `NotFound` if unknown.
    async fn status(&self, id: &str) -> Result<JobStatus>;

    /// Stream of status transitions for one workload. The reference
    /// backend reports `Unimplemented`; see [`docker`].
    async fn status_stream(&self, id: &str) -> Result<StatusStream>;
}
