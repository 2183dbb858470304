use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::runner::{JobConfig, NetworkConfig, ResourceLimits, StorageConfig};

/// A caller-submitted unit of demand. Immutable once submitted; owned by
/// the caller until consumed by an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The job this request belongs to.
    pub job_id: String,
    /// Unique identifier of this execution.
    pub execution_id: String,
    /// Image or VM identifier.
    pub source: String,
    pub command: Vec<String>,
    pub environment: HashMap<String, String>,
    pub resources: ResourceLimits,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

impl ExecutionRequest {
    pub fn new(
        job_id: impl Into<String>,
        execution_id: impl Into<String>,
        source: impl Into<String>,
        command: Vec<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            execution_id: execution_id.into(),
            source: source.into(),
            command,
            environment: HashMap::new(),
            resources: ResourceLimits::default(),
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl From<&ExecutionRequest> for JobConfig {
    /// Runner-facing view of one request.
    fn from(req: &ExecutionRequest) -> Self {
        JobConfig {
            id: req.execution_id.clone(),
            source: req.source.clone(),
            command: req.command.clone(),
            environment: req.environment.clone(),
            resources: req.resources,
            network: req.network.clone(),
            storage: req.storage.clone(),
        }
    }
}

/// An ordered collection of requests intended to co-locate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub tasks: Vec<ExecutionRequest>,
}

/// A named collection of task groups. Carries no runtime state of its own;
/// scheduling state lives on the requests and allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub task_groups: Vec<TaskGroup>,
}

impl Job {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            task_groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: TaskGroup) -> Self {
        self.task_groups.push(group);
        self
    }

    /// All requests across all groups, in submission order.
    pub fn requests(&self) -> impl Iterator<Item = &ExecutionRequest> {
        self.task_groups.iter().flat_map(|g| g.tasks.iter())
    }
}
