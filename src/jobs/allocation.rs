use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::ExecutionRequest;
use crate::runner::ResourceLimits;

/// Binds an ordered sequence of execution requests to one node.
///
/// Created when requests are accepted, destroyed when the backend reports
/// the corresponding workloads terminal. Holding a sequence rather than a
/// single request keeps the task-group-to-allocation mapping open without a
/// breaking migration later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub job_id: String,
    pub node_id: String,
    pub requests: Vec<ExecutionRequest>,
}

impl Allocation {
    pub fn new(node_id: impl Into<String>, requests: Vec<ExecutionRequest>) -> Self {
        let job_id = requests
            .first()
            .map(|r| r.job_id.clone())
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            job_id,
            node_id: node_id.into(),
            requests,
        }
    }

    /// Aggregate footprint: the element-wise sum of the requests' resources.
    pub fn resources(&self) -> ResourceLimits {
        self.requests
            .iter()
            .fold(ResourceLimits::default(), |acc, r| acc.add(&r.resources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(execution_id: &str, cpu: f64, memory_bytes: i64, gpus: u32) -> ExecutionRequest {
        let mut req = ExecutionRequest::new("job-1", execution_id, "alpine:latest", vec![]);
        req.resources = ResourceLimits {
            cpu,
            memory_bytes,
            gpus,
        };
        req
    }

    #[test]
    fn allocation_takes_job_id_from_requests() {
        let alloc = Allocation::new("node-1", vec![request("exec-1", 1.0, 0, 0)]);
        assert_eq!(alloc.job_id, "job-1");
        assert_eq!(alloc.node_id, "node-1");
        assert_eq!(alloc.requests.len(), 1);
    }

    #[test]
    fn allocation_resources_sum_over_requests() {
        let alloc = Allocation::new(
            "node-1",
            vec![
                request("exec-1", 0.5, 1024, 1),
                request("exec-2", 1.5, 2048, 0),
            ],
        );
        let total = alloc.resources();
        assert_eq!(total.cpu, 2.0);
        assert_eq!(total.memory_bytes, 3072);
        assert_eq!(total.gpus, 1);
    }

    #[test]
    fn allocation_ids_are_unique() {
        let a = Allocation::new("node-1", vec![]);
        let b = Allocation::new("node-1", vec![]);
        assert_ne!(a.id, b.id);
    }
}
