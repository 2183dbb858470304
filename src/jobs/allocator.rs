//! The seam between "what work exists" and "where it runs".
//!
//! Today every allocation targets the local node; the listen loop is the
//! integration point where placement policy and network dispatch plug in.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::jobs::{Allocation, ExecutionRequest};
use crate::{AgentError, Result};

/// Producer handle for submitting execution requests.
///
/// Cloneable; many producers may submit concurrently. The queue itself
/// serializes delivery, so no request is ever seen by more than one
/// consumer.
#[derive(Debug, Clone)]
pub struct AllocatorHandle {
    tx: mpsc::Sender<ExecutionRequest>,
}

impl AllocatorHandle {
    /// Submit a request, waiting for queue space when full.
    pub async fn submit(&self, request: ExecutionRequest) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| AgentError::Internal("allocator stopped".to_string()))
    }

    /// Submit without waiting; rejects with `QueueFull` when at capacity.
    pub fn try_submit(&self, request: ExecutionRequest) -> Result<()> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AgentError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => {
                AgentError::Internal("allocator stopped".to_string())
            }
        })
    }
}

/// Receives execution requests over a bounded inbound queue and produces
/// allocations bound to this node.
pub struct Allocator {
    node_id: String,
    rx: mpsc::Receiver<ExecutionRequest>,
}

impl Allocator {
    /// `capacity` bounds the inbound queue; producers block (or are
    /// rejected via `try_submit`) when it fills.
    pub fn new(node_id: impl Into<String>, capacity: usize) -> (Self, AllocatorHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                node_id: node_id.into(),
                rx,
            },
            AllocatorHandle { tx },
        )
    }

    /// Pure construction: bind a request to this node. No placement policy
    /// yet; always succeeds for a well-formed request.
    pub fn allocate(&self, request: ExecutionRequest) -> Allocation {
        Allocation::new(self.node_id.clone(), vec![request])
    }

    /// Drain the inbound queue until cancellation, routing each request
    /// through [`allocate`](Self::allocate) and delivering the result to
    /// `sink`. Exactly one consumer runs this loop.
    pub async fn listen(mut self, token: CancellationToken, sink: mpsc::Sender<Allocation>) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Allocator stopping");
                    return;
                }
                request = self.rx.recv() => {
                    let Some(request) = request else {
                        tracing::info!("All producers dropped, allocator stopping");
                        return;
                    };
                    let alloc = self.allocate(request);
                    tracing::info!(
                        allocation_id = %alloc.id,
                        job_id = %alloc.job_id,
                        node_id = %alloc.node_id,
                        "Execution request allocated"
                    );
                    if sink.send(alloc).await.is_err() {
                        tracing::warn!("Allocation sink dropped, allocator stopping");
                        return;
                    }
                }
            }
        }
    }
}
