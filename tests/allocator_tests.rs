//! Tests for the allocator: queue bounds, ordering, cancellation and the
//! single-consumer delivery guarantee.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dms_agent::jobs::{Allocation, Allocator, ExecutionRequest};
use dms_agent::AgentError;

fn request(execution_id: &str) -> ExecutionRequest {
    ExecutionRequest::new(
        "job-1",
        execution_id,
        "alpine:latest",
        vec!["sleep".to_string(), "1".to_string()],
    )
}

#[tokio::test]
async fn allocate_binds_request_to_local_node() {
    let (allocator, _handle) = Allocator::new("node-1", 8);

    let alloc = allocator.allocate(request("exec-1"));
    assert_eq!(alloc.node_id, "node-1");
    assert_eq!(alloc.job_id, "job-1");
    assert_eq!(alloc.requests.len(), 1);
    assert_eq!(alloc.requests[0].execution_id, "exec-1");
}

#[tokio::test]
async fn listen_routes_requests_in_order() {
    let (allocator, handle) = Allocator::new("node-1", 8);
    let token = CancellationToken::new();
    let (sink, mut allocations) = mpsc::channel::<Allocation>(8);

    tokio::spawn(allocator.listen(token.clone(), sink));

    for i in 0..3 {
        handle.submit(request(&format!("exec-{i}"))).await.unwrap();
    }

    for i in 0..3 {
        let alloc = allocations.recv().await.expect("allocation delivered");
        assert_eq!(alloc.requests[0].execution_id, format!("exec-{i}"));
    }

    token.cancel();
}

#[tokio::test]
async fn cancellation_stops_the_listen_loop() {
    let (allocator, _handle) = Allocator::new("node-1", 8);
    let token = CancellationToken::new();
    let (sink, _allocations) = mpsc::channel::<Allocation>(8);

    let listen = tokio::spawn(allocator.listen(token.clone(), sink));
    token.cancel();

    tokio::time::timeout(Duration::from_secs(1), listen)
        .await
        .expect("listen loop exited after cancellation")
        .unwrap();
}

#[tokio::test]
async fn concurrent_producers_deliver_each_request_exactly_once() {
    let (allocator, handle) = Allocator::new("node-1", 64);
    let token = CancellationToken::new();
    let (sink, mut allocations) = mpsc::channel::<Allocation>(64);

    tokio::spawn(allocator.listen(token.clone(), sink));

    let mut producers = Vec::new();
    for p in 0..4 {
        let handle = handle.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..10 {
                handle
                    .submit(request(&format!("exec-{p}-{i}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let mut seen = HashSet::new();
    for _ in 0..40 {
        let alloc = allocations.recv().await.expect("allocation delivered");
        assert!(
            seen.insert(alloc.requests[0].execution_id.clone()),
            "request delivered twice"
        );
    }
    assert_eq!(seen.len(), 40);

    token.cancel();
}

#[tokio::test]
async fn try_submit_rejects_when_queue_full() {
    // No consumer running, so the queue fills immediately.
    let (_allocator, handle) = Allocator::new("node-1", 1);

    handle.try_submit(request("exec-1")).unwrap();
    let err = handle.try_submit(request("exec-2")).unwrap_err();
    assert!(matches!(err, AgentError::QueueFull));
}

#[tokio::test]
async fn submit_blocks_until_space_then_completes() {
    let (allocator, handle) = Allocator::new("node-1", 1);
    handle.try_submit(request("exec-1")).unwrap();

    let blocked = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.submit(request("exec-2")).await })
    };

    // Queue is full and nobody is draining; the submit must still be pending.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    let token = CancellationToken::new();
    let (sink, mut allocations) = mpsc::channel::<Allocation>(8);
    tokio::spawn(allocator.listen(token.clone(), sink));

    blocked.await.unwrap().unwrap();
    assert_eq!(
        allocations.recv().await.unwrap().requests[0].execution_id,
        "exec-1"
    );
    assert_eq!(
        allocations.recv().await.unwrap().requests[0].execution_id,
        "exec-2"
    );

    token.cancel();
}
