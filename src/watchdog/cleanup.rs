//! Crash-cleanup: reclaim every workload tagged as owned by the supervised
//! process.
//!
//! The naming prefix is the sole ownership signal. Any container given the
//! prefix outside this agent's control is collaterally removed; that is a
//! documented hazard of the convention, not a bug.

use std::time::Duration;

use async_trait::async_trait;

use crate::docker::DockerClient;
use crate::Result;

/// Grace granted during cleanup before the engine force-kills a container.
const CLEANUP_STOP_GRACE: Duration = Duration::from_secs(10);

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Containers whose name carried the ownership prefix.
    pub matched: usize,
    /// Successfully removed.
    pub removed: usize,
    /// Removal failed; logged and skipped.
    pub failed: usize,
}

/// Reclaims owned workloads once the monitor declares the supervised
/// process dead.
#[async_trait]
pub trait Cleaner: Send + Sync {
    /// Runs the full pass: failure to enumerate workloads at all is fatal,
    /// per-workload failures are logged and the pass continues.
    async fn cleanup(&self) -> Result<CleanupReport>;
}

/// True when a container's primary name marks it as owned. The engine
/// reports primary names with a leading slash.
pub fn is_owned_name(name: &str, prefix: &str) -> bool {
    name.trim_start_matches('/').starts_with(prefix)
}

/// Filter a name listing down to cleanup targets.
pub fn select_targets<'a>(names: &'a [String], prefix: &str) -> Vec<&'a str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|n| is_owned_name(n, prefix))
        .collect()
}

/// Cleaner against the container engine: stop then force-remove every
/// owned container, each attempted independently.
pub struct DockerCleaner {
    client: DockerClient,
    prefix: String,
}

impl DockerCleaner {
    pub fn new(client: DockerClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Cleaner for DockerCleaner {
    async fn cleanup(&self) -> Result<CleanupReport> {
        // Cannot reclaim what we cannot see: enumeration failure is fatal.
        let names = self.client.list_container_names().await?;
        let targets = select_targets(&names, &self.prefix);

        let mut report = CleanupReport {
            matched: targets.len(),
            ..Default::default()
        };

        for name in targets {
            let name = name.trim_start_matches('/');
            tracing::info!(container = %name, "Reclaiming owned container");

            if let Err(e) = self.client.stop_container(name, CLEANUP_STOP_GRACE).await {
                tracing::warn!(container = %name, error = %e, "Failed to stop container");
            }
            match self.client.remove_container(name, true).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::error!(container = %name, error = %e, "Failed to remove container");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            matched = report.matched,
            removed = report.removed,
            failed = report.failed,
            "Cleanup pass completed"
        );
        Ok(report)
    }
}
