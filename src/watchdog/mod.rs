//! Heartbeat watchdog pair.
//!
//! Two independent processes exchange a liveness payload over a local TCP
//! channel: the supervised agent runs a [`HeartbeatServer`], the watchdog
//! process runs a [`HeartbeatMonitor`]. When heartbeats stop arriving
//! within the timeout, the monitor runs a [`Cleaner`] that forcibly removes
//! every workload carrying the reserved ownership prefix, then the watchdog
//! exits. This is the safety net that guarantees no orphaned workload
//! survives an unclean shutdown of the controlling process.

pub mod cleanup;
pub mod heartbeat;
pub mod monitor;

pub use cleanup::{Cleaner, CleanupReport, DockerCleaner};
pub use heartbeat::{HeartbeatSender, HeartbeatServer, HEARTBEAT_PAYLOAD};
pub use monitor::HeartbeatMonitor;
