use std::time::Duration;

/// Reserved prefix marking containers as owned by this agent.
///
/// Any container whose primary name starts with this prefix is subject to
/// forced removal by the crash-recovery watchdog. The prefix is the sole
/// ownership signal; no labels are consulted.
pub const OWNED_NAME_PREFIX: &str = "DMS_";

/// Configuration for the heartbeat liveness channel and the watchdog
/// that monitors it.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Local TCP port the liveness payload travels over.
    pub port: u16,
    /// How often the supervised process writes a heartbeat.
    pub interval: Duration,
    /// Silence longer than this declares the supervised process dead.
    pub timeout: Duration,
    /// How often the watchdog compares "now - last seen" against the timeout.
    /// Kept independently configurable; must be shorter than `timeout` for
    /// the detection-latency bound to hold.
    pub poll_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        let timeout = Duration::from_secs(20);
        Self {
            port: 9898,
            interval: Duration::from_secs(5),
            timeout,
            poll_interval: timeout / 3,
        }
    }
}

impl HeartbeatConfig {
    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Worst-case delay between the last genuine heartbeat and cleanup.
    pub fn max_detection_latency(&self) -> Duration {
        self.timeout + self.poll_interval
    }
}

/// Configuration for the Docker runner backend.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Grace period granted to a container before forceful termination.
    pub stop_grace: Duration,
    /// Prefix applied to container names so the watchdog can reclaim them.
    pub name_prefix: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_secs(30),
            name_prefix: OWNED_NAME_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Identifier of the node this agent manages.
    pub node_id: String,
    /// Capacity of the allocator's inbound request queue. Producers using
    /// `submit` block when full; `try_submit` rejects instead.
    pub queue_capacity: usize,
    pub heartbeat: HeartbeatConfig,
    pub docker: DockerConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_id: "local".to_string(),
            queue_capacity: 128,
            heartbeat: HeartbeatConfig::default(),
            docker: DockerConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }
}
