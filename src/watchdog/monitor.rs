//! Heartbeat-silence detection.
//!
//! The monitor never receives an event when the supervised process dies; it
//! can only observe silence. A poll loop compares "now - last seen" against
//! the timeout on a cadence strictly shorter than the timeout, bounding
//! detection latency at `timeout + poll_interval` after the last genuine
//! heartbeat.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use crate::config::HeartbeatConfig;
use crate::watchdog::cleanup::{Cleaner, CleanupReport};
use crate::watchdog::heartbeat::HEARTBEAT_PAYLOAD;
use crate::Result;

/// Watchdog-side monitor. Two roles share the timeout and cleanup
/// semantics and differ only in which side owns the listening socket:
/// [`watch`](Self::watch) dials the supervised process,
/// [`listen`](Self::listen) owns the socket itself (the reverse variant).
pub struct HeartbeatMonitor {
    timeout: Duration,
    poll_interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &HeartbeatConfig) -> Self {
        Self::new(config.timeout, config.poll_interval)
    }

    /// Dial the supervised process and monitor its heartbeats. Returns the
    /// cleanup report once silence exceeded the timeout and cleanup ran.
    pub async fn watch<C: Cleaner>(&self, addr: &str, cleaner: &C) -> Result<CleanupReport> {
        let stream = TcpStream::connect(addr).await?;
        tracing::info!(%addr, "Connected to supervised process");

        let last_seen = Arc::new(Mutex::new(Instant::now()));
        let reader_seen = last_seen.clone();
        tokio::spawn(async move {
            read_heartbeats(stream, reader_seen).await;
        });

        self.monitor(last_seen, cleaner).await
    }

    /// Reverse role: own the listening socket, accept any number of
    /// heartbeat senders, and run the same silence detection.
    pub async fn listen<C: Cleaner>(
        &self,
        listener: TcpListener,
        cleaner: &C,
    ) -> Result<CleanupReport> {
        let last_seen = Arc::new(Mutex::new(Instant::now()));

        let accept_seen = last_seen.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::info!(%peer, "Heartbeat sender connected");
                        let seen = accept_seen.clone();
                        tokio::spawn(async move {
                            read_heartbeats(stream, seen).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error accepting heartbeat connection");
                    }
                }
            }
        });

        self.monitor(last_seen, cleaner).await
    }

    /// Poll loop. Once silence exceeds the timeout, cleanup runs exactly
    /// once and always to completion; a partial pass would defeat the
    /// mechanism.
    async fn monitor<C: Cleaner>(
        &self,
        last_seen: Arc<Mutex<Instant>>,
        cleaner: &C,
    ) -> Result<CleanupReport> {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let elapsed = last_seen
                .lock()
                .expect("heartbeat timestamp mutex poisoned")
                .elapsed();
            if elapsed > self.timeout {
                tracing::warn!(
                    silence = ?elapsed,
                    timeout = ?self.timeout,
                    "No heartbeat within timeout, initiating cleanup"
                );
                return cleaner.cleanup().await;
            }
            tracing::debug!(silence = ?elapsed, "Heartbeat fresh");
        }
    }
}

/// Read loop for one connection. Every read consisting of the exact
/// payload (possibly several coalesced by TCP) refreshes the timestamp;
/// a read error only tears down this connection.
async fn read_heartbeats(mut stream: TcpStream, last_seen: Arc<Mutex<Instant>>) {
    let mut buf = [0u8; 128];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("Heartbeat connection closed by peer");
                return;
            }
            Ok(n) => {
                if is_heartbeat(&buf[..n]) {
                    tracing::debug!("Heartbeat received");
                    *last_seen
                        .lock()
                        .expect("heartbeat timestamp mutex poisoned") = Instant::now();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Error reading heartbeat");
                return;
            }
        }
    }
}

/// True when `data` is one or more back-to-back copies of the payload.
fn is_heartbeat(data: &[u8]) -> bool {
    !data.is_empty()
        && data.len() % HEARTBEAT_PAYLOAD.len() == 0
        && data.chunks(HEARTBEAT_PAYLOAD.len()).all(|c| c == HEARTBEAT_PAYLOAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_payload_is_heartbeat() {
        assert!(is_heartbeat(b"heartbeat"));
    }

    #[test]
    fn coalesced_payloads_are_heartbeats() {
        assert!(is_heartbeat(b"heartbeatheartbeat"));
    }

    #[test]
    fn other_traffic_is_not() {
        assert!(!is_heartbeat(b""));
        assert!(!is_heartbeat(b"heartbea"));
        assert!(!is_heartbeat(b"heartbeatx"));
        assert!(!is_heartbeat(b"noise"));
    }
}
