use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// The fixed liveness payload. No handshake, no authentication; the channel
/// is loopback-only by deployment.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"heartbeat";

/// Liveness source run inside the supervised process.
///
/// Accepts watchdog connections and writes the heartbeat payload to each on
/// a fixed interval. A write failure tears down that connection only; the
/// accept loop keeps running.
pub struct HeartbeatServer {
    listener: TcpListener,
    interval: Duration,
}

impl HeartbeatServer {
    pub async fn bind(addr: &str, interval: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, interval })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self, token: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Heartbeat server running");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Heartbeat server stopping");
                    return;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::info!(%peer, "Watchdog connected");
                            tokio::spawn(feed(stream, self.interval, token.clone()));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Error accepting watchdog connection");
                        }
                    }
                }
            }
        }
    }
}

/// Liveness source for deployments where the watchdog owns the listening
/// socket (the reverse variant).
///
/// Dials the watchdog and writes the payload once per interval, one
/// connection per beat. A failed dial or write is logged and retried on
/// the next tick; the watchdog may come up after the agent.
pub struct HeartbeatSender {
    addr: String,
    interval: Duration,
}

impl HeartbeatSender {
    pub fn new(addr: impl Into<String>, interval: Duration) -> Self {
        Self {
            addr: addr.into(),
            interval,
        }
    }

    pub async fn run(self, token: CancellationToken) {
        tracing::info!(addr = %self.addr, interval = ?self.interval, "Heartbeat sender running");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Heartbeat sender stopping");
                    return;
                }
                _ = ticker.tick() => {
                    match TcpStream::connect(&self.addr).await {
                        Ok(mut stream) => {
                            if let Err(e) = stream.write_all(HEARTBEAT_PAYLOAD).await {
                                tracing::warn!(error = %e, "Error sending heartbeat");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(addr = %self.addr, error = %e, "Cannot reach watchdog");
                        }
                    }
                }
            }
        }
    }
}

/// Write heartbeats to one connection until it goes away or we shut down.
async fn feed(mut stream: TcpStream, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = stream.write_all(HEARTBEAT_PAYLOAD).await {
                    tracing::debug!(error = %e, "Heartbeat connection closed");
                    return;
                }
            }
        }
    }
}
