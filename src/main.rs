use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dms_agent::config::{AgentConfig, HeartbeatConfig, OWNED_NAME_PREFIX};
use dms_agent::docker::DockerClient;
use dms_agent::jobs::Allocator;
use dms_agent::runner::docker::DockerRunner;
use dms_agent::runner::Runner;
use dms_agent::shutdown::{ignore_interrupts, install_shutdown_handler};
use dms_agent::watchdog::{DockerCleaner, HeartbeatMonitor, HeartbeatSender, HeartbeatServer};

#[derive(Parser, Debug)]
#[command(name = "dms-agent")]
#[command(version)]
#[command(about = "Node-local compute agent with crash-recovery watchdog")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the node agent (heartbeat source, allocator, container runner)
    Agent(AgentArgs),

    /// Run the crash-recovery watchdog process
    Watchdog(WatchdogArgs),
}

#[derive(Parser, Debug)]
struct AgentArgs {
    /// Identifier of this node
    #[arg(long, default_value = "local")]
    node_id: String,

    /// Local TCP port for the heartbeat liveness channel
    #[arg(long, default_value = "9898")]
    heartbeat_port: u16,

    /// Seconds between heartbeats
    #[arg(long, default_value = "5")]
    heartbeat_interval_secs: u64,

    /// Capacity of the allocator's inbound request queue
    #[arg(long, default_value = "128")]
    queue_capacity: usize,

    /// Dial a listening watchdog (`watchdog --listen`) instead of serving
    /// heartbeats on the agent's own socket
    #[arg(long)]
    dial_heartbeat: bool,

    /// Do not spawn the watchdog child process
    #[arg(long)]
    no_watchdog: bool,
}

#[derive(Parser, Debug)]
struct WatchdogArgs {
    /// Local TCP port of the heartbeat liveness channel
    #[arg(long, default_value = "9898")]
    port: u16,

    /// Heartbeat silence (seconds) that declares the agent dead
    #[arg(long, default_value = "20")]
    timeout_secs: u64,

    /// Seconds between silence checks (defaults to a third of the timeout)
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Own the listening socket instead of dialing the agent
    #[arg(long)]
    listen: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Commands::Agent(args) => run_agent(args).await,
        Commands::Watchdog(args) => run_watchdog(args).await,
    }
}

async fn run_agent(args: AgentArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AgentConfig {
        node_id: args.node_id.clone(),
        queue_capacity: args.queue_capacity,
        heartbeat: HeartbeatConfig {
            port: args.heartbeat_port,
            interval: Duration::from_secs(args.heartbeat_interval_secs),
            ..Default::default()
        },
        ..Default::default()
    };

    let token = install_shutdown_handler();

    // The watchdog child must exist before the dialing sender starts
    // retrying against it.
    if !args.no_watchdog {
        spawn_watchdog_child(&config.heartbeat, args.dial_heartbeat)?;
    }

    // Liveness source for the watchdog. Which side owns the listening
    // socket depends on the deployment.
    if args.dial_heartbeat {
        let sender = HeartbeatSender::new(config.heartbeat.addr(), config.heartbeat.interval);
        tokio::spawn(sender.run(token.clone()));
    } else {
        let heartbeat =
            HeartbeatServer::bind(&config.heartbeat.addr(), config.heartbeat.interval).await?;
        tokio::spawn(heartbeat.run(token.clone()));
    }

    let runner = DockerRunner::new(config.docker.clone());
    if let Err(e) = runner.health_check().await {
        tracing::warn!(error = %e, "Container engine not reachable at startup");
    }

    // Inbound request queue; the handle is where the network dispatch layer
    // will plug in.
    let (allocator, _handle) = Allocator::new(&config.node_id, config.queue_capacity);
    let (alloc_tx, mut alloc_rx) = tokio::sync::mpsc::channel(config.queue_capacity);
    tokio::spawn(allocator.listen(token.clone(), alloc_tx));

    // Allocation consumer: acknowledges placements; routing each request
    // into the runner hangs off this loop.
    let consumer_token = token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = consumer_token.cancelled() => return,
                alloc = alloc_rx.recv() => {
                    let Some(alloc) = alloc else { return };
                    tracing::info!(
                        allocation_id = %alloc.id,
                        requests = alloc.requests.len(),
                        "Allocation accepted"
                    );
                }
            }
        }
    });

    tracing::info!(node_id = %config.node_id, "Agent running");
    token.cancelled().await;
    tracing::info!("Agent shut down");
    Ok(())
}

/// Launch the watchdog as an independent child of this executable so it
/// survives the agent's own death.
fn spawn_watchdog_child(
    heartbeat: &HeartbeatConfig,
    listen: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(exe);
    command
        .arg("watchdog")
        .arg("--port")
        .arg(heartbeat.port.to_string())
        .arg("--timeout-secs")
        .arg(heartbeat.timeout.as_secs().to_string())
        .arg("--poll-secs")
        .arg(heartbeat.poll_interval.as_secs().to_string());
    if listen {
        command.arg("--listen");
    }
    let child = command.spawn()?;
    tracing::info!(pid = child.id(), "Watchdog process started");
    Ok(())
}

async fn run_watchdog(args: WatchdogArgs) -> Result<(), Box<dyn std::error::Error>> {
    // An accidental Ctrl-C to the process group must not kill the watchdog.
    ignore_interrupts();

    let timeout = Duration::from_secs(args.timeout_secs);
    let config = HeartbeatConfig {
        port: args.port,
        timeout,
        poll_interval: args
            .poll_secs
            .map(Duration::from_secs)
            .unwrap_or(timeout / 3),
        ..Default::default()
    };
    let monitor = HeartbeatMonitor::from_config(&config);
    let cleaner = DockerCleaner::new(DockerClient::new(), OWNED_NAME_PREFIX);
    let addr = config.addr();

    let result = if args.listen {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "Watchdog listening for heartbeats");
        monitor.listen(listener, &cleaner).await
    } else {
        monitor.watch(&addr, &cleaner).await
    };

    match result {
        Ok(report) => {
            tracing::info!(
                removed = report.removed,
                failed = report.failed,
                "Cleanup completed, exiting watchdog"
            );
            Ok(())
        }
        Err(e) => {
            // Without engine access nothing can be reclaimed.
            tracing::error!(error = %e, "Cleanup failed, exiting watchdog");
            std::process::exit(1);
        }
    }
}
