//! Skirmish Engine
//!
//! Runs the game controller and its worker pool in one process.
//!
//! Startup order:
//! - Configuration: parse flags, validate before anything starts
//! - Store: open the configured backend
//! - Controller: bind the control plane and start the reclaim sweep
//! - Workers: dial the controller, then run the pool until shutdown
//!
//! SIGINT/SIGTERM cancel a shared token. Worker loops finish their current
//! game, the sweep stops and the server drains before the process exits.

mod cli;
mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::shutdown::install_shutdown_handler;
use skirmish_client::ControllerClient;
use skirmish_core::domain::job::Payload;
use skirmish_controller::{JobService, create_store, serve_listener, spawn_reclaim_sweep};
use skirmish_worker::{EchoRunner, PollerStats, WorkerPool};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "skirmish_engine=info,skirmish_controller=info,skirmish_worker=info,tower_http=info"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skirmish Engine");

    // Load configuration
    let controller_config = cli.controller_config();
    controller_config
        .validate()
        .context("Invalid controller configuration")?;

    let worker_config = cli.worker_config();
    worker_config
        .validate_against(controller_config.staleness_threshold)
        .context("Invalid worker configuration")?;

    info!(
        "Loaded configuration: store={}, listen={}, workers={}, staleness={:?}",
        controller_config.store,
        controller_config.listen_addr,
        worker_config.worker_count,
        controller_config.staleness_threshold
    );

    // Initialize store and controller service
    let store = create_store(controller_config.store, &controller_config.save_dir)
        .await
        .with_context(|| format!("Failed to open {} store", controller_config.store))?;
    let service = Arc::new(JobService::new(
        store,
        controller_config.staleness_threshold,
    ));

    for _ in 0..cli.seed {
        service
            .create_job(Payload::default())
            .await
            .context("Failed to seed job")?;
    }
    if cli.seed > 0 {
        info!("Seeded {} job(s)", cli.seed);
    }

    let shutdown = install_shutdown_handler();

    // Start the control plane
    let listener = TcpListener::bind(&controller_config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", controller_config.listen_addr))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;

    let mut server = tokio::spawn(serve_listener(
        listener,
        Arc::clone(&service),
        shutdown.clone(),
    ));
    let sweep = spawn_reclaim_sweep(
        Arc::clone(&service),
        controller_config.sweep_interval,
        shutdown.clone(),
    );

    // Workers start only once the controller answers
    let client = ControllerClient::connect(dial_addr(local_addr).to_string())
        .await
        .context("Failed to connect to controller")?;

    let pool = WorkerPool::new(worker_config, Arc::new(client), Arc::new(EchoRunner));

    let stats = tokio::select! {
        stats = pool.run(shutdown.clone()) => stats,
        joined = &mut server => {
            shutdown.cancel();
            if let Err(e) = sweep.await {
                error!("Reclaim sweep task failed: {}", e);
            }
            return match joined {
                Ok(Ok(())) => Err(anyhow::anyhow!("Controller stopped unexpectedly")),
                Ok(Err(e)) => Err(e).context("Controller failed"),
                Err(e) => Err(e).context("Controller task panicked"),
            };
        }
    };

    // Drain mode returns without a signal; stop the controller as well
    shutdown.cancel();

    if let Err(e) = sweep.await {
        error!("Reclaim sweep task failed: {}", e);
    }
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Controller error during shutdown: {}", e),
        Err(e) => error!("Controller task failed: {}", e),
    }

    let total: PollerStats = stats.into_iter().sum();
    info!(
        "Shutdown complete: {} completed, {} failed, {} abandoned, {} errors",
        total.completed, total.failed, total.abandoned, total.errors
    );

    Ok(())
}

/// Address workers dial to reach a listener bound to `addr`
///
/// A wildcard bind is reached over loopback.
fn dial_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
