//! Node Taint Controller
//!
//! Keeps a `CriticalAddonsOnly=true:NoSchedule` taint on every cluster node
//! whose name contains a configured substring (default `system`).
//!
//! The controller watches all nodes, re-checks each add, update and periodic
//! resync against a fresh read, and appends the taint with a conditional
//! write, retrying on optimistic-concurrency conflicts.

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting Node Taint Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Node name substring: {}", config.reconciler.name_substring);
    info!("  Taint: {}", config.reconciler.taint);
    info!("  Resync period: {:?}", config.resync_period);
    info!("  Worker concurrency: {}", config.worker_concurrency);

    // Initialize and run controller
    let controller = Controller::new(config).await?;

    tokio::select! {
        result = controller.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting");
        }
    }

    Ok(())
}
