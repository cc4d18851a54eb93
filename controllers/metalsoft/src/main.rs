//! Metalsoft Controller
//!
//! Cluster API infrastructure provider for Metalsoft:
//! - MetalsoftCluster: provisions the infrastructure and control plane endpoint
//! - MetalsoftMachine: gates machines on cluster readiness and bootstrap data

mod backoff;
mod config;
mod controller;
mod error;
mod events;
mod reconciler;
mod scope;
mod services;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube's rustls backend needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Metalsoft Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Watch filter: {}", config.watch_filter_value.as_deref().unwrap_or("none"));
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!(
        "  Concurrency: {} clusters, {} machines",
        config.cluster_concurrency, config.machine_concurrency
    );

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
