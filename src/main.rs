//! orderer-operator - materializes Hyperledger Fabric orderer nodes from
//! Orderer custom resources.
//!
//! Startup order: logging, configuration, health server, leader election,
//! then the controller. Only the lease holder runs the controller; losing the
//! lease exits the process so Kubernetes restarts it into a fresh election.

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use orderer_operator::OperatorConfig;
use orderer_operator::health::{HealthState, run_health_server};
use orderer_operator::run_controller;

const LEASE_NAME: &str = "orderer-operator-leader";
const LEASE_TTL: Duration = Duration::from_secs(15);
const LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(5);

/// Time given to in-flight reconciles after a shutdown signal
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orderer_operator=info".parse()?)
                .add_directive("kube=info".parse()?)
                .add_directive("kube_leader_election=info".parse()?),
        )
        .json()
        .init();

    let config = OperatorConfig::from_env()?;
    info!(
        pod = %config.pod_name,
        namespace = %config.pod_namespace,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("cluster-wide"),
        health_port = config.health_port,
        "Starting orderer-operator"
    );

    let client = Client::try_default().await?;
    let health_state = Arc::new(HealthState::new());

    // Probes must answer while this replica is still a follower
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let lease = lease_lock(client.clone(), &config);
    acquire_leadership(&lease).await;
    let renewal_handle = keep_leadership(lease);

    let controller_handle = {
        let health_state = health_state.clone();
        let config = config.clone();
        tokio::spawn(async move {
            run_controller(client, Some(health_state), &config).await;
        })
    };

    tokio::select! {
        result = controller_handle => {
            if let Err(e) = result {
                error!("Controller task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        // Renewal only returns by panicking; lease loss exits the process
        Err(e) = renewal_handle => {
            error!("Lease renewal task panicked: {}", e);
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");
            health_state.set_ready(false).await;
            info!(
                grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
                "Waiting for in-flight reconciliations"
            );
            tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
        }
    }

    info!("Operator stopped");
    Ok(())
}

/// Lease held by the active replica in the operator's own namespace
fn lease_lock(client: Client, config: &OperatorConfig) -> LeaseLock {
    LeaseLock::new(
        client,
        &config.pod_namespace,
        LeaseLockParams {
            holder_id: config.pod_name.clone(),
            lease_name: LEASE_NAME.to_string(),
            lease_ttl: LEASE_TTL,
        },
    )
}

/// Block until this replica holds the lease
async fn acquire_leadership(lease: &LeaseLock) {
    info!(lease_name = LEASE_NAME, "Waiting to acquire leadership...");
    loop {
        match lease.try_acquire_or_renew().await {
            Ok(result) if result.acquired_lease => {
                info!("Acquired leadership");
                return;
            }
            Ok(_) => info!("Another instance is leader, waiting..."),
            Err(e) => warn!("Failed to acquire lease: {}, retrying...", e),
        }
        tokio::time::sleep(LEASE_RENEW_INTERVAL).await;
    }
}

/// Renew the lease in the background, exiting the process once it is lost
#[allow(clippy::exit)]
fn keep_leadership(lease: LeaseLock) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(LEASE_RENEW_INTERVAL).await;
            match lease.try_acquire_or_renew().await {
                Ok(result) if result.acquired_lease => {}
                Ok(_) => {
                    error!("Lost leadership! Shutting down...");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Failed to renew lease: {}. Shutting down...", e);
                    std::process::exit(1);
                }
            }
        }
    })
}

/// Wait for SIGTERM or SIGINT.
///
/// Without signal handlers the operator cannot shut down gracefully, so a
/// setup failure panics.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
