//! Shutdown signal handling
//!
//! An interrupt (Ctrl+C or SIGTERM) cancels in-flight status polling, runs
//! the run teardown and exits the process with status 0. The results
//! summary is not rendered on this path.

use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::service::CleanupCoordinator;

/// Completes when the process receives Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }
}

/// Cancels the run and tears it down
///
/// Returns once cleanup finished; exiting is left to the caller.
pub async fn handle_shutdown(cancel: &CancellationToken, cleanup: &CleanupCoordinator) {
    info!("Shutting down, cancelling in-flight work");
    cancel.cancel();
    cleanup.run().await;
}

/// Spawns the listener that shuts the process down on an interrupt
pub fn spawn_signal_listener(
    cancel: CancellationToken,
    cleanup: Arc<CleanupCoordinator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_signal().await;
        handle_shutdown(&cancel, &cleanup).await;
        info!("Cleanup complete, exiting");
        std::process::exit(0);
    })
}
