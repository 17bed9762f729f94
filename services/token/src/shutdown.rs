//! Signal handling for graceful shutdown.

use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Await `server`, giving it `drain` to finish once `signalled` resolves.
///
/// Returns `false` if the drain window elapsed before the server stopped.
pub async fn drain_within<S, E>(
    server: S,
    signalled: impl std::future::Future<Output = ()>,
    drain: Duration,
) -> Result<bool, E>
where
    S: std::future::Future<Output = Result<(), E>>,
{
    tokio::pin!(server);
    tokio::pin!(signalled);

    tokio::select! {
        result = &mut server => return result.map(|()| true),
        () = &mut signalled => {}
    }

    match tokio::time::timeout(drain, server).await {
        Ok(result) => result.map(|()| true),
        Err(_) => {
            warn!(?drain, "Shutdown timeout reached, dropping open connections");
            Ok(false)
        }
    }
}
