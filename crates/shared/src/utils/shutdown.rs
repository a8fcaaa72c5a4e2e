use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Waits for Ctrl+C or SIGTERM, then broadcasts shutdown to every subscriber.
pub async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C signal detected, broadcasting shutdown..."),
        _ = terminate => info!("SIGTERM received, broadcasting shutdown..."),
    }

    if let Err(e) = shutdown_tx.send(()) {
        warn!("Failed to send shutdown signal: {e}");
    }
}
