//! Run cancellation on SIGINT / SIGTERM

/// Completes when the user asks the run to stop
#[cfg(unix)]
pub async fn shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Could not install signal handlers, run cannot be interrupted: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, stopping run"),
        _ = sigint.recv() => tracing::info!("Received SIGINT (Ctrl+C), stopping run"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, stopping run"),
        Err(e) => {
            tracing::warn!("Could not listen for Ctrl+C, run cannot be interrupted: {}", e);
            std::future::pending::<()>().await
        }
    }
}
