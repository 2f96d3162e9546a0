use std::future;

use tokio::signal;

/// Resolves on Ctrl+C or SIGTERM so in-flight backend calls can finish.
pub(crate) async fn shutdown_signal() {
    let received = tokio::select! {
        _ = ctrl_c() => "ctrl_c",
        _ = terminate() => "sigterm",
    };

    tracing::info!(signal = received, "Shutdown signal received; draining connections");
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    future::pending::<()>().await;
}
