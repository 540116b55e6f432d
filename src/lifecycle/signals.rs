//! OS signal handling.

/// Resolves on Ctrl-C. If the handler cannot be installed this never
/// resolves and only the console `exit` command stops the server.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
