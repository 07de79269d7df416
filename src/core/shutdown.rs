use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Resolves on SIGINT or, on unix, SIGTERM.
pub async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => log::info!("Received SIGINT"),
                    _ = terminate.recv() => log::info!("Received SIGTERM"),
                }
                return;
            }
            Err(err) => log::warn!("Cannot listen for SIGTERM - {err}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received SIGINT"),
        Err(err) => {
            log::warn!("Cannot listen for SIGINT - {err}");
            futures::future::pending::<()>().await;
        }
    }
}

/// Cancels `shutdown` once `signal` resolves.
pub async fn cancel_on(signal: impl Future<Output = ()>, shutdown: CancellationToken) {
    signal.await;
    log::info!("Shutdown requested, cancelling in-flight reconciliations");
    shutdown.cancel();
}
