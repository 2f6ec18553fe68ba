//! Graceful shutdown utilities

use tracing::{info, warn};

/// Which signal ended the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Wait for Ctrl+C, or SIGTERM on Unix.
///
/// Suitable for `axum::serve(..).with_graceful_shutdown(...)` once mapped to `()`.
pub async fn wait_for_shutdown() -> ShutdownSignal {
    #[cfg(unix)]
    let signal = {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                    _ = term.recv() => ShutdownSignal::Terminate,
                }
            },
            Err(e) => {
                warn!("SIGTERM handler unavailable ({}), only Ctrl+C will stop the service", e);
                let _ = tokio::signal::ctrl_c().await;
                ShutdownSignal::Interrupt
            },
        }
    };

    #[cfg(not(unix))]
    let signal = {
        let _ = tokio::signal::ctrl_c().await;
        ShutdownSignal::Interrupt
    };

    info!("Shutdown signal received: {:?}", signal);
    signal
}
