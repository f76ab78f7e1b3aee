//! Process lifecycle: shutdown signals and draining background tasks.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed, that signal is ignored and the other
/// one still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
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
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}

/// Wait up to `timeout` for a background task to finish.
///
/// Returns `true` if it stopped cleanly.
pub async fn drain(name: &str, handle: JoinHandle<()>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => {
            info!(task = name, "Task stopped gracefully");
            true
        }
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "Task failed");
            false
        }
        Err(_) => {
            warn!(task = name, timeout_ms = timeout.as_millis(), "Task shutdown timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finished_task_drains() {
        let handle = tokio::spawn(async {});
        assert!(drain("noop", handle, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_times_out() {
        let handle = tokio::spawn(std::future::pending::<()>());
        assert!(!drain("stuck", handle, Duration::from_secs(1)).await);
    }
}
