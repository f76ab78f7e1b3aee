//! Tracing and metrics bootstrap shared by both binaries.

use brigade_runtime::metrics::MetricsServer;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_directives`.
pub fn init_tracing(default_directives: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Start the Prometheus exporter when an address is configured.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn init_metrics(address: Option<SocketAddr>) -> anyhow::Result<()> {
    if let Some(address) = address {
        MetricsServer::new(address).start()?;
        tracing::info!(%address, "Metrics exporter listening");
    }
    Ok(())
}
