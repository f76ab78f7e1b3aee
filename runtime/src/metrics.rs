//! Prometheus metrics for the waiter and the chef.
//!
//! Components record through the `metrics` facade. Without an installed
//! recorder (tests, or no `METRICS_PORT`), recording is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use brigade_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter with its own HTTP listener.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Install the recorder and start serving `/metrics`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        builder
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "waiter_orders_accepted_total",
        "Orders published to the queue"
    );
    describe_counter!(
        "waiter_orders_rejected_total",
        "Orders refused, labelled by reason"
    );
    describe_histogram!(
        "waiter_publish_duration_seconds",
        "Time for the broker to accept a publish"
    );
    describe_counter!(
        "chef_deliveries_total",
        "Deliveries settled, labelled by outcome"
    );
    describe_histogram!(
        "chef_delivery_duration_seconds",
        "Time from receipt to settlement of a delivery"
    );
}

/// Waiter metrics recorder.
pub struct WaiterMetrics;

impl WaiterMetrics {
    /// Record an accepted order.
    pub fn record_accepted() {
        counter!("waiter_orders_accepted_total").increment(1);
    }

    /// Record a refused order.
    pub fn record_rejected(reason: &'static str) {
        counter!("waiter_orders_rejected_total", "reason" => reason).increment(1);
    }

    /// Record how long the broker took to accept a publish.
    pub fn record_publish(duration: Duration) {
        histogram!("waiter_publish_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Chef metrics recorder.
pub struct ChefMetrics;

impl ChefMetrics {
    /// Record a settled delivery.
    pub fn record_delivery(outcome: &'static str, duration: Duration) {
        counter!("chef_deliveries_total", "outcome" => outcome).increment(1);
        histogram!("chef_delivery_duration_seconds").record(duration.as_secs_f64());
    }
}
