//! # Brigade Runtime
//!
//! The moving parts of the order pipeline.
//!
//! ## Core Components
//!
//! - **Waiter**: validates, prices and publishes orders ([`waiter::Waiter`])
//! - **Chef**: dedup, preparation and the transactional write per delivery ([`chef::Chef`])
//! - **Order consumer**: the background consume loop around a chef ([`consumer::OrderConsumer`])
//! - **Retry**: bounded startup retries ([`retry::retry_with_backoff`])
//! - **Metrics**: Prometheus exporter and recorders ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use brigade_runtime::{Chef, OrderConsumer, Waiter};
//!
//! let waiter = Waiter::new(broker.clone(), prices, clock.clone());
//! let accepted = waiter.submit(body).await?;
//!
//! let chef = Arc::new(Chef::new(ledger, Arc::new(CookingDelay::default()), clock));
//! let handle = OrderConsumer::new("orders", broker, chef, shutdown_rx).spawn();
//! ```

/// Per-delivery processing
pub mod chef;

/// Reconnecting consume loop
pub mod consumer;

/// Prometheus metrics for observability
pub mod metrics;

/// Cooking delay
pub mod preparation;

/// Retry logic for startup connections
pub mod retry;

/// Order submission
pub mod waiter;

pub use chef::{Chef, DecodeFailurePolicy, Outcome};
pub use consumer::OrderConsumer;
pub use preparation::CookingDelay;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use waiter::{OrderAccepted, SubmitError, Waiter};
