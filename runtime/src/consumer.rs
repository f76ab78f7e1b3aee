//! Background consume loop with automatic re-consumption.
//!
//! [`OrderConsumer`] owns the subscribe-process-reconnect loop around a
//! [`Chef`]:
//!
//! ```text
//! loop {
//!     consume(queue):
//!         loop {
//!             wait for next delivery OR shutdown
//!             chef.handle(delivery)      // runs to settlement, never cancelled
//!         }
//!     stream ended or consume failed:
//!         wait retry_delay, then consume again
//! }
//! ```
//!
//! Deliveries are handled strictly one at a time. Shutdown is observed only
//! between deliveries, so an in-flight delivery is always settled.

use crate::chef::Chef;
use brigade_core::broker::{Broker, DeliveryStream};
use brigade_core::ledger::OrderLedger;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Default delay before re-consuming after the stream ended or failed.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Why processing of a stream stopped.
enum StreamEnd {
    Shutdown,
    Ended,
}

/// Long-running consumer task for the order queue.
pub struct OrderConsumer<L> {
    queue: String,
    broker: Arc<dyn Broker>,
    chef: Arc<Chef<L>>,
    shutdown: broadcast::Receiver<()>,
    retry_delay: Duration,
}

impl<L: OrderLedger + 'static> OrderConsumer<L> {
    /// Create a consumer with the default retry delay.
    #[must_use]
    pub fn new(
        queue: impl Into<String>,
        broker: Arc<dyn Broker>,
        chef: Arc<Chef<L>>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            queue: queue.into(),
            broker,
            chef,
            shutdown,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set custom retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Spawn the consumer as a background task.
    ///
    /// The task runs until the shutdown signal fires.
    #[must_use]
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the consume loop on the current task until shutdown.
    pub async fn run(&mut self) {
        info!(queue = %self.queue, "Order consumer started");

        loop {
            let consumed = tokio::select! {
                _ = self.shutdown.recv() => break,
                consumed = self.broker.consume(&self.queue) => consumed,
            };

            match consumed {
                Ok(mut stream) => {
                    info!(queue = %self.queue, "Consuming");
                    if let StreamEnd::Shutdown = self.process_stream(&mut stream).await {
                        break;
                    }
                    warn!(
                        queue = %self.queue,
                        retry_delay_ms = self.retry_delay.as_millis(),
                        "Delivery stream ended, re-consuming"
                    );
                }
                Err(e) => {
                    error!(
                        queue = %self.queue,
                        error = %e,
                        retry_delay_ms = self.retry_delay.as_millis(),
                        "Failed to consume, retrying"
                    );
                }
            }

            tokio::select! {
                _ = self.shutdown.recv() => break,
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }

        info!(queue = %self.queue, "Order consumer stopped");
    }

    async fn process_stream(&mut self, stream: &mut DeliveryStream) -> StreamEnd {
        loop {
            let next = tokio::select! {
                _ = self.shutdown.recv() => return StreamEnd::Shutdown,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(delivery)) => {
                    let outcome = self.chef.handle(delivery).await;
                    tracing::debug!(queue = %self.queue, outcome = outcome.label(), "Delivery settled");
                }
                Some(Err(e)) => {
                    error!(queue = %self.queue, error = %e, "Error receiving delivery");
                    return StreamEnd::Ended;
                }
                None => return StreamEnd::Ended,
            }
        }
    }
}

impl<L> std::fmt::Debug for OrderConsumer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderConsumer")
            .field("queue", &self.queue)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
