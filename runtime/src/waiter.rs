//! The producer side: take an order, price it, publish it.
//!
//! [`Waiter::submit`] returns as soon as the broker has accepted the event.
//! It never waits for the chef. Publishing is attempted once per call; a
//! failed or timed-out publish leaves no trace anywhere.

use crate::metrics::WaiterMetrics;
use brigade_core::broker::{Broker, BrokerError};
use brigade_core::codec::{self, CodecError};
use brigade_core::environment::Clock;
use brigade_core::event::{EventId, OrderEvent};
use brigade_core::menu::{PriceLookup, PriceLookupError};
use brigade_core::order::{Order, OrderRequest, ValidationError};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default queue name.
pub const DEFAULT_QUEUE: &str = "orders";

/// Default publish deadline.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an order was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The request is not a valid order
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A line could not be priced
    #[error(transparent)]
    PriceLookup(#[from] PriceLookupError),

    /// The event could not be encoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The broker did not accept the event
    #[error(transparent)]
    Publish(#[from] BrokerError),
}

impl SubmitError {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::PriceLookup(PriceLookupError::NotFound(_) | PriceLookupError::Unavailable(_)) => {
                "unknown_item"
            }
            Self::PriceLookup(PriceLookupError::Storage(_)) => "price_lookup",
            Self::Codec(_) => "codec",
            Self::Publish(_) => "publish",
        }
    }

    /// Whether the caller sent something wrong (as opposed to a downstream failure).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::PriceLookup(PriceLookupError::NotFound(_) | PriceLookupError::Unavailable(_))
        )
    }
}

/// Acknowledgement returned to the caller once the event is on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAccepted {
    /// Identifier of the published event
    pub event_id: EventId,
    /// The priced order, echoed back
    #[serde(flatten)]
    pub order: Order,
}

/// Producer: validates, prices and publishes orders.
pub struct Waiter {
    broker: Arc<dyn Broker>,
    prices: Arc<dyn PriceLookup>,
    clock: Arc<dyn Clock>,
    queue: String,
    publish_timeout: Duration,
}

impl Waiter {
    /// Create a waiter publishing to [`DEFAULT_QUEUE`] with [`DEFAULT_PUBLISH_TIMEOUT`].
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, prices: Arc<dyn PriceLookup>, clock: Arc<dyn Clock>) -> Self {
        Self {
            broker,
            prices,
            clock,
            queue: DEFAULT_QUEUE.to_string(),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Publish to a different queue.
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Use a different publish deadline.
    #[must_use]
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Queue this waiter publishes to.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Take an order from a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] if the body is invalid, an item cannot be
    /// priced, or the broker does not accept the event in time.
    pub async fn submit(&self, body: &[u8]) -> Result<OrderAccepted, SubmitError> {
        match self.take_order(body).await {
            Ok(accepted) => {
                WaiterMetrics::record_accepted();
                tracing::info!(
                    event_id = %accepted.event_id,
                    table_number = %accepted.order.table_number(),
                    subtotal = %accepted.order.subtotal(),
                    "Order published"
                );
                Ok(accepted)
            }
            Err(err) => {
                WaiterMetrics::record_rejected(err.reason());
                if err.is_client_error() {
                    tracing::debug!(reason = err.reason(), error = %err, "Order rejected");
                } else {
                    tracing::error!(reason = err.reason(), error = %err, "Order could not be published");
                }
                Err(err)
            }
        }
    }

    async fn take_order(&self, body: &[u8]) -> Result<OrderAccepted, SubmitError> {
        let draft = OrderRequest::from_json(body)?.validate()?;

        let prices = try_join_all(
            draft
                .items()
                .iter()
                .map(|item| self.prices.unit_price(item.menu_item_id)),
        )
        .await?;
        let order = draft.into_priced(&prices)?;

        let event = OrderEvent::order_created(order, self.clock.now());
        let payload = codec::encode(&event)?;

        let started = Instant::now();
        self.broker
            .publish(&self.queue, &payload, self.publish_timeout)
            .await?;
        WaiterMetrics::record_publish(started.elapsed());

        Ok(OrderAccepted {
            event_id: event.event_id,
            order: event.order,
        })
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("queue", &self.queue)
            .field("publish_timeout", &self.publish_timeout)
            .finish_non_exhaustive()
    }
}
