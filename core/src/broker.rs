//! Message broker abstraction.
//!
//! The waiter publishes encoded events to a named queue and the chef consumes
//! them one [`Delivery`] at a time. Delivery is at-least-once: a delivery that
//! is not acknowledged (or is negatively acknowledged with `requeue = true`)
//! comes back, possibly flagged as redelivered.
//!
//! # Acknowledgement
//!
//! Every delivery is settled exactly once. [`Delivery::ack`] and
//! [`Delivery::nack`] consume the delivery, so settling twice does not
//! compile.
//!
//! # Implementations
//!
//! - `InMemoryBroker` (brigade-testing) - in-process queues for tests
//! - `AmqpBroker` (brigade-amqp) - AMQP 0-9-1 (`RabbitMQ`)

use futures::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Could not reach the broker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Declaring a queue failed
    #[error("Queue declare failed for '{queue}': {reason}")]
    QueueDeclareFailed {
        /// The queue name
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// The broker refused the message
    #[error("Publish failed for queue '{queue}': {reason}")]
    PublishFailed {
        /// The queue name
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Publish did not complete within its deadline
    #[error("Publish to queue '{queue}' timed out after {timeout:?}")]
    PublishTimeout {
        /// The queue name
        queue: String,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// Starting a consumer failed
    #[error("Consume failed for queue '{queue}': {reason}")]
    ConsumeFailed {
        /// The queue name
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Ack or nack could not be delivered to the broker
    #[error("Acknowledge failed for delivery {delivery_tag}: {reason}")]
    AcknowledgeFailed {
        /// Broker-assigned delivery tag
        delivery_tag: u64,
        /// The reason for failure
        reason: String,
    },

    /// Network or transport error
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Future returned by broker operations.
pub type BrokerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BrokerError>> + Send + 'a>>;

/// Stream of deliveries from a consumed queue.
///
/// The stream ends when the underlying consumer is cancelled or the
/// connection drops. Callers re-consume to recover.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BrokerError>> + Send>>;

/// Settles a single delivery with the broker.
///
/// Implemented by each broker backend. Callers use [`Delivery::ack`] and
/// [`Delivery::nack`] instead of calling this directly.
pub trait Acknowledger: Send + Sync {
    /// Positive acknowledgement: the broker forgets the message.
    fn ack(&self) -> BrokerFuture<'_, ()>;

    /// Negative acknowledgement. With `requeue` the message will be
    /// delivered again; without it the message is dropped.
    fn nack(&self, requeue: bool) -> BrokerFuture<'_, ()>;
}

/// One message handed to a consumer.
pub struct Delivery {
    payload: Vec<u8>,
    delivery_tag: u64,
    redelivered: bool,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    /// Build a delivery from its parts.
    #[must_use]
    pub fn new(
        payload: Vec<u8>,
        delivery_tag: u64,
        redelivered: bool,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            payload,
            delivery_tag,
            redelivered,
            acker,
        }
    }

    /// Raw message body.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Broker-assigned tag, unique per channel.
    #[must_use]
    pub const fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Whether the broker has delivered this message before.
    #[must_use]
    pub const fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Acknowledge the delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AcknowledgeFailed`] if the broker could not be told.
    pub async fn ack(self) -> Result<(), BrokerError> {
        self.acker.ack().await
    }

    /// Negatively acknowledge the delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AcknowledgeFailed`] if the broker could not be told.
    pub async fn nack(self, requeue: bool) -> Result<(), BrokerError> {
        self.acker.nack(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Publish/consume primitives over named queues.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the broker can be shared as
/// `Arc<dyn Broker>` between the HTTP layer and background tasks.
pub trait Broker: Send + Sync {
    /// Declare a queue, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::QueueDeclareFailed`] if the broker rejects the declaration.
    fn declare_queue<'a>(&'a self, queue: &'a str) -> BrokerFuture<'a, ()>;

    /// Publish one message and wait for the broker to accept it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PublishTimeout`] if the broker does not confirm
    /// within `timeout`, [`BrokerError::PublishFailed`] otherwise.
    fn publish<'a>(
        &'a self,
        queue: &'a str,
        payload: &'a [u8],
        timeout: Duration,
    ) -> BrokerFuture<'a, ()>;

    /// Start consuming a queue with manual acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConsumeFailed`] if the consumer cannot be started.
    fn consume<'a>(&'a self, queue: &'a str) -> BrokerFuture<'a, DeliveryStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU8, Ordering};

    /// Records the last settlement: 1 = ack, 2 = nack(requeue), 3 = nack(drop).
    struct Recorder(Arc<AtomicU8>);

    impl Acknowledger for Recorder {
        fn ack(&self) -> BrokerFuture<'_, ()> {
            self.0.store(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn nack(&self, requeue: bool) -> BrokerFuture<'_, ()> {
            self.0.store(if requeue { 2 } else { 3 }, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn delivery_routes_settlement_to_acknowledger() {
        let state = Arc::new(AtomicU8::new(0));

        let delivery = Delivery::new(b"x".to_vec(), 7, true, Box::new(Recorder(Arc::clone(&state))));
        assert_eq!(delivery.delivery_tag(), 7);
        assert!(delivery.redelivered());
        assert!(delivery.nack(true).await.is_ok());
        assert_eq!(state.load(Ordering::SeqCst), 2);

        let delivery = Delivery::new(b"y".to_vec(), 8, false, Box::new(Recorder(Arc::clone(&state))));
        assert!(delivery.ack().await.is_ok());
        assert_eq!(state.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_hides_payload() {
        let delivery = Delivery::new(vec![0; 16], 1, false, Box::new(Recorder(Arc::new(AtomicU8::new(0)))));
        let rendered = format!("{delivery:?}");
        assert!(rendered.contains("payload_len: 16"));
    }
}
