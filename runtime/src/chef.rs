//! The consumer side: turn one delivery into durable state, exactly once.
//!
//! # Per-delivery state machine
//!
//! ```text
//! Received ─► Decoded ─► Deduplicated ─► Processing ─► Committed ─► Acked
//!    │                        │                            │
//!    │ decode error           │ marker exists              │ any store error
//!    ▼                        ▼                            ▼
//! Requeued (or Rejected)    Acked                   rolled back, Requeued
//! ```
//!
//! The completed order and its processed marker are written in one
//! transaction. A delivery is acked only after that transaction commits,
//! or when the marker shows the event was already processed. Everything
//! else is requeued, so a crash at any point is repaired by redelivery.

use crate::metrics::ChefMetrics;
use brigade_core::broker::{BrokerError, Delivery};
use brigade_core::codec::{self, CodecError};
use brigade_core::environment::Clock;
use brigade_core::event::{EventId, OrderEvent};
use brigade_core::ledger::{LedgerTransaction, OrderLedger, StoreError};
use brigade_core::preparation::Preparation;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// What to do with a delivery whose payload cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    /// Put it back on the queue. It will fail again on every redelivery.
    #[default]
    Requeue,
    /// Drop it (nack without requeue).
    Reject,
}

/// How a delivery was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Order and marker committed, delivery acked
    Committed {
        /// The processed event
        event_id: EventId,
        /// The new completed order
        order_id: i64,
    },
    /// Event already processed, delivery acked without writes
    Duplicate {
        /// The processed event
        event_id: EventId,
    },
    /// Nacked with requeue
    Requeued {
        /// Why processing failed
        reason: String,
    },
    /// Nacked without requeue
    Rejected {
        /// Why the delivery was dropped
        reason: String,
    },
}

impl Outcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Committed { .. } => "committed",
            Self::Duplicate { .. } => "duplicate",
            Self::Requeued { .. } => "requeued",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Internal processing failures.
#[derive(Error, Debug)]
enum ChefError {
    #[error("Failed to decode delivery: {0}")]
    Decode(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

enum Processed {
    Committed(i64),
    AlreadyProcessed,
}

/// Consumer: deduplicates, prepares and records orders.
pub struct Chef<L> {
    ledger: L,
    preparation: Arc<dyn Preparation>,
    clock: Arc<dyn Clock>,
    decode_failure: DecodeFailurePolicy,
}

impl<L: OrderLedger> Chef<L> {
    /// Create a chef that requeues undecodable deliveries.
    #[must_use]
    pub fn new(ledger: L, preparation: Arc<dyn Preparation>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            preparation,
            clock,
            decode_failure: DecodeFailurePolicy::default(),
        }
    }

    /// Choose what happens to undecodable deliveries.
    #[must_use]
    pub fn with_decode_failure_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.decode_failure = policy;
        self
    }

    /// Handle one delivery to completion and settle it.
    ///
    /// Never fails: every error is turned into a nack and reported in the
    /// returned [`Outcome`].
    pub async fn handle(&self, delivery: Delivery) -> Outcome {
        let started = Instant::now();
        let delivery_tag = delivery.delivery_tag();
        let redelivered = delivery.redelivered();

        let event = match codec::decode(delivery.payload()) {
            Ok(event) => event,
            Err(err) => {
                let requeue = self.decode_failure == DecodeFailurePolicy::Requeue;
                tracing::warn!(
                    delivery_tag,
                    redelivered,
                    requeue,
                    error = %err,
                    "Undecodable delivery"
                );
                settle(delivery_tag, delivery.nack(requeue).await);
                let reason = ChefError::from(err).to_string();
                let outcome = if requeue {
                    Outcome::Requeued { reason }
                } else {
                    Outcome::Rejected { reason }
                };
                ChefMetrics::record_delivery(outcome.label(), started.elapsed());
                return outcome;
            }
        };

        let outcome = match self.process(&event).await {
            Ok(Processed::Committed(order_id)) => {
                settle(delivery_tag, delivery.ack().await);
                tracing::info!(
                    event_id = %event.event_id,
                    event_type = event.event_type.as_str(),
                    order_id,
                    table_number = %event.order.table_number(),
                    delivery_tag,
                    "Order completed"
                );
                Outcome::Committed {
                    event_id: event.event_id,
                    order_id,
                }
            }
            Ok(Processed::AlreadyProcessed)
            | Err(ChefError::Store(StoreError::DuplicateEvent(_))) => {
                settle(delivery_tag, delivery.ack().await);
                tracing::info!(
                    event_id = %event.event_id,
                    delivery_tag,
                    redelivered,
                    "Duplicate delivery acknowledged"
                );
                Outcome::Duplicate {
                    event_id: event.event_id,
                }
            }
            Err(err) => {
                settle(delivery_tag, delivery.nack(true).await);
                tracing::warn!(
                    event_id = %event.event_id,
                    delivery_tag,
                    error = %err,
                    "Processing failed, delivery requeued"
                );
                Outcome::Requeued {
                    reason: err.to_string(),
                }
            }
        };

        ChefMetrics::record_delivery(outcome.label(), started.elapsed());
        outcome
    }

    async fn process(&self, event: &OrderEvent) -> Result<Processed, ChefError> {
        if self.ledger.is_processed(&event.event_id).await? {
            return Ok(Processed::AlreadyProcessed);
        }

        self.preparation.prepare(&event.order).await;

        let mut tx = self.ledger.begin().await?;
        match self.write(&mut tx, event).await {
            Ok(order_id) => {
                tx.commit().await?;
                Ok(Processed::Committed(order_id))
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        event_id = %event.event_id,
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                Err(err.into())
            }
        }
    }

    async fn write(&self, tx: &mut L::Transaction, event: &OrderEvent) -> Result<i64, StoreError> {
        let order_id = tx
            .insert_completed_order(&event.order, event.created_at)
            .await?;
        tx.insert_processed_marker(&event.event_id, self.clock.now(), order_id)
            .await?;
        Ok(order_id)
    }
}

/// A failed ack or nack leaves the delivery unsettled; the broker redelivers
/// it once the channel closes and the ledger absorbs the duplicate.
fn settle(delivery_tag: u64, result: Result<(), BrokerError>) {
    if let Err(err) = result {
        tracing::error!(delivery_tag, error = %err, "Failed to settle delivery");
    }
}

impl<L> std::fmt::Debug for Chef<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chef")
            .field("decode_failure", &self.decode_failure)
            .finish_non_exhaustive()
    }
}
