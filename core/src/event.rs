//! The order event envelope.
//!
//! An [`OrderEvent`] wraps an [`Order`] for transport. Its [`EventId`] is
//! assigned once, when the waiter publishes, and travels unchanged through
//! every redelivery. The chef's dedup ledger is keyed on it.

use crate::order::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, globally unique identifier of one publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty identifier never identifies a publication.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event type tag.
///
/// Tags carry a version suffix so the payload schema can evolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A new order was taken at a table.
    #[serde(rename = "OrderCreated.v1")]
    OrderCreated,
}

impl EventType {
    /// Stable wire name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "OrderCreated.v1",
        }
    }
}

/// Envelope published to the order queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Unique per publication, reused on redelivery
    pub event_id: EventId,
    /// What happened
    pub event_type: EventType,
    /// When the waiter built the event
    pub created_at: DateTime<Utc>,
    /// The priced order
    pub order: Order,
}

impl OrderEvent {
    /// Build an `OrderCreated` event with a freshly generated identifier.
    #[must_use]
    pub fn order_created(order: Order, created_at: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::generate(),
            event_type: EventType::OrderCreated,
            created_at,
            order,
        }
    }
}
