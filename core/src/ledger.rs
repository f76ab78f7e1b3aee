//! Order ledger: completed orders and the processed-event dedup ledger.
//!
//! The chef writes through [`OrderLedger`] and [`LedgerTransaction`]. A
//! completed order and the marker recording its event are always written in
//! the same transaction, so after any crash either both exist or neither does.
//!
//! The HTTP layer reads and updates completed orders through [`OrderQueries`].

use crate::event::EventId;
use crate::order::{LineItem, Money, Order, TableNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not reach the database
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A statement or commit failed
    #[error("Database error: {0}")]
    Database(String),

    /// A marker for this event already exists (another consumer won the race)
    #[error("Event already processed: {0}")]
    DuplicateEvent(EventId),

    /// Line items could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored row could not be mapped back to domain types
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// An order the chef has finished preparing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedOrder {
    /// Store-assigned identifier
    pub id: i64,
    /// When the order was taken
    pub order_date: DateTime<Utc>,
    /// Table the order belongs to
    pub table_number: TableNumber,
    /// Line items as ordered
    pub items: Vec<LineItem>,
    /// Priced subtotal in minor units
    pub subtotal: Money,
    /// Whether the table has settled this order
    pub paid: bool,
}

/// Dedup ledger entry: this event has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEventMarker {
    /// The processed event
    pub event_id: EventId,
    /// When its transaction committed
    pub processed_at: DateTime<Utc>,
    /// The completed order it produced
    pub order_id: i64,
}

/// Write side used by the chef.
pub trait OrderLedger: Send + Sync {
    /// Transaction handle returned by [`Self::begin`].
    type Transaction: LedgerTransaction;

    /// Whether a processed marker exists for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    fn is_processed(&self, event_id: &EventId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;
}

/// A unit of work over the ledger.
///
/// Writes are invisible to readers until [`Self::commit`] succeeds. Dropping
/// a transaction without committing discards its writes.
pub trait LedgerTransaction: Send {
    /// Insert a completed order (unpaid) and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_completed_order(
        &mut self,
        order: &Order,
        order_date: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Insert the processed marker for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEvent`] if a marker already exists.
    fn insert_processed_marker(
        &mut self,
        event_id: &EventId,
        processed_at: DateTime<Utc>,
        order_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Make all writes of this transaction durable and visible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is written then.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard all writes of this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback could not be sent.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Future returned by [`OrderQueries`].
pub type QueryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Read side and payment marking used by the HTTP layer.
///
/// Boxed futures keep the trait usable as `Arc<dyn OrderQueries>`.
pub trait OrderQueries: Send + Sync {
    /// Unpaid completed orders for a table, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn list_unpaid(&self, table: TableNumber) -> QueryFuture<'_, Vec<CompletedOrder>>;

    /// Mark every unpaid order of a table as paid and return how many changed.
    ///
    /// Idempotent: a second call returns `0`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_paid(&self, table: TableNumber) -> QueryFuture<'_, u64>;
}
