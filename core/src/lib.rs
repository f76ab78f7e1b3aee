//! # Brigade Core
//!
//! Domain types and seams for the Brigade order pipeline.
//!
//! An order travels from the waiter (producer) to the chef (consumer) as an
//! [`OrderEvent`](event::OrderEvent) on a message queue, and ends up as a
//! [`CompletedOrder`](ledger::CompletedOrder) row in the relational store.
//!
//! ```text
//! ┌──────────┐  submit   ┌──────────┐  publish  ┌──────────┐
//! │  Caller  │──────────►│  Waiter  │──────────►│  Broker  │
//! └──────────┘           └──────────┘           └────┬─────┘
//!                                                    │ deliver (at-least-once)
//!                                                    ▼
//! ┌──────────────────┐  one transaction    ┌──────────────────┐
//! │  Order ledger    │◄────────────────────│       Chef       │
//! │ (orders+markers) │                     │ (dedup, ack/nack)│
//! └──────────────────┘                     └──────────────────┘
//! ```
//!
//! This crate holds no I/O. Every external dependency is a trait:
//!
//! - [`broker::Broker`]: publish/consume primitives with explicit ack/nack
//! - [`ledger::OrderLedger`] / [`ledger::LedgerTransaction`]: dedup ledger and
//!   transactional writes used by the chef
//! - [`ledger::OrderQueries`]: read side (unpaid orders, payment marking)
//! - [`menu::PriceLookup`] / [`menu::MenuCatalog`]: menu prices
//! - [`preparation::Preparation`]: the chef's cooking step
//! - [`environment::Clock`]: time

#![forbid(unsafe_code)]

pub mod broker;
pub mod codec;
pub mod event;
pub mod ledger;
pub mod menu;
pub mod order;
pub mod preparation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use broker::{Broker, BrokerError, Delivery};
pub use event::{EventId, EventType, OrderEvent};
pub use ledger::{CompletedOrder, StoreError};
pub use order::{LineItem, MenuItemId, Money, Order, OrderDraft, Quantity, TableNumber};

/// Environment module - injected dependencies that are not domain gateways.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use brigade_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
