//! # Brigade Testing
//!
//! Test doubles for the Brigade order pipeline.
//!
//! This crate provides:
//! - [`InMemoryBroker`]: queues with ack, nack and requeue
//! - [`InMemoryOrderStore`]: transactional ledger with fault injection
//! - [`StaticMenu`]: price lookup and menu catalog
//! - Mock environment: fixed clock, instant and counting preparation
//! - Helpers and proptest strategies for orders
//!
//! ## Example
//!
//! ```ignore
//! use brigade_testing::{InMemoryBroker, InMemoryOrderStore, StaticMenu, test_clock};
//!
//! #[tokio::test]
//! async fn order_reaches_the_ledger() {
//!     let broker = InMemoryBroker::new();
//!     let store = InMemoryOrderStore::new();
//!     let menu = StaticMenu::new().with_item(1, "Ramen", 500);
//!     // build a Waiter and a Chef over these doubles...
//! }
//! ```

pub mod broker;
pub mod ledger;
pub mod menu;

use chrono::{DateTime, Utc};
use brigade_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use brigade_core::order::Order;
    use brigade_core::preparation::Preparation;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use brigade_testing::mocks::FixedClock;
    /// use brigade_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Preparation that completes immediately.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct InstantPreparation;

    impl Preparation for InstantPreparation {
        fn prepare<'a>(&'a self, _order: &'a Order) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async {})
        }
    }

    /// Instant preparation that counts how many orders it prepared.
    #[derive(Debug, Default)]
    pub struct CountingPreparation {
        prepared: AtomicUsize,
    }

    impl CountingPreparation {
        /// Create a counter at zero.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Orders prepared so far.
        #[must_use]
        pub fn prepared(&self) -> usize {
            self.prepared.load(Ordering::SeqCst)
        }
    }

    impl Preparation for CountingPreparation {
        fn prepare<'a>(&'a self, _order: &'a Order) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            self.prepared.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }
}

/// Order builders.
pub mod helpers {
    use brigade_core::event::{EventId, EventType, OrderEvent};
    use brigade_core::order::{Money, Order, OrderRequest, ValidationError};
    use chrono::{DateTime, Utc};

    /// JSON body of an order request: `lines` are `(menu_item_id, quantity)`.
    #[must_use]
    pub fn order_body(table: u32, lines: &[(u32, u32)]) -> Vec<u8> {
        let items: Vec<serde_json::Value> = lines
            .iter()
            .map(|(id, qty)| serde_json::json!({ "menu_item_id": id, "quantity": qty }))
            .collect();
        serde_json::json!({ "table_number": table, "items": items })
            .to_string()
            .into_bytes()
    }

    /// A priced order: `lines` are `(menu_item_id, quantity, unit_price_cents)`.
    ///
    /// # Errors
    ///
    /// Returns the validation error for invalid input (zero table, no lines, ...).
    pub fn priced_order(table: u32, lines: &[(u32, u32, u64)]) -> Result<Order, ValidationError> {
        let pairs: Vec<(u32, u32)> = lines.iter().map(|(id, qty, _)| (*id, *qty)).collect();
        let prices: Vec<Money> = lines.iter().map(|(_, _, p)| Money::from_cents(*p)).collect();
        OrderRequest::from_json(&order_body(table, &pairs))?
            .validate()?
            .into_priced(&prices)
    }

    /// An `OrderCreated` event with a fixed identifier.
    #[must_use]
    pub fn order_event(event_id: &str, order: Order, created_at: DateTime<Utc>) -> OrderEvent {
        OrderEvent {
            event_id: EventId::new(event_id),
            event_type: EventType::OrderCreated,
            created_at,
            order,
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Order lines as `(menu_item_id, quantity, unit_price_cents)`, 1 to 10 lines.
    pub fn order_lines() -> impl Strategy<Value = Vec<(u32, u32, u64)>> {
        prop::collection::vec((1u32..100, 1u32..20, 0u64..10_000), 1..10)
    }

    /// A table number.
    pub fn table_number() -> impl Strategy<Value = u32> {
        1u32..200
    }
}

// Re-export commonly used items
pub use broker::{BrokerStats, InMemoryBroker};
pub use ledger::{InMemoryOrderStore, InMemoryTransaction};
pub use menu::StaticMenu;
pub use mocks::{CountingPreparation, FixedClock, InstantPreparation, test_clock};
