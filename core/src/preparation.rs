//! The chef's domain work between dedup and commit.
//!
//! Preparation runs inside the per-delivery loop: the next delivery is not
//! handled until the current one is settled, so a slow step throttles the
//! consumer. Production uses a fixed cooking delay; tests use an instant one.

use crate::order::Order;
use std::future::Future;
use std::pin::Pin;

/// Injectable processing step.
pub trait Preparation: Send + Sync {
    /// Prepare an order. Completes when the dish is ready.
    fn prepare<'a>(&'a self, order: &'a Order) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
