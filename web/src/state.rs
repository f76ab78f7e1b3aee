//! Application state for Axum handlers.

use brigade_core::ledger::OrderQueries;
use brigade_core::menu::MenuCatalog;
use brigade_runtime::Waiter;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Every field is a process-wide handle acquired once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Validates, prices and publishes new orders
    pub waiter: Arc<Waiter>,
    /// Read side over completed orders
    pub orders: Arc<dyn OrderQueries>,
    /// Menu maintenance
    pub menu: Arc<dyn MenuCatalog>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        waiter: Arc<Waiter>,
        orders: Arc<dyn OrderQueries>,
        menu: Arc<dyn MenuCatalog>,
    ) -> Self {
        Self {
            waiter,
            orders,
            menu,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("queue", &self.waiter.queue())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state.
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
