//! Production preparation step.

use brigade_core::order::Order;
use brigade_core::preparation::Preparation;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default time the kitchen spends on one order.
pub const DEFAULT_COOKING_TIME: Duration = Duration::from_secs(10);

/// Stands in for real kitchen work with a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct CookingDelay(Duration);

impl CookingDelay {
    /// Cook every order for `duration`.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// The configured delay.
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }
}

impl Default for CookingDelay {
    fn default() -> Self {
        Self(DEFAULT_COOKING_TIME)
    }
}

impl Preparation for CookingDelay {
    fn prepare<'a>(&'a self, order: &'a Order) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(
                table_number = %order.table_number(),
                lines = order.items().len(),
                cooking_ms = self.0.as_millis(),
                "Cooking order"
            );
            tokio::time::sleep(self.0).await;
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brigade_core::order::{Money, OrderRequest};

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_configured_delay() {
        let order = OrderRequest::from_json(br#"{"table_number":1,"items":[{"menu_item_id":1,"quantity":1}]}"#)
            .and_then(OrderRequest::validate)
            .and_then(|d| d.into_priced(&[Money::from_cents(100)]))
            .unwrap();
        let started = tokio::time::Instant::now();

        CookingDelay::new(Duration::from_secs(10)).prepare(&order).await;

        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }
}
