//! In-memory order ledger with transactional buffering and fault injection.
//!
//! Transactions buffer their writes and apply them on commit under a single
//! lock, so readers never observe a half-written unit. Identifiers are
//! allocated eagerly, like a database sequence: a rolled-back insert still
//! consumes its id.

use brigade_core::event::EventId;
use brigade_core::ledger::{
    CompletedOrder, LedgerTransaction, OrderLedger, OrderQueries, ProcessedEventMarker,
    QueryFuture, StoreError,
};
use brigade_core::order::{Order, TableNumber};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LedgerState {
    orders: Vec<CompletedOrder>,
    markers: HashMap<EventId, ProcessedEventMarker>,
    next_id: i64,
    commits: u64,
}

#[derive(Debug, Default)]
struct Faults {
    fail_begin: AtomicBool,
    fail_marker_insert: AtomicBool,
    fail_commit: AtomicBool,
}

/// In-memory implementation of the ledger and its read side.
///
/// Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<LedgerState>>,
    faults: Arc<Faults>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `begin` fail.
    pub fn fail_begin(&self, fail: bool) {
        self.faults.fail_begin.store(fail, Ordering::SeqCst);
    }

    /// Make marker inserts fail after the order insert succeeded.
    pub fn fail_marker_insert(&self, fail: bool) {
        self.faults.fail_marker_insert.store(fail, Ordering::SeqCst);
    }

    /// Make commits fail.
    pub fn fail_commit(&self, fail: bool) {
        self.faults.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// All committed orders, in id order.
    #[must_use]
    pub fn completed_orders(&self) -> Vec<CompletedOrder> {
        self.lock().orders.clone()
    }

    /// All committed markers.
    #[must_use]
    pub fn markers(&self) -> Vec<ProcessedEventMarker> {
        self.lock().markers.values().cloned().collect()
    }

    /// Number of successful commits.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.lock().commits
    }
}

impl OrderLedger for InMemoryOrderStore {
    type Transaction = InMemoryTransaction;

    async fn is_processed(&self, event_id: &EventId) -> Result<bool, StoreError> {
        Ok(self.lock().markers.contains_key(event_id))
    }

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        if self.faults.fail_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("injected begin failure".to_string()));
        }
        Ok(InMemoryTransaction {
            store: self.clone(),
            orders: Vec::new(),
            markers: Vec::new(),
        })
    }
}

/// Buffered unit of work over [`InMemoryOrderStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: InMemoryOrderStore,
    orders: Vec<CompletedOrder>,
    markers: Vec<ProcessedEventMarker>,
}

impl LedgerTransaction for InMemoryTransaction {
    async fn insert_completed_order(
        &mut self,
        order: &Order,
        order_date: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let id = {
            let mut state = self.store.lock();
            state.next_id += 1;
            state.next_id
        };
        self.orders.push(CompletedOrder {
            id,
            order_date,
            table_number: order.table_number(),
            items: order.items().to_vec(),
            subtotal: order.subtotal(),
            paid: false,
        });
        Ok(id)
    }

    async fn insert_processed_marker(
        &mut self,
        event_id: &EventId,
        processed_at: DateTime<Utc>,
        order_id: i64,
    ) -> Result<(), StoreError> {
        if self.store.faults.fail_marker_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected marker failure".to_string()));
        }
        let duplicate = self.markers.iter().any(|m| &m.event_id == event_id)
            || self.store.lock().markers.contains_key(event_id);
        if duplicate {
            return Err(StoreError::DuplicateEvent(event_id.clone()));
        }
        self.markers.push(ProcessedEventMarker {
            event_id: event_id.clone(),
            processed_at,
            order_id,
        });
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.store.faults.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected commit failure".to_string()));
        }
        let mut state = self.store.lock();
        if let Some(marker) = self
            .markers
            .iter()
            .find(|m| state.markers.contains_key(&m.event_id))
        {
            return Err(StoreError::DuplicateEvent(marker.event_id.clone()));
        }
        state.orders.extend(self.orders);
        for marker in self.markers {
            state.markers.insert(marker.event_id.clone(), marker);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl OrderQueries for InMemoryOrderStore {
    fn list_unpaid(&self, table: TableNumber) -> QueryFuture<'_, Vec<CompletedOrder>> {
        let orders = self
            .lock()
            .orders
            .iter()
            .filter(|o| o.table_number == table && !o.paid)
            .cloned()
            .collect();
        Box::pin(async move { Ok(orders) })
    }

    fn mark_paid(&self, table: TableNumber) -> QueryFuture<'_, u64> {
        let mut changed = 0;
        for order in &mut self.lock().orders {
            if order.table_number == table && !order.paid {
                order.paid = true;
                changed += 1;
            }
        }
        Box::pin(async move { Ok(changed) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brigade_core::order::{Money, OrderRequest};

    fn order(table: u32) -> Order {
        let body = format!(r#"{{"table_number":{table},"items":[{{"menu_item_id":1,"quantity":1}}]}}"#);
        OrderRequest::from_json(body.as_bytes())
            .and_then(OrderRequest::validate)
            .and_then(|d| d.into_priced(&[Money::from_cents(250)]))
            .unwrap()
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryOrderStore::new();
        let id = EventId::new("e1");

        let mut tx = store.begin().await.unwrap();
        let order_id = tx.insert_completed_order(&order(2), Utc::now()).await.unwrap();
        tx.insert_processed_marker(&id, Utc::now(), order_id).await.unwrap();
        assert!(store.completed_orders().is_empty());
        assert!(!store.is_processed(&id).await.unwrap());

        tx.commit().await.unwrap();
        assert_eq!(store.completed_orders().len(), 1);
        assert!(store.is_processed(&id).await.unwrap());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_completed_order(&order(2), Utc::now()).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.completed_orders().is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn second_marker_for_event_is_a_duplicate() {
        let store = InMemoryOrderStore::new();
        let id = EventId::new("e1");

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        let a = first.insert_completed_order(&order(1), Utc::now()).await.unwrap();
        let b = second.insert_completed_order(&order(1), Utc::now()).await.unwrap();
        first.insert_processed_marker(&id, Utc::now(), a).await.unwrap();
        second.insert_processed_marker(&id, Utc::now(), b).await.unwrap();
        first.commit().await.unwrap();

        assert_eq!(second.commit().await, Err(StoreError::DuplicateEvent(id)));
        assert_eq!(store.completed_orders().len(), 1);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let store = InMemoryOrderStore::new();
        for (n, table) in [3, 3, 5].into_iter().enumerate() {
            let mut tx = store.begin().await.unwrap();
            let id = tx.insert_completed_order(&order(table), Utc::now()).await.unwrap();
            tx.insert_processed_marker(&EventId::new(format!("e{n}")), Utc::now(), id)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
        let three = TableNumber::new(3).unwrap();

        assert_eq!(store.mark_paid(three).await.unwrap(), 2);
        assert_eq!(store.mark_paid(three).await.unwrap(), 0);
        assert!(store.list_unpaid(three).await.unwrap().is_empty());
        assert_eq!(store.list_unpaid(TableNumber::new(5).unwrap()).await.unwrap().len(), 1);
    }
}
