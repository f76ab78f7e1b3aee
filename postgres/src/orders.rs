//! Completed orders and the processed-event ledger.

use crate::{is_unique_violation, store_error};
use brigade_core::event::EventId;
use brigade_core::ledger::{
    CompletedOrder, LedgerTransaction, OrderLedger, OrderQueries, QueryFuture, StoreError,
};
use brigade_core::order::{LineItem, Money, Order, TableNumber};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

/// Ledger and read side backed by `PostgreSQL`.
///
/// Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_unpaid(&self, table: TableNumber) -> Result<Vec<CompletedOrder>, StoreError> {
        let rows: Vec<CompletedOrderRow> = sqlx::query_as(
            "SELECT id, order_date, table_number, items, subtotal, paid
             FROM completed_orders
             WHERE table_number = $1 AND paid = FALSE
             ORDER BY id",
        )
        .bind(table_column(table)?)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(CompletedOrder::try_from).collect()
    }

    async fn update_paid(&self, table: TableNumber) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE completed_orders SET paid = TRUE WHERE table_number = $1 AND paid = FALSE",
        )
        .bind(table_column(table)?)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        tracing::info!(
            table_number = %table,
            orders_paid = result.rows_affected(),
            "Table marked paid"
        );
        Ok(result.rows_affected())
    }
}

impl OrderLedger for PostgresOrderStore {
    type Transaction = PostgresTransaction;

    async fn is_processed(&self, event_id: &EventId) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(event_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(exists)
    }

    async fn begin(&self) -> Result<PostgresTransaction, StoreError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(PostgresTransaction { tx })
    }
}

impl OrderQueries for PostgresOrderStore {
    fn list_unpaid(&self, table: TableNumber) -> QueryFuture<'_, Vec<CompletedOrder>> {
        Box::pin(self.fetch_unpaid(table))
    }

    fn mark_paid(&self, table: TableNumber) -> QueryFuture<'_, u64> {
        Box::pin(self.update_paid(table))
    }
}

/// An open database transaction.
///
/// Dropping it without [`LedgerTransaction::commit`] rolls it back.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl LedgerTransaction for PostgresTransaction {
    async fn insert_completed_order(
        &mut self,
        order: &Order,
        order_date: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO completed_orders (order_date, table_number, items, subtotal)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(order_date)
        .bind(table_column(order.table_number())?)
        .bind(Json(order.items()))
        .bind(money_column(order.subtotal())?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(id)
    }

    async fn insert_processed_marker(
        &mut self,
        event_id: &EventId,
        processed_at: DateTime<Utc>,
        order_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO processed_events (event_id, processed_at, order_id) VALUES ($1, $2, $3)",
        )
        .bind(event_id.as_str())
        .bind(processed_at)
        .bind(order_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEvent(event_id.clone())
            } else {
                store_error(e)
            }
        })?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Database(format!("Commit conflict: {e}"))
            } else {
                store_error(e)
            }
        })
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_error)
    }
}

#[derive(Debug, FromRow)]
struct CompletedOrderRow {
    id: i64,
    order_date: DateTime<Utc>,
    table_number: i32,
    items: Json<Vec<LineItem>>,
    subtotal: i64,
    paid: bool,
}

impl TryFrom<CompletedOrderRow> for CompletedOrder {
    type Error = StoreError;

    fn try_from(row: CompletedOrderRow) -> Result<Self, Self::Error> {
        let table_number = u32::try_from(row.table_number)
            .ok()
            .and_then(TableNumber::new)
            .ok_or_else(|| StoreError::Corrupt(format!("order {}: table {}", row.id, row.table_number)))?;
        let subtotal = u64::try_from(row.subtotal)
            .map(Money::from_cents)
            .map_err(|_| StoreError::Corrupt(format!("order {}: subtotal {}", row.id, row.subtotal)))?;

        Ok(Self {
            id: row.id,
            order_date: row.order_date,
            table_number,
            items: row.items.0,
            subtotal,
            paid: row.paid,
        })
    }
}

fn table_column(table: TableNumber) -> Result<i32, StoreError> {
    i32::try_from(table.get())
        .map_err(|_| StoreError::Serialization(format!("table number {table} out of range")))
}

pub(crate) fn money_column(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Serialization(format!("amount {amount} out of range")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use brigade_core::order::{MAX_ID, MenuItemId, Quantity};

    fn row(table_number: i32, subtotal: i64) -> CompletedOrderRow {
        CompletedOrderRow {
            id: 7,
            order_date: Utc::now(),
            table_number,
            items: Json(vec![LineItem {
                menu_item_id: MenuItemId::new(1).unwrap(),
                quantity: Quantity::new(2).unwrap(),
            }]),
            subtotal,
            paid: false,
        }
    }

    #[test]
    fn row_maps_to_completed_order() {
        let order = CompletedOrder::try_from(row(4, 1300)).unwrap();
        assert_eq!(order.table_number.get(), 4);
        assert_eq!(order.subtotal, Money::from_cents(1300));
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn corrupt_rows_are_reported() {
        assert!(matches!(CompletedOrder::try_from(row(0, 1)), Err(StoreError::Corrupt(_))));
        assert!(matches!(CompletedOrder::try_from(row(1, -5)), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn largest_values_fit_their_columns() {
        assert_eq!(money_column(Money::from_cents(u64::MAX)).unwrap(), i64::MAX);
        assert_eq!(money_column(Money::from_cents(42)).unwrap(), 42);
        assert_eq!(
            table_column(TableNumber::new(MAX_ID).unwrap()).unwrap(),
            i32::MAX
        );
    }
}
