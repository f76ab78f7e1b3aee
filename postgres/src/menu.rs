//! Menu items table.

use crate::orders::money_column;
use crate::store_error;
use brigade_core::ledger::StoreError;
use brigade_core::menu::{
    MenuCatalog, MenuFuture, MenuItem, MenuItemDraft, PriceLookup, PriceLookupError,
};
use brigade_core::order::{MenuItemId, Money};
use sqlx::{FromRow, PgPool};

/// Menu catalog and price lookup backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PostgresMenu {
    pool: PgPool,
}

impl PostgresMenu {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lookup_price(&self, id: MenuItemId) -> Result<Money, PriceLookupError> {
        let row: Option<(i64, bool)> =
            sqlx::query_as("SELECT price, is_available FROM menu_items WHERE id = $1")
                .bind(id_column(id)?)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;

        match row {
            None => Err(PriceLookupError::NotFound(id)),
            Some((_, false)) => Err(PriceLookupError::Unavailable(id)),
            Some((price, true)) => u64::try_from(price).map(Money::from_cents).map_err(|_| {
                PriceLookupError::Storage(format!("menu item {id}: negative price {price}"))
            }),
        }
    }

    async fn fetch_items(&self) -> Result<Vec<MenuItem>, StoreError> {
        let rows: Vec<MenuItemRow> =
            sqlx::query_as("SELECT id, name, price, is_available FROM menu_items ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
        rows.into_iter().map(MenuItem::try_from).collect()
    }

    async fn insert_item(&self, draft: &MenuItemDraft) -> Result<MenuItemId, StoreError> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO menu_items (name, price, is_available) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&draft.name)
        .bind(money_column(draft.price)?)
        .bind(draft.is_available)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        let id = menu_item_id(id)?;
        tracing::info!(menu_item_id = %id, name = %draft.name, "Menu item created");
        Ok(id)
    }

    async fn replace_item(&self, id: MenuItemId, draft: &MenuItemDraft) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE menu_items SET name = $2, price = $3, is_available = $4 WHERE id = $1",
        )
        .bind(id_column(id)?)
        .bind(&draft.name)
        .bind(money_column(draft.price)?)
        .bind(draft.is_available)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }
}

impl PriceLookup for PostgresMenu {
    fn unit_price(&self, id: MenuItemId) -> MenuFuture<'_, Money, PriceLookupError> {
        Box::pin(self.lookup_price(id))
    }
}

impl MenuCatalog for PostgresMenu {
    fn list_items(&self) -> MenuFuture<'_, Vec<MenuItem>, StoreError> {
        Box::pin(self.fetch_items())
    }

    fn create_item<'a>(&'a self, draft: &'a MenuItemDraft) -> MenuFuture<'a, MenuItemId, StoreError> {
        Box::pin(self.insert_item(draft))
    }

    fn update_item<'a>(
        &'a self,
        id: MenuItemId,
        draft: &'a MenuItemDraft,
    ) -> MenuFuture<'a, bool, StoreError> {
        Box::pin(self.replace_item(id, draft))
    }
}

#[derive(Debug, FromRow)]
struct MenuItemRow {
    id: i32,
    name: String,
    price: i64,
    is_available: bool,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = StoreError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        let price = u64::try_from(row.price)
            .map_err(|_| StoreError::Corrupt(format!("menu item {}: price {}", row.id, row.price)))?;
        Ok(Self {
            id: menu_item_id(row.id)?,
            name: row.name,
            price: Money::from_cents(price),
            is_available: row.is_available,
        })
    }
}

fn id_column(id: MenuItemId) -> Result<i32, StoreError> {
    i32::try_from(id.get())
        .map_err(|_| StoreError::Serialization(format!("menu item id {id} out of range")))
}

fn menu_item_id(raw: i32) -> Result<MenuItemId, StoreError> {
    u32::try_from(raw)
        .ok()
        .and_then(MenuItemId::new)
        .ok_or_else(|| StoreError::Corrupt(format!("menu item id {raw}")))
}
