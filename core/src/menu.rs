//! Menu catalog and price lookup.

use crate::ledger::StoreError;
use crate::order::{MenuItemId, Money};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors raised while pricing an order line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceLookupError {
    /// No such menu item
    #[error("Menu item {0} not found")]
    NotFound(MenuItemId),

    /// The item exists but cannot be ordered right now
    #[error("Menu item {0} is not available")]
    Unavailable(MenuItemId),

    /// The catalog could not be read
    #[error("Price lookup failed: {0}")]
    Storage(String),
}

impl From<StoreError> for PriceLookupError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// A dish on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Catalog identifier
    pub id: MenuItemId,
    /// Display name
    pub name: String,
    /// Unit price in minor units
    pub price: Money,
    /// Whether the kitchen currently serves it
    pub is_available: bool,
}

/// Fields of a menu item without its identifier (create and update payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemDraft {
    /// Display name
    pub name: String,
    /// Unit price in minor units
    pub price: Money,
    /// Whether the kitchen currently serves it
    #[serde(default = "default_available")]
    pub is_available: bool,
}

const fn default_available() -> bool {
    true
}

/// Future returned by menu gateways.
pub type MenuFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Source of unit prices for the waiter.
pub trait PriceLookup: Send + Sync {
    /// Current unit price of an available item.
    ///
    /// # Errors
    ///
    /// Returns [`PriceLookupError::NotFound`] or [`PriceLookupError::Unavailable`]
    /// when the item cannot be ordered.
    fn unit_price(&self, id: MenuItemId) -> MenuFuture<'_, Money, PriceLookupError>;
}

/// Menu maintenance.
pub trait MenuCatalog: Send + Sync {
    /// All items, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog cannot be read.
    fn list_items(&self) -> MenuFuture<'_, Vec<MenuItem>, StoreError>;

    /// Add an item and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn create_item<'a>(&'a self, draft: &'a MenuItemDraft) -> MenuFuture<'a, MenuItemId, StoreError>;

    /// Replace an item's fields. Returns `false` if no such item exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_item<'a>(
        &'a self,
        id: MenuItemId,
        draft: &'a MenuItemDraft,
    ) -> MenuFuture<'a, bool, StoreError>;
}
