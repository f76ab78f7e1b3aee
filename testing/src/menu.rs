//! In-memory menu catalog.

use brigade_core::ledger::StoreError;
use brigade_core::menu::{MenuCatalog, MenuFuture, MenuItem, MenuItemDraft, PriceLookup, PriceLookupError};
use brigade_core::order::{MenuItemId, Money};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Inner {
    items: RwLock<BTreeMap<MenuItemId, MenuItem>>,
    fail_lookups: AtomicBool,
}

/// Menu backed by a map, implementing both [`PriceLookup`] and [`MenuCatalog`].
///
/// Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct StaticMenu {
    inner: Arc<Inner>,
}

impl StaticMenu {
    /// Create an empty menu.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available item (builder style).
    ///
    /// Ids of zero are ignored.
    #[must_use]
    pub fn with_item(self, id: u32, name: &str, cents: u64) -> Self {
        self.put(id, name, cents, true);
        self
    }

    /// Add an item that cannot currently be ordered (builder style).
    #[must_use]
    pub fn with_unavailable_item(self, id: u32, name: &str, cents: u64) -> Self {
        self.put(id, name, cents, false);
        self
    }

    fn put(&self, id: u32, name: &str, cents: u64, is_available: bool) {
        if let Some(id) = MenuItemId::new(id) {
            self.inner
                .items
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(
                    id,
                    MenuItem {
                        id,
                        name: name.to_string(),
                        price: Money::from_cents(cents),
                        is_available,
                    },
                );
        }
    }

    /// Make price lookups fail with a storage error.
    pub fn fail_lookups(&self, fail: bool) {
        self.inner.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

impl PriceLookup for StaticMenu {
    fn unit_price(&self, id: MenuItemId) -> MenuFuture<'_, Money, PriceLookupError> {
        let result = if self.inner.fail_lookups.load(Ordering::SeqCst) {
            Err(PriceLookupError::Storage("injected lookup failure".to_string()))
        } else {
            match self
                .inner
                .items
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&id)
            {
                Some(item) if item.is_available => Ok(item.price),
                Some(_) => Err(PriceLookupError::Unavailable(id)),
                None => Err(PriceLookupError::NotFound(id)),
            }
        };
        Box::pin(async move { result })
    }
}

impl MenuCatalog for StaticMenu {
    fn list_items(&self) -> MenuFuture<'_, Vec<MenuItem>, StoreError> {
        let items = self
            .inner
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        Box::pin(async move { Ok(items) })
    }

    fn create_item<'a>(&'a self, draft: &'a MenuItemDraft) -> MenuFuture<'a, MenuItemId, StoreError> {
        let mut items = self
            .inner
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = items
            .keys()
            .next_back()
            .map_or(1, |id| id.get().saturating_add(1));
        let result = MenuItemId::new(next)
            .ok_or_else(|| StoreError::Database("menu id sequence exhausted".to_string()))
            .map(|id| {
                items.insert(
                    id,
                    MenuItem {
                        id,
                        name: draft.name.clone(),
                        price: draft.price,
                        is_available: draft.is_available,
                    },
                );
                id
            });
        drop(items);
        Box::pin(async move { result })
    }

    fn update_item<'a>(
        &'a self,
        id: MenuItemId,
        draft: &'a MenuItemDraft,
    ) -> MenuFuture<'a, bool, StoreError> {
        let updated = self
            .inner
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
            .map(|item| {
                item.name.clone_from(&draft.name);
                item.price = draft.price;
                item.is_available = draft.is_available;
            })
            .is_some();
        Box::pin(async move { Ok(updated) })
    }
}
