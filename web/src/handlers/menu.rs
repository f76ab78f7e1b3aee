//! Menu maintenance.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use brigade_core::menu::{MenuItem, MenuItemDraft};
use brigade_core::order::MenuItemId;

/// All menu items.
///
/// # Errors
///
/// 500 if the catalog cannot be read.
pub async fn list_menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>, AppError> {
    Ok(Json(state.menu.list_items().await?))
}

/// Add a menu item. Responds 201 with the new id.
///
/// # Errors
///
/// 500 if the insert fails.
pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(draft): Json<MenuItemDraft>,
) -> Result<(StatusCode, Json<MenuItemId>), AppError> {
    let id = state.menu.create_item(&draft).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// Replace a menu item's fields.
///
/// # Errors
///
/// 404 if no such item exists, 500 if the update fails.
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(draft): Json<MenuItemDraft>,
) -> Result<Json<MenuItem>, AppError> {
    let id = MenuItemId::new(id).ok_or_else(|| AppError::not_found("Menu item", id))?;
    if !state.menu.update_item(id, &draft).await? {
        return Err(AppError::not_found("Menu item", id));
    }
    tracing::info!(menu_item_id = %id, "Menu item updated");
    Ok(Json(MenuItem {
        id,
        name: draft.name,
        price: draft.price,
        is_available: draft.is_available,
    }))
}
