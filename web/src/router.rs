//! Route table.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

/// Build the waiter's HTTP router.
///
/// # Routes
///
/// - `POST /order` - Place an order
/// - `GET /orders/:table` - Unpaid orders for a table
/// - `POST /orders/:table/pay` - Mark a table's orders paid
/// - `GET /menu`, `POST /menu`, `PATCH /menu/:id` - Menu maintenance
/// - `GET /version`, `GET /health`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/order", post(handlers::submit_order))
        .route("/orders/:table", get(handlers::list_unpaid_orders))
        .route("/orders/:table/pay", post(handlers::pay_table))
        .route("/menu", get(handlers::list_menu).post(handlers::create_menu_item))
        .route("/menu/:id", patch(handlers::update_menu_item))
        .route("/version", get(handlers::version))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
