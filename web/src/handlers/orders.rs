//! Order capture and the table's bill.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use brigade_core::ledger::CompletedOrder;
use brigade_core::order::TableNumber;
use brigade_runtime::OrderAccepted;
use serde::{Deserialize, Serialize};

/// Body of `POST /orders/{table}/pay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Table that paid
    pub table_number: TableNumber,
    /// Orders flipped to paid by this call (0 when already settled)
    pub orders_paid: u64,
}

/// Place an order.
///
/// Returns as soon as the event is on the queue; the chef completes it
/// asynchronously.
///
/// # Endpoint
///
/// ```text
/// POST /order
/// Content-Type: application/json
///
/// { "table_number": 4, "items": [{ "menu_item_id": 1, "quantity": 2 }] }
/// ```
///
/// # Status Codes
///
/// - 202 Accepted: priced order echoed with its event id
/// - 400 Bad Request: malformed body or an item that cannot be ordered
/// - 500 Internal Server Error: price lookup or broker failure
///
/// # Errors
///
/// See status codes.
pub async fn submit_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<OrderAccepted>), AppError> {
    let accepted = state.waiter.submit(&body).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Unpaid completed orders for a table, oldest first.
///
/// # Endpoint
///
/// ```text
/// GET /orders/{table}
/// ```
///
/// # Errors
///
/// 400 for a non-positive table, 500 if the store fails.
pub async fn list_unpaid_orders(
    State(state): State<AppState>,
    Path(table): Path<u32>,
) -> Result<Json<Vec<CompletedOrder>>, AppError> {
    let table = parse_table(table)?;
    let orders = state.orders.list_unpaid(table).await?;
    Ok(Json(orders))
}

/// Mark every unpaid order of a table as paid. Idempotent.
///
/// # Endpoint
///
/// ```text
/// POST /orders/{table}/pay
/// ```
///
/// # Errors
///
/// 400 for a non-positive table, 500 if the store fails.
pub async fn pay_table(
    State(state): State<AppState>,
    Path(table): Path<u32>,
) -> Result<Json<PaymentResponse>, AppError> {
    let table = parse_table(table)?;
    let orders_paid = state.orders.mark_paid(table).await?;
    Ok(Json(PaymentResponse {
        table_number: table,
        orders_paid,
    }))
}

fn parse_table(raw: u32) -> Result<TableNumber, AppError> {
    TableNumber::new(raw).ok_or_else(|| AppError::bad_request(format!("Invalid table number: {raw}")))
}
