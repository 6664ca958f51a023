// Customer-facing routes: browse orders, get a payment code, upload a slip.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiError, PaymentResponse, SharedState};
use crate::orders::{Order, OrderFilter};
use crate::promptpay::PaymentCode;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/payment-code", post(payment_code))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/payment", get(order_payment))
        .route("/orders/:id/slip", post(upload_slip))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentCodeRequest {
    pub identifier: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

async fn payment_code(Json(req): Json<PaymentCodeRequest>) -> Result<Json<Value>, ApiError> {
    let code = PaymentCode::new(&req.identifier, req.amount)?;
    Ok(Json(json!({
        "payload": code.payload(),
        "kind": code.account_kind(),
        "identifier": code.identifier(),
        "static": code.is_static(),
    })))
}

async fn list_orders(
    State(state): State<SharedState>,
    Query(filter): Query<OrderFilter>,
) -> Json<Value> {
    let book = state.book.read();
    Json(json!({
        "orders": book.filter(&filter),
        "departments": book.departments(),
    }))
}

async fn get_order(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    state
        .book
        .read()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))
}

async fn order_payment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let total = state
        .book
        .read()
        .get(&id)
        .map(|o| o.total_price)
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    Ok(Json(state.payment_for(total)?))
}

#[derive(Debug, Deserialize)]
pub struct SlipQuery {
    pub filename: Option<String>,
}

async fn upload_slip(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(q): Query<SlipQuery>,
    body: Bytes,
) -> Result<Json<Order>, ApiError> {
    // refuse before touching the disk
    match state.book.read().get(&id) {
        None => return Err(ApiError::NotFound(format!("order {id} not found"))),
        Some(o) if o.is_paid() => {
            return Err(ApiError::Conflict(format!("order {id} is already paid")))
        }
        Some(_) => {}
    }
    let filename = q.filename.as_deref().unwrap_or("slip.jpg");
    let slip = state.slips.upload(&body, filename)?;

    let mut book = state.book.write();
    let order = book.submit_slip(&id, slip.url)?.clone();
    state.save_orders(&book)?;
    info!(order = %id, "slip submitted, waiting for verification");
    Ok(Json(order))
}
