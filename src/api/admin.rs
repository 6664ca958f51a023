use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::security::AdminAuth;
use super::{ApiError, SharedState};
use crate::orders::{seed_orders, Order, OrderFilter, Selection};
use crate::promptpay::PaymentCode;
use crate::store::RecipientConfig;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/orders", get(list_orders))
        .route("/admin/stats", get(stats))
        .route("/admin/orders/:id/paid", post(mark_paid))
        .route("/admin/orders/:id/toggle", post(toggle))
        .route("/admin/batch/payment", post(batch_payment))
        .route("/admin/batch/confirm", post(batch_confirm))
        .route("/admin/reset", post(reset))
        .route("/admin/recipient", get(get_recipient).put(put_recipient))
}

async fn list_orders(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Query(filter): Query<OrderFilter>,
) -> Json<Value> {
    let book = state.book.read();
    Json(json!({
        "orders": book.filter(&filter),
        "departments": book.departments(),
        "stats": book.stats(),
    }))
}

async fn stats(_admin: AdminAuth, State(state): State<SharedState>) -> Json<Value> {
    let book = state.book.read();
    Json(json!({
        "stats": book.stats(),
        "departments": book.department_quantities(),
    }))
}

async fn mark_paid(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let mut book = state.book.write();
    let order = book.mark_paid(&id)?.clone();
    state.save_orders(&book)?;
    info!(order = %id, "marked paid");
    Ok(Json(order))
}

async fn toggle(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let mut book = state.book.write();
    let order = book.toggle_status(&id)?.clone();
    state.save_orders(&book)?;
    info!(order = %id, status = order.status.as_str(), "status toggled");
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
}

impl BatchRequest {
    fn selection(&self) -> Result<Selection, ApiError> {
        if self.ids.is_empty() {
            return Err(ApiError::BadRequest("no orders selected".into()));
        }
        Ok(Selection::from_ids(self.ids.iter()))
    }
}

/// One payment code covering every selected order.
async fn batch_payment(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let selection = req.selection()?;
    let total = {
        let book = state.book.read();
        if let Some(missing) = selection.ids().find(|id| book.get(id).is_none()) {
            return Err(ApiError::NotFound(format!("order {missing} not found")));
        }
        book.selection_total(&selection)
    };
    let payment = state.payment_for(total)?;
    Ok(Json(json!({
        "count": selection.len(),
        "payment": payment,
    })))
}

async fn batch_confirm(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let selection = req.selection()?;
    let mut book = state.book.write();
    let updated = book.mark_many_paid(&selection)?;
    state.save_orders(&book)?;
    info!(selected = selection.len(), updated, "batch marked paid");
    Ok(Json(json!({ "updated": updated, "stats": book.stats() })))
}

/// Throw away all progress and reseed from the roster.
async fn reset(_admin: AdminAuth, State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let mut book = state.book.write();
    book.reset(seed_orders(&state.roster, &state.pricing));
    state.save_orders(&book)?;
    warn!(count = book.orders().len(), "orders reset to seed roster");
    Ok(Json(json!({ "orders": book.orders() })))
}

async fn get_recipient(
    _admin: AdminAuth,
    State(state): State<SharedState>,
) -> Json<Option<RecipientConfig>> {
    Json(state.recipient.read().clone())
}

async fn put_recipient(
    _admin: AdminAuth,
    State(state): State<SharedState>,
    Json(cfg): Json<RecipientConfig>,
) -> Result<Json<Value>, ApiError> {
    let requested = cfg.kind;
    let (cfg, kind) = cfg.normalized()?;
    if requested != cfg.kind {
        warn!(?requested, stored = ?cfg.kind, "recipient type relabelled to match the number");
    }
    let mut current = state.recipient.write();
    state.persistence.save_recipient_config(&cfg)?;
    // sample payload so the operator can scan-test the account
    let sample = PaymentCode::new(&cfg.number, None)?.payload();
    info!(kind = kind.as_str(), "payment recipient updated");
    *current = Some(cfg.clone());
    Ok(Json(json!({ "recipient": cfg, "kind": kind, "sample": sample })))
}
