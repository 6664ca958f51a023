//! HTTP surface: customer routes, token-guarded admin routes, shared state.

pub mod admin;
pub mod customer;
pub mod security;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::orders::{seed_orders, LedgerError, OrderBook, Pricing, SeedEntry};
use crate::promptpay::{AccountKind, PayloadError, PaymentCode};
use crate::render::{self, RenderError};
use crate::store::{Persistence, RecipientConfig, SlipStore, StoreError};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub book: RwLock<OrderBook>,
    pub recipient: RwLock<Option<RecipientConfig>>,
    pub persistence: Persistence,
    pub slips: Box<dyn SlipStore>,
    pub roster: Vec<SeedEntry>,
    pub pricing: Pricing,
    pub admin_token: Option<String>,
    pub qr_pixels_per_module: u8,
}

impl AppState {
    /// Restore persisted orders, or seed them from the roster and save the seed.
    /// A stored recipient wins over `default_recipient`.
    pub fn load(
        persistence: Persistence,
        slips: Box<dyn SlipStore>,
        roster: Vec<SeedEntry>,
        pricing: Pricing,
        default_recipient: Option<RecipientConfig>,
    ) -> Self {
        let orders = match persistence.load_orders() {
            Some(orders) => {
                info!(count = orders.len(), backend = persistence.backend_name(), "restored orders");
                orders
            }
            None => {
                let seeded = seed_orders(&roster, &pricing);
                if let Err(e) = persistence.save_orders(&seeded) {
                    warn!(error = %e, "could not persist seeded orders");
                }
                info!(count = seeded.len(), "seeded orders from roster");
                seeded
            }
        };
        let recipient = persistence.load_recipient_config().or(default_recipient);
        if recipient.is_none() {
            warn!("no payment recipient configured; payment codes unavailable until one is set");
        }
        Self {
            book: RwLock::new(OrderBook::new(orders)),
            recipient: RwLock::new(recipient),
            persistence,
            slips,
            roster,
            pricing,
            admin_token: None,
            qr_pixels_per_module: 8,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_qr_scale(mut self, pixels_per_module: u8) -> Self {
        self.qr_pixels_per_module = pixels_per_module.max(1);
        self
    }

    /// Called with the write lock still held so snapshots land in order.
    fn save_orders(&self, book: &OrderBook) -> Result<(), ApiError> {
        Ok(self.persistence.save_orders(book.orders())?)
    }

    /// Payment code for `amount` baht to the configured recipient.
    pub fn payment_for(&self, amount: u64) -> Result<PaymentResponse, ApiError> {
        let recipient = self
            .recipient
            .read()
            .clone()
            .ok_or_else(|| ApiError::Conflict("payment recipient is not configured".into()))?;
        let code = PaymentCode::new(&recipient.number, Some(amount as f64))?;
        let payload = code.payload();
        let qr = render::to_bmp_data_uri(&payload, Some(self.qr_pixels_per_module))?;
        Ok(PaymentResponse {
            payload,
            amount,
            recipient: code.identifier().to_string(),
            kind: code.account_kind(),
            qr,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payload: String,
    pub amount: u64,
    pub recipient: String,
    pub kind: AccountKind,
    /// BMP data URI
    pub qr: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("admin token required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(e: PayloadError) -> Self {
        ApiError::Unprocessable(e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownOrder(_) => ApiError::NotFound(e.to_string()),
            LedgerError::AlreadyPaid(_) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmptyUpload | StoreError::UnsupportedFile(_) => {
                ApiError::BadRequest(e.to_string())
            }
            other => {
                tracing::error!(error = %other, "storage failure");
                ApiError::Internal("storage failure".into())
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Full application router. CORS is layered on by the caller.
pub fn router(state: SharedState, slips_dir: impl Into<PathBuf>, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(customer::router())
        .merge(admin::router())
        .nest_service("/slips", ServeDir::new(slips_dir.into()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
