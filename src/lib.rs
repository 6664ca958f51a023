//! Quick Pay: order tracking and PromptPay payment codes for small internal sales.

pub mod api;
pub mod config;
pub mod orders;
pub mod promptpay;
pub mod render;
pub mod store;

pub use promptpay::{encode_payment_payload, AccountKind, PayloadError, PaymentCode};
