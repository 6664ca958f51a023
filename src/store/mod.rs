//! Persistence collaborators: order state, recipient config and payment slips.
//!
//! A remote backend (`none`, `kv` or `document`) is always paired with a
//! local JSON copy in the data dir. Reads prefer the backend and fall back to
//! the local copy; writes go to both.

pub mod local;
pub mod sled_store;
pub mod slips;

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};
use thiserror::Error;

use crate::orders::Order;
use crate::promptpay::{self, AccountKind, PayloadError};

pub use local::LocalStore;
pub use sled_store::{DocumentStore, KvStore};
pub use slips::{DiskSlipStore, SlipStore, UploadedSlip};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty upload")]
    EmptyUpload,
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How the operator labelled the receiving account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Phone,
    IdCard,
    Other,
}

impl From<AccountKind> for RecipientKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Mobile => RecipientKind::Phone,
            AccountKind::NationalId => RecipientKind::IdCard,
            AccountKind::EWallet => RecipientKind::Other,
        }
    }
}

impl FromStr for RecipientKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(RecipientKind::Phone),
            "id_card" => Ok(RecipientKind::IdCard),
            "other" => Ok(RecipientKind::Other),
            other => Err(format!("unknown recipient type {other:?}")),
        }
    }
}

/// Account that receives the payments (`{number, type}` on disk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientConfig {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: RecipientKind,
}

impl RecipientConfig {
    /// Check that the number can actually be encoded into a payment code.
    pub fn validate(&self) -> std::result::Result<AccountKind, PayloadError> {
        promptpay::classify(&promptpay::normalize_identifier(&self.number))
    }

    /// Trim the number and relabel `type` from what the number actually is.
    pub fn normalized(self) -> std::result::Result<(Self, AccountKind), PayloadError> {
        let kind = self.validate()?;
        let cfg = RecipientConfig {
            number: self.number.trim().to_string(),
            kind: kind.into(),
        };
        Ok((cfg, kind))
    }
}

/// Load/save contract every backend implements.
pub trait StateStore: Send + Sync {
    fn name(&self) -> &'static str;
    fn load_orders(&self) -> Result<Option<Vec<Order>>>;
    fn save_orders(&self, orders: &[Order]) -> Result<()>;
    fn load_recipient_config(&self) -> Result<Option<RecipientConfig>>;
    fn save_recipient_config(&self, cfg: &RecipientConfig) -> Result<()>;
}

/// Backend that keeps nothing; everything lives in the local copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl StateStore for NoopStore {
    fn name(&self) -> &'static str {
        "none"
    }

    fn load_orders(&self) -> Result<Option<Vec<Order>>> {
        Ok(None)
    }

    fn save_orders(&self, _orders: &[Order]) -> Result<()> {
        Ok(())
    }

    fn load_recipient_config(&self) -> Result<Option<RecipientConfig>> {
        Ok(None)
    }

    fn save_recipient_config(&self, _cfg: &RecipientConfig) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    None,
    Kv,
    Document,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(StorageBackend::None),
            "kv" | "sled" => Ok(StorageBackend::Kv),
            "document" | "doc" => Ok(StorageBackend::Document),
            other => Err(format!("unknown storage backend {other:?}")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageBackend::None => "none",
            StorageBackend::Kv => "kv",
            StorageBackend::Document => "document",
        };
        f.write_str(s)
    }
}

/// Open the configured backend below `data_dir`.
pub fn open_backend(backend: StorageBackend, data_dir: &Path) -> Result<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match backend {
        StorageBackend::None => Box::new(NoopStore),
        StorageBackend::Kv => Box::new(KvStore::open(data_dir.join("kv"))?),
        StorageBackend::Document => Box::new(DocumentStore::open(data_dir.join("documents"))?),
    };
    tracing::info!(backend = store.name(), dir = %data_dir.display(), "storage backend ready");
    Ok(store)
}

/// Backend + local copy with the read/write precedence the app relies on.
pub struct Persistence {
    backend: Box<dyn StateStore>,
    local: LocalStore,
}

impl Persistence {
    pub fn new(backend: Box<dyn StateStore>, local: LocalStore) -> Self {
        Self { backend, local }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Backend orders if it has any, else the local copy, else `None`.
    pub fn load_orders(&self) -> Option<Vec<Order>> {
        match self.backend.load_orders() {
            Ok(Some(orders)) if !orders.is_empty() => return Some(orders),
            Ok(_) => {}
            Err(e) => tracing::warn!(backend = self.backend.name(), error = %e, "backend order load failed"),
        }
        match self.local.load_orders() {
            Ok(orders) => orders.filter(|o| !o.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "local order copy unreadable");
                None
            }
        }
    }

    /// Write the local copy first, then the backend.
    pub fn save_orders(&self, orders: &[Order]) -> Result<()> {
        self.local.save_orders(orders)?;
        self.backend.save_orders(orders).map_err(|e| {
            tracing::error!(backend = self.backend.name(), error = %e, "backend order save failed");
            e
        })
    }

    pub fn load_recipient_config(&self) -> Option<RecipientConfig> {
        match self.backend.load_recipient_config() {
            Ok(Some(cfg)) if !cfg.number.is_empty() => return Some(cfg),
            Ok(_) => {}
            Err(e) => tracing::warn!(backend = self.backend.name(), error = %e, "backend config load failed"),
        }
        self.local.load_recipient_config().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "local recipient config unreadable");
            None
        })
    }

    pub fn save_recipient_config(&self, cfg: &RecipientConfig) -> Result<()> {
        self.local.save_recipient_config(cfg)?;
        self.backend.save_recipient_config(cfg).map_err(|e| {
            tracing::error!(backend = self.backend.name(), error = %e, "backend config save failed");
            e
        })
    }
}
