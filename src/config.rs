use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::orders::Pricing;
use crate::store::{RecipientConfig, RecipientKind, StorageBackend};

pub const DEFAULT_CONFIG_FILE: &str = "quick-pay.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerCfg {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub public_base: Option<String>,
    pub max_upload_bytes: Option<usize>,
    pub cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageCfg {
    pub backend: Option<String>,
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecipientCfg {
    pub number: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PricingCfg {
    pub set_size: Option<u32>,
    pub set_price: Option<u64>,
    pub unit_price: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SeedCfg {
    pub roster: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct QrCfg {
    pub pixels_per_module: Option<u8>,
}

/// `quick-pay.toml` as written on disk; every section is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub server: Option<ServerCfg>,
    pub storage: Option<StorageCfg>,
    pub recipient: Option<RecipientCfg>,
    pub pricing: Option<PricingCfg>,
    pub seed: Option<SeedCfg>,
    pub qr: Option<QrCfg>,
}

/// Effective settings after defaults and `QUICKPAY_*` overrides.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind: String,
    pub port: u16,
    pub public_base: String,
    pub max_upload_bytes: usize,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    pub recipient: Option<RecipientConfig>,
    pub pricing: Pricing,
    pub seed_roster: Option<PathBuf>,
    pub qr_pixels_per_module: u8,
    pub admin_token: Option<String>,
}

impl ResolvedConfig {
    pub fn slips_dir(&self) -> PathBuf {
        self.data_dir.join("slips")
    }
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            let s = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.as_ref().display()))?;
            let cfg: AppConfig = toml::from_str(&s)
                .with_context(|| format!("parsing {}", path.as_ref().display()))?;
            Ok(cfg)
        } else {
            Ok(Default::default())
        }
    }

    /// Resolve against the process environment.
    pub fn resolved(&self) -> Result<ResolvedConfig> {
        self.resolve_with(|k| std::env::var(k).ok())
    }

    /// Resolve with a custom variable lookup (env first, then toml, then default).
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = self.server.clone().unwrap_or_default();
        let storage = self.storage.clone().unwrap_or_default();
        let recipient = self.recipient.clone().unwrap_or_default();
        let pricing = self.pricing.clone().unwrap_or_default();
        let seed = self.seed.clone().unwrap_or_default();
        let qr = self.qr.clone().unwrap_or_default();

        let parsed = |key: &str| env(key).filter(|s| !s.trim().is_empty());

        let bind = parsed("QUICKPAY_BIND")
            .or(server.bind)
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match parsed("QUICKPAY_PORT") {
            Some(p) => p
                .trim()
                .parse()
                .with_context(|| format!("QUICKPAY_PORT={p:?} is not a port"))?,
            None => server.port.unwrap_or(8080),
        };
        let public_base = parsed("QUICKPAY_PUBLIC_BASE")
            .or(server.public_base)
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}"));
        let max_upload_bytes = match parsed("QUICKPAY_MAX_UPLOAD_BYTES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("QUICKPAY_MAX_UPLOAD_BYTES={v:?} is not a size"))?,
            None => server.max_upload_bytes.unwrap_or(5 * 1024 * 1024),
        };

        let cors_origins = match parsed("QUICKPAY_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => server.cors_origins.unwrap_or_default(),
        };

        let backend_name = parsed("QUICKPAY_STORAGE")
            .or(storage.backend)
            .unwrap_or_else(|| "kv".into());
        let storage_backend: StorageBackend = backend_name
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let data_dir = PathBuf::from(
            parsed("QUICKPAY_DATA_DIR")
                .or(storage.data_dir)
                .unwrap_or_else(|| "quick_pay_data".into()),
        );

        let recipient = match parsed("QUICKPAY_RECIPIENT").or(recipient.number.clone()) {
            Some(number) => {
                let kind_name = parsed("QUICKPAY_RECIPIENT_TYPE").or(recipient.kind);
                let kind = match kind_name {
                    Some(k) => k.parse::<RecipientKind>().map_err(|e| anyhow::anyhow!(e))?,
                    None => RecipientKind::Phone,
                };
                Some(RecipientConfig { number, kind })
            }
            None => None,
        };

        let defaults = Pricing::default();
        let pricing = Pricing {
            set_size: pricing.set_size.unwrap_or(defaults.set_size),
            set_price: pricing.set_price.unwrap_or(defaults.set_price),
            unit_price: pricing.unit_price.unwrap_or(defaults.unit_price),
        };

        let seed_roster = parsed("QUICKPAY_SEED").or(seed.roster).map(PathBuf::from);
        let admin_token = parsed("QUICKPAY_ADMIN_TOKEN");

        Ok(ResolvedConfig {
            bind,
            port,
            public_base,
            max_upload_bytes,
            cors_origins,
            storage: storage_backend,
            data_dir,
            recipient,
            pricing,
            seed_roster,
            qr_pixels_per_module: qr.pixels_per_module.unwrap_or(8),
            admin_token,
        })
    }
}
