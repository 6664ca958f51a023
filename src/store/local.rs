use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{RecipientConfig, Result};
use crate::orders::Order;

pub const ORDERS_FILE: &str = "quick-pay-orders.json";
pub const RECIPIENT_FILE: &str = "quick-pay-recipient.json";

/// Plain JSON files in the data dir. Always written, read only when the
/// backend has nothing.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write to a sibling temp file and rename over the target.
    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn load_orders(&self) -> Result<Option<Vec<Order>>> {
        self.read(ORDERS_FILE)
    }

    pub fn save_orders(&self, orders: &[Order]) -> Result<()> {
        self.write(ORDERS_FILE, orders)
    }

    pub fn load_recipient_config(&self) -> Result<Option<RecipientConfig>> {
        self.read(RECIPIENT_FILE)
    }

    pub fn save_recipient_config(&self, cfg: &RecipientConfig) -> Result<()> {
        self.write(RECIPIENT_FILE, cfg)
    }
}
