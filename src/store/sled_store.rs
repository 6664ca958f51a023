// Sled-backed state stores
//
// KvStore layout:
//   Tree: "quick_pay_state"
//   Key "orders"           -> JSON array of every order (one snapshot)
//   Key "promptpay_config" -> JSON {number, type}
//
// DocumentStore layout:
//   Tree: "orders" -> one JSON document per order, keyed by order id
//   Tree: "config" -> key "promptpay_config" -> JSON {number, type}

use sled::Db;
use std::path::Path;

use super::{RecipientConfig, Result, StateStore};
use crate::orders::Order;

const KV_TREE: &str = "quick_pay_state";
const KV_ORDERS_KEY: &str = "orders";
const CONFIG_KEY: &str = "promptpay_config";
const ORDERS_TREE: &str = "orders";
const CONFIG_TREE: &str = "config";

fn open_db(path: &Path) -> Result<Db> {
    std::fs::create_dir_all(path)?;
    Ok(sled::open(path)?)
}

/// Whole order list stored under a single key.
pub struct KvStore {
    db: Db,
}

impl KvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(open_db(path.as_ref())?))
    }

    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn tree(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(KV_TREE)?)
    }
}

impl StateStore for KvStore {
    fn name(&self) -> &'static str {
        "kv"
    }

    fn load_orders(&self) -> Result<Option<Vec<Order>>> {
        match self.tree()?.get(KV_ORDERS_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_orders(&self, orders: &[Order]) -> Result<()> {
        let t = self.tree()?;
        t.insert(KV_ORDERS_KEY, serde_json::to_vec(orders)?)?;
        t.flush()?;
        Ok(())
    }

    fn load_recipient_config(&self) -> Result<Option<RecipientConfig>> {
        match self.tree()?.get(CONFIG_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_recipient_config(&self, cfg: &RecipientConfig) -> Result<()> {
        let t = self.tree()?;
        t.insert(CONFIG_KEY, serde_json::to_vec(cfg)?)?;
        t.flush()?;
        Ok(())
    }
}

/// One document per order, like a collection in a document database.
pub struct DocumentStore {
    db: Db,
}

impl DocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(open_db(path.as_ref())?))
    }

    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn orders(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(ORDERS_TREE)?)
    }

    fn config(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(CONFIG_TREE)?)
    }
}

impl StateStore for DocumentStore {
    fn name(&self) -> &'static str {
        "document"
    }

    fn load_orders(&self) -> Result<Option<Vec<Order>>> {
        let t = self.orders()?;
        let mut out = Vec::new();
        for item in t.iter() {
            let (_, val) = item?;
            let o: Order = serde_json::from_slice(&val)?;
            out.push(o);
        }
        if out.is_empty() {
            return Ok(None);
        }
        // keys are ids as strings; restore roster order
        out.sort_by_key(|o| o.order_number);
        Ok(Some(out))
    }

    fn save_orders(&self, orders: &[Order]) -> Result<()> {
        let t = self.orders()?;
        let mut batch = sled::Batch::default();
        for item in t.iter().keys() {
            let key = item?;
            if !orders.iter().any(|o| o.id.as_bytes() == key.as_ref()) {
                batch.remove(key);
            }
        }
        for order in orders {
            batch.insert(order.id.as_bytes(), serde_json::to_vec(order)?);
        }
        t.apply_batch(batch)?;
        t.flush()?;
        Ok(())
    }

    fn load_recipient_config(&self) -> Result<Option<RecipientConfig>> {
        match self.config()?.get(CONFIG_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_recipient_config(&self, cfg: &RecipientConfig) -> Result<()> {
        let t = self.config()?;
        t.insert(CONFIG_KEY, serde_json::to_vec(cfg)?)?;
        t.flush()?;
        Ok(())
    }
}
