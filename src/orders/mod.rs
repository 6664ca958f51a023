//! Order model, pricing and the seed roster.

pub mod book;

pub use book::{
    DepartmentQuantity, DepartmentSummary, LedgerError, OrderBook, OrderFilter, OrderStats,
    Selection, ALL_DEPARTMENTS,
};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Nothing received yet
    Pending,
    /// Customer uploaded a slip, operator has not checked it
    WaitingForVerification,
    /// Operator confirmed the money arrived
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::WaitingForVerification => "waiting_for_verification",
            OrderStatus::Paid => "paid",
        }
    }
}

/// A single order in the sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: u32,
    pub customer_name: String,
    pub department: String,
    pub quantity: u32,
    /// Whole baht
    pub total_price: u64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slip_url: Option<String>,
    pub created_at: String,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Bundle pricing: every full set costs `set_price`, leftovers `unit_price` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub set_size: u32,
    pub set_price: u64,
    pub unit_price: u64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            set_size: 3,
            set_price: 100,
            unit_price: 35,
        }
    }
}

impl Pricing {
    pub fn total_price(&self, quantity: u32) -> u64 {
        if self.set_size == 0 {
            return quantity as u64 * self.unit_price;
        }
        let sets = (quantity / self.set_size) as u64;
        let remainder = (quantity % self.set_size) as u64;
        sets * self.set_price + remainder * self.unit_price
    }
}

/// One row of a seed roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEntry {
    pub customer_name: String,
    pub department: String,
    pub quantity: u32,
}

impl SeedEntry {
    fn new(customer_name: &str, department: &str, quantity: u32) -> Self {
        Self {
            customer_name: customer_name.to_string(),
            department: department.to_string(),
            quantity,
        }
    }
}

/// Roster used when no seed file is configured.
pub fn demo_roster() -> Vec<SeedEntry> {
    vec![
        SeedEntry::new("Am", "Accounting", 6),
        SeedEntry::new("Jaeng", "Operations", 3),
        SeedEntry::new("Nub", "Operations", 6),
        SeedEntry::new("Netty", "Engineering", 3),
        SeedEntry::new("Joy", "Engineering", 3),
        SeedEntry::new("Toon", "Accounting", 3),
        SeedEntry::new("Fah", "Operations", 3),
        SeedEntry::new("Kwan", "Marketing", 6),
        SeedEntry::new("Aum", "Marketing", 3),
        SeedEntry::new("Pop", "Planning", 12),
        SeedEntry::new("Uy", "Operations", 9),
        SeedEntry::new("Director Niwet", "Planning", 20),
    ]
}

/// Read a JSON roster (`[{customerName, department, quantity}, ..]`).
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<SeedEntry>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Turn a roster into fresh pending orders: ids are zero-based indexes,
/// order numbers start at 1.
pub fn seed_orders(roster: &[SeedEntry], pricing: &Pricing) -> Vec<Order> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    roster
        .iter()
        .enumerate()
        .map(|(index, entry)| Order {
            id: index.to_string(),
            order_number: index as u32 + 1,
            customer_name: entry.customer_name.clone(),
            department: entry.department.clone(),
            quantity: entry.quantity,
            total_price: pricing.total_price(entry.quantity),
            status: OrderStatus::Pending,
            slip_url: None,
            created_at: created_at.clone(),
        })
        .collect()
}
