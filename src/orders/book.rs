//! In-memory order ledger: status changes, grouping, statistics, selection.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::{Order, OrderStatus};

/// Pseudo-department that matches every order.
pub const ALL_DEPARTMENTS: &str = "All";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("order {0} not found")]
    UnknownOrder(String),
    #[error("order {0} is already paid")]
    AlreadyPaid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub department: Option<String>,
    pub search: Option<String>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        if let Some(dept) = self.department.as_deref() {
            if dept != ALL_DEPARTMENTS && !dept.is_empty() && order.department != dept {
                return false;
            }
        }
        if let Some(term) = self.search.as_deref().map(str::trim) {
            if !term.is_empty()
                && !order
                    .customer_name
                    .to_lowercase()
                    .contains(&term.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub name: String,
    pub unpaid_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentQuantity {
    pub department: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: usize,
    pub paid_orders: usize,
    pub total_revenue: u64,
    pub paid_revenue: u64,
    pub total_quantity: u64,
    pub paid_quantity: u64,
}

/// Ids picked for a batch payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Add every pending order of the visible list.
    pub fn select_all_pending<'a>(&mut self, visible: impl IntoIterator<Item = &'a Order>) {
        for order in visible {
            if order.is_pending() {
                self.ids.insert(order.id.clone());
            }
        }
    }

    /// Drop every visible order from the selection, keep the rest.
    pub fn deselect_all<'a>(&mut self, visible: impl IntoIterator<Item = &'a Order>) {
        for order in visible {
            self.ids.remove(&order.id);
        }
    }

    /// True when the visible list has pending orders and all of them are selected.
    pub fn is_all_selected<'a>(&self, visible: impl IntoIterator<Item = &'a Order>) -> bool {
        let mut any = false;
        for order in visible.into_iter().filter(|o| o.is_pending()) {
            any = true;
            if !self.ids.contains(&order.id) {
                return false;
            }
        }
        any
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    orders: Vec<Order>,
}

impl OrderBook {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Order, LedgerError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| LedgerError::UnknownOrder(id.to_string()))
    }

    pub fn filter(&self, filter: &OrderFilter) -> Vec<&Order> {
        self.orders.iter().filter(|o| filter.matches(o)).collect()
    }

    /// `All` first with the overall pending count, then departments by name.
    pub fn departments(&self) -> Vec<DepartmentSummary> {
        let mut unpaid: BTreeMap<&str, usize> = BTreeMap::new();
        for order in &self.orders {
            let count = unpaid.entry(order.department.as_str()).or_insert(0);
            if order.is_pending() {
                *count += 1;
            }
        }
        let total = unpaid.values().sum();
        std::iter::once(DepartmentSummary {
            name: ALL_DEPARTMENTS.to_string(),
            unpaid_count: total,
        })
        .chain(unpaid.into_iter().map(|(name, unpaid_count)| DepartmentSummary {
            name: name.to_string(),
            unpaid_count,
        }))
        .collect()
    }

    /// Quantity ordered per department, largest first.
    pub fn department_quantities(&self) -> Vec<DepartmentQuantity> {
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
        for order in &self.orders {
            *totals.entry(order.department.as_str()).or_insert(0) += order.quantity as u64;
        }
        let mut out: Vec<DepartmentQuantity> = totals
            .into_iter()
            .map(|(department, quantity)| DepartmentQuantity {
                department: department.to_string(),
                quantity,
            })
            .collect();
        out.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| a.department.cmp(&b.department))
        });
        out
    }

    pub fn stats(&self) -> OrderStats {
        let mut stats = OrderStats {
            total_orders: self.orders.len(),
            ..Default::default()
        };
        for order in &self.orders {
            stats.total_revenue += order.total_price;
            stats.total_quantity += order.quantity as u64;
            if order.is_paid() {
                stats.paid_orders += 1;
                stats.paid_revenue += order.total_price;
                stats.paid_quantity += order.quantity as u64;
            }
        }
        stats
    }

    pub fn mark_paid(&mut self, id: &str) -> Result<&Order, LedgerError> {
        let order = self.get_mut(id)?;
        order.status = OrderStatus::Paid;
        Ok(order)
    }

    /// Paid goes back to pending; pending and waiting go to paid.
    pub fn toggle_status(&mut self, id: &str) -> Result<&Order, LedgerError> {
        let order = self.get_mut(id)?;
        order.status = match order.status {
            OrderStatus::Paid => OrderStatus::Pending,
            OrderStatus::Pending | OrderStatus::WaitingForVerification => OrderStatus::Paid,
        };
        Ok(order)
    }

    /// Attach a payment proof; the order then waits for the operator.
    pub fn submit_slip(&mut self, id: &str, slip_url: String) -> Result<&Order, LedgerError> {
        let order = self.get_mut(id)?;
        if order.is_paid() {
            return Err(LedgerError::AlreadyPaid(id.to_string()));
        }
        order.status = OrderStatus::WaitingForVerification;
        order.slip_url = Some(slip_url);
        Ok(order)
    }

    /// Mark every selected order paid. All ids are checked before anything changes.
    pub fn mark_many_paid(&mut self, selection: &Selection) -> Result<usize, LedgerError> {
        if let Some(missing) = selection.ids().find(|id| self.get(id).is_none()) {
            return Err(LedgerError::UnknownOrder(missing.to_string()));
        }
        let mut changed = 0;
        for order in self.orders.iter_mut() {
            if selection.contains(&order.id) && !order.is_paid() {
                order.status = OrderStatus::Paid;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Sum of the selected orders' prices; unknown ids count as zero.
    pub fn selection_total(&self, selection: &Selection) -> u64 {
        self.orders
            .iter()
            .filter(|o| selection.contains(&o.id))
            .map(|o| o.total_price)
            .sum()
    }

    pub fn reset(&mut self, seed: Vec<Order>) {
        self.orders = seed;
    }
}
