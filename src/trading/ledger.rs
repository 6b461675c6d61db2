//! Order ledger - outstanding positions and exchange reconciliation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::types::Order;

/// Ordered sequence of outstanding orders.
///
/// Bids and asks each live in their own ledger. Append order is
/// significant: the newest entry is the most recent trade decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderLedger(Vec<Order>);

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, order: Order) {
        self.0.push(order);
    }

    /// Remove and return the order at `index`.
    ///
    /// Callers obtain `index` from [`OrderLedger::last_filled`]; indexing
    /// past the end is a logic error and panics like any slice access.
    pub fn remove_at(&mut self, index: usize) -> Order {
        self.0.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&Order> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.0.iter()
    }

    /// The most recently filled entry: highest index with `filled` set,
    /// i.e. the latest fill in append order.
    pub fn last_filled(&self) -> Option<(usize, &Order)> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, order)| order.filled)
            .next_back()
    }

    fn mark_filled_except(&mut self, pending_ids: &HashSet<&str>) {
        for order in &mut self.0 {
            order.filled = !pending_ids.contains(order.id.as_str());
        }
    }

    fn retain_pending(&mut self, pending_ids: &HashSet<&str>) {
        self.0
            .retain(|order| pending_ids.contains(order.id.as_str()));
    }
}

impl From<Vec<Order>> for OrderLedger {
    fn from(orders: Vec<Order>) -> Self {
        Self(orders)
    }
}

/// Synchronize both ledgers against the exchange's pending-order list.
///
/// Bids absent from the pending set are marked filled but stay in the
/// ledger; they are open positions awaiting a sell decision. Asks absent
/// from the pending set are executed round-trips and are dropped. Matching
/// is by exact id. Idempotent for a fixed pending set.
pub fn reconcile(pending: &[Order], bids: &mut OrderLedger, asks: &mut OrderLedger) {
    let pending_ids: HashSet<&str> = pending.iter().map(|order| order.id.as_str()).collect();

    bids.mark_filled_except(&pending_ids);
    asks.retain_pending(&pending_ids);
}
