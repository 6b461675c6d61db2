//! Core types - orders, balances, candles, and the per-tick market view

use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Buy => write!(f, "buy"),
            OrderKind::Sell => write!(f, "sell"),
        }
    }
}

/// A buy or sell position tracked by the ledger.
///
/// `id` stays empty until the exchange (or a simulation surrogate) assigns one
/// on placement. `filled` is flipped only by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub kind: OrderKind,
    pub price: f64,
    pub amount: f64,
    pub total: f64,
    pub filled: bool,
}

impl Order {
    pub fn new(kind: OrderKind, price: f64, amount: f64) -> Self {
        Self {
            id: String::new(),
            kind,
            price,
            amount,
            total: price * amount,
            filled: false,
        }
    }

    pub fn buy(price: f64, amount: f64) -> Self {
        Self::new(OrderKind::Buy, price, amount)
    }

    pub fn sell(price: f64, amount: f64) -> Self {
        Self::new(OrderKind::Sell, price, amount)
    }
}

/// Per-currency account balance snapshot, refreshed every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub available: f64,
    pub on_orders: f64,
    pub btc_value: f64,
}

impl Balance {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            ..Self::default()
        }
    }
}

/// One historical candle from the exchange chart-data feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub date: i64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub weighted_average: f64,
}

/// Derived statistical view of the market for one tick. Never persisted.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub current_price: f64,
    /// Percentile table over the observation window, indices 0..=100.
    pub percentiles: [f64; 101],
    pub volatility_index: f64,
    pub high: f64,
    pub low: f64,
}

impl Default for MarketData {
    fn default() -> Self {
        Self {
            current_price: 0.0,
            percentiles: [0.0; 101],
            volatility_index: 0.0,
            high: 0.0,
            low: 0.0,
        }
    }
}
