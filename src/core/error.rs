//! Error hierarchy shared across the engine and its collaborators

use thiserror::Error;

use crate::core::types::Order;

pub type Result<T> = std::result::Result<T, Error>;

/// Tidebot error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Exchange API errors
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// Requested market is not listed on the exchange
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// Degenerate or missing market data
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Order placement failed; carries the candidate order that was never placed
    #[error("Order rejected: {reason}")]
    OrderRejected { order: Order, reason: String },

    /// Persistence errors
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
