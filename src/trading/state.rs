//! Persisted trader state - the durable ledger of open positions and
//! adaptive thresholds

use serde::{Deserialize, Serialize};

use crate::core::{Result, Store, StoreExt, TraderConfig};
use crate::trading::ledger::OrderLedger;

/// The only persisted entity: adaptive thresholds plus both order ledgers.
///
/// Loaded at tick start, saved at tick end. An absent key means first run
/// for this market and yields config defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderState {
    pub buy_threshold: usize,
    pub sell_threshold: f64,
    pub bids: OrderLedger,
    pub asks: OrderLedger,
}

impl TraderState {
    pub fn from_config(config: &TraderConfig) -> Self {
        Self {
            buy_threshold: config.buy_threshold,
            sell_threshold: config.sell_threshold,
            bids: OrderLedger::new(),
            asks: OrderLedger::new(),
        }
    }

    /// Read state by key, falling back to config defaults when the key has
    /// never been written. A present-but-undecodable key is an error.
    pub fn load(store: &dyn Store, key: &str, config: &TraderConfig) -> Result<Self> {
        if store.has_data(key)? {
            store.read(key)
        } else {
            Ok(Self::from_config(config))
        }
    }

    pub fn save(&self, store: &dyn Store, key: &str) -> Result<()> {
        store.write(key, self)
    }
}

/// Store key under which a market's state lives.
pub fn state_key(market: &str) -> String {
    format!("trader_state.{}", market)
}
