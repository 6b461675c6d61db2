//! Collaborator traits - the seams between the decision engine and the world

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::{Result, types::*};

/// One tradeable currency-pair market on an exchange.
#[async_trait]
pub trait Market: Send + Sync {
    /// Market name in `BASE_ALT` form (e.g. "BTC_XRP")
    fn name(&self) -> &str;

    /// The traded (alt) currency, i.e. the second half of the market name
    fn currency(&self) -> &str;

    /// Whether the exchange currently lists this market
    async fn exists(&self) -> Result<bool>;

    /// Last traded price
    async fn current_price(&self) -> Result<f64>;

    /// Historical candles covering `start..=end` (unix seconds)
    async fn summary_data(&self, start: i64, end: i64) -> Result<Vec<SummaryData>>;

    /// Orders we placed that the exchange still reports as open
    async fn pending_orders(&self) -> Result<Vec<Order>>;

    /// Place a buy order, returning the exchange-assigned order id
    async fn buy(&self, order: &Order) -> Result<String>;

    /// Place a sell order, returning the exchange-assigned order id
    async fn sell(&self, order: &Order) -> Result<String>;
}

/// Exchange account operations not tied to a single market.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Look up a market by name
    async fn market(&self, name: &str) -> Result<Arc<dyn Market>>;

    /// Balance for one currency
    async fn balance(&self, currency: &str) -> Result<Balance>;

    /// Exchange name
    fn name(&self) -> &str;
}

/// Keyed byte storage with single-writer semantics per key.
///
/// Kept object-safe by working on raw bytes; typed access goes through
/// [`StoreExt`].
pub trait Store: Send + Sync {
    /// Read the raw value for `key`; absent keys are an error (check
    /// [`Store::has_data`] first when absence is expected)
    fn read_raw(&self, key: &str) -> Result<Vec<u8>>;

    fn write_raw(&self, key: &str, value: &[u8]) -> Result<()>;

    fn has_data(&self, key: &str) -> Result<bool>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// Typed JSON access on top of any [`Store`].
pub trait StoreExt: Store {
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.read_raw(key)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_raw(key, &bytes)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
