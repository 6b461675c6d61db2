//! In-memory market and exchange for backtests and the test suite.
//!
//! `SimMarket` replays a scripted price window and settles pending orders
//! against candles; `SimExchange` tracks balances in a shared map so fills
//! move funds the way a real venue would.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{Balance, Error, Exchange, Market, Order, OrderKind, Result, SummaryData};

#[derive(Default)]
struct MarketInner {
    exists: bool,
    current_price: f64,
    summary: Vec<SummaryData>,
    pending: Vec<Order>,
    placed: Vec<Order>,
    trigger_buy_error: bool,
    trigger_sell_error: bool,
}

pub struct SimMarket {
    name: String,
    base_currency: String,
    alt_currency: String,
    inner: Mutex<MarketInner>,
    balances: Arc<Mutex<HashMap<String, Balance>>>,
}

impl SimMarket {
    pub fn new(name: &str) -> Self {
        let (base_currency, alt_currency) = match name.split_once('_') {
            Some((base, alt)) => (base.to_string(), alt.to_string()),
            None => (name.to_string(), name.to_string()),
        };

        Self {
            name: name.to_string(),
            base_currency,
            alt_currency,
            inner: Mutex::new(MarketInner {
                exists: true,
                ..Default::default()
            }),
            balances: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_exists(&self, exists: bool) {
        self.inner.lock().exists = exists;
    }

    pub fn set_current_price(&self, price: f64) {
        self.inner.lock().current_price = price;
    }

    pub fn set_summary_window(&self, summary: Vec<SummaryData>) {
        self.inner.lock().summary = summary;
    }

    pub fn set_pending(&self, pending: Vec<Order>) {
        self.inner.lock().pending = pending;
    }

    pub fn set_trigger_buy_error(&self, trigger: bool) {
        self.inner.lock().trigger_buy_error = trigger;
    }

    pub fn set_trigger_sell_error(&self, trigger: bool) {
        self.inner.lock().trigger_sell_error = trigger;
    }

    /// Every order ever accepted, in placement order.
    pub fn placed_orders(&self) -> Vec<Order> {
        self.inner.lock().placed.clone()
    }

    pub fn balances(&self) -> Arc<Mutex<HashMap<String, Balance>>> {
        Arc::clone(&self.balances)
    }

    /// Fill every pending order the candle trades through and move the
    /// locked funds to the receiving side. Returns the filled orders.
    pub fn settle_candle(&self, candle: &SummaryData) -> Vec<Order> {
        let mut inner = self.inner.lock();
        let mut balances = self.balances.lock();
        let mut filled = Vec::new();
        let mut still_pending = Vec::new();

        for order in inner.pending.drain(..) {
            let fills = match order.kind {
                OrderKind::Buy => candle.low <= order.price,
                OrderKind::Sell => candle.high >= order.price,
            };

            if !fills {
                still_pending.push(order);
                continue;
            }

            match order.kind {
                OrderKind::Buy => {
                    let base = balances
                        .entry(self.base_currency.clone())
                        .or_insert_with(|| Balance::new(&self.base_currency));
                    base.on_orders -= order.total;
                    let alt = balances
                        .entry(self.alt_currency.clone())
                        .or_insert_with(|| Balance::new(&self.alt_currency));
                    alt.available += order.amount;
                }
                OrderKind::Sell => {
                    let alt = balances
                        .entry(self.alt_currency.clone())
                        .or_insert_with(|| Balance::new(&self.alt_currency));
                    alt.on_orders -= order.amount;
                    let base = balances
                        .entry(self.base_currency.clone())
                        .or_insert_with(|| Balance::new(&self.base_currency));
                    base.available += order.total;
                }
            }

            filled.push(order);
        }

        inner.pending = still_pending;
        filled
    }

    fn lock_funds(&self, order: &Order) {
        let mut balances = self.balances.lock();
        match order.kind {
            OrderKind::Buy => {
                let base = balances
                    .entry(self.base_currency.clone())
                    .or_insert_with(|| Balance::new(&self.base_currency));
                base.available -= order.total;
                base.on_orders += order.total;
            }
            OrderKind::Sell => {
                let alt = balances
                    .entry(self.alt_currency.clone())
                    .or_insert_with(|| Balance::new(&self.alt_currency));
                alt.available -= order.amount;
                alt.on_orders += order.amount;
            }
        }
    }
}

#[async_trait]
impl Market for SimMarket {
    fn name(&self) -> &str {
        &self.name
    }

    fn currency(&self) -> &str {
        &self.alt_currency
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.inner.lock().exists)
    }

    async fn current_price(&self) -> Result<f64> {
        Ok(self.inner.lock().current_price)
    }

    async fn summary_data(&self, _start: i64, _end: i64) -> Result<Vec<SummaryData>> {
        Ok(self.inner.lock().summary.clone())
    }

    async fn pending_orders(&self) -> Result<Vec<Order>> {
        Ok(self.inner.lock().pending.clone())
    }

    async fn buy(&self, order: &Order) -> Result<String> {
        {
            let inner = self.inner.lock();
            if inner.trigger_buy_error {
                return Err(Error::Exchange("fake buy error".to_string()));
            }
        }

        let mut placed = order.clone();
        placed.id = Uuid::new_v4().to_string();
        self.lock_funds(&placed);

        let mut inner = self.inner.lock();
        inner.pending.push(placed.clone());
        let id = placed.id.clone();
        inner.placed.push(placed);
        Ok(id)
    }

    async fn sell(&self, order: &Order) -> Result<String> {
        {
            let inner = self.inner.lock();
            if inner.trigger_sell_error {
                return Err(Error::Exchange("fake sell error".to_string()));
            }
        }

        let mut placed = order.clone();
        placed.id = Uuid::new_v4().to_string();
        self.lock_funds(&placed);

        let mut inner = self.inner.lock();
        inner.pending.push(placed.clone());
        let id = placed.id.clone();
        inner.placed.push(placed);
        Ok(id)
    }
}

/// Single-market exchange around a [`SimMarket`], sharing its balance map.
pub struct SimExchange {
    market: Arc<SimMarket>,
    balances: Arc<Mutex<HashMap<String, Balance>>>,
}

impl SimExchange {
    pub fn new(market: Arc<SimMarket>) -> Self {
        let balances = market.balances();
        Self { market, balances }
    }

    pub fn set_balance(&self, currency: &str, available: f64) {
        let mut balances = self.balances.lock();
        let entry = balances
            .entry(currency.to_string())
            .or_insert_with(|| Balance::new(currency));
        entry.available = available;
    }
}

#[async_trait]
impl Exchange for SimExchange {
    fn name(&self) -> &str {
        "sim"
    }

    async fn market(&self, _name: &str) -> Result<Arc<dyn Market>> {
        Ok(Arc::clone(&self.market) as Arc<dyn Market>)
    }

    async fn balance(&self, currency: &str) -> Result<Balance> {
        let balances = self.balances.lock();
        Ok(balances
            .get(currency)
            .cloned()
            .unwrap_or_else(|| Balance::new(currency)))
    }
}
