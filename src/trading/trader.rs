//! Decision engine - one trader per market, one tick at a time

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::{
    Balance, Error, Exchange, Market, MarketData, Order, OrderKind, Result, Store, TraderConfig,
};
use crate::trading::ledger;
use crate::trading::percentiles::{compute_percentiles, volatility_index};
use crate::trading::state::{TraderState, state_key};

/// Percentile-band mean-reversion engine for a single market.
///
/// Runs one strictly sequential tick at a time: load state, derive market
/// statistics, reconcile the ledgers, refresh balances, decide buy then
/// sell, persist. Collaborator failures abort the tick before any state is
/// saved; the next tick retries from the last good state.
pub struct Trader {
    config: TraderConfig,
    exchange: Arc<dyn Exchange>,
    market: Arc<dyn Market>,
    store: Arc<dyn Store>,
    state_key: String,
    base_currency: String,
    alt_currency: String,
    state: TraderState,
    base_balance: Balance,
    alt_balance: Balance,
}

impl Trader {
    pub async fn new(
        exchange: Arc<dyn Exchange>,
        store: Arc<dyn Store>,
        config: TraderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (base_currency, alt_currency) = config.currencies()?;

        let market = exchange.market(&config.market).await?;
        if !market.exists().await? {
            return Err(Error::MarketNotFound(config.market.clone()));
        }

        let state_key = state_key(&config.market);
        let state = TraderState::from_config(&config);
        let base_balance = Balance::new(&base_currency);
        let alt_balance = Balance::new(&alt_currency);

        Ok(Self {
            config,
            exchange,
            market,
            store,
            state_key,
            base_currency,
            alt_currency,
            state,
            base_balance,
            alt_balance,
        })
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    pub fn state(&self) -> &TraderState {
        &self.state
    }

    /// Run one complete tick.
    pub async fn trade(&mut self) -> Result<()> {
        self.load_state()?;

        let market_data = self.load_market_data().await?;

        info!(
            "market={} price={:.9} pct_{}={:.9} pct_{}={:.9} volatility={:.9} high={:.9} low={:.9}",
            self.config.market,
            market_data.current_price,
            self.config.lower_percentile,
            market_data.percentiles[self.config.lower_percentile],
            self.config.upper_percentile,
            market_data.percentiles[self.config.upper_percentile],
            market_data.volatility_index,
            market_data.high,
            market_data.low
        );

        self.reconcile().await?;
        self.load_balances().await?;

        if let Some(order) = self.buy(&market_data).await? {
            info!(
                "market={} action=buy id={} price={:.9} amount={:.9} total={:.9}",
                self.config.market, order.id, order.price, order.amount, order.total
            );
        }

        if let Some(order) = self.sell(&market_data).await? {
            info!(
                "market={} action=sell id={} price={:.9} amount={:.9} total={:.9}",
                self.config.market, order.id, order.price, order.amount, order.total
            );
        }

        self.save_state()?;

        Ok(())
    }

    /// Read persisted state, falling back to config defaults on first run.
    pub fn load_state(&mut self) -> Result<()> {
        self.state = TraderState::load(self.store.as_ref(), &self.state_key, &self.config)?;
        Ok(())
    }

    pub fn save_state(&self) -> Result<()> {
        self.state.save(self.store.as_ref(), &self.state_key)
    }

    /// Fetch the observation window and derive the tick's statistical view.
    pub async fn load_market_data(&self) -> Result<MarketData> {
        let end_time = Utc::now().timestamp();
        let start_time = end_time - self.config.time_window_secs;

        let summary = self.market.summary_data(start_time, end_time).await?;
        let averages: Vec<f64> = summary
            .iter()
            .map(|candle| candle.weighted_average)
            .collect();

        if averages.is_empty() {
            return Err(Error::MarketData(format!(
                "no price history for {} in the last {}s",
                self.config.market, self.config.time_window_secs
            )));
        }

        let percentiles = compute_percentiles(&averages)?;
        let volatility = volatility_index(
            &percentiles,
            self.config.upper_percentile,
            self.config.lower_percentile,
        )?;
        let current_price = self.market.current_price().await?;

        let low = averages.iter().copied().fold(f64::INFINITY, f64::min);
        let high = averages.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(MarketData {
            current_price,
            percentiles,
            volatility_index: volatility,
            high,
            low,
        })
    }

    /// Synchronize the ledgers with the exchange's pending-order list.
    pub async fn reconcile(&mut self) -> Result<()> {
        let pending = self.market.pending_orders().await?;
        ledger::reconcile(&pending, &mut self.state.bids, &mut self.state.asks);
        Ok(())
    }

    /// Refresh the base and alt balance snapshots for this tick.
    pub async fn load_balances(&mut self) -> Result<()> {
        self.base_balance = self.exchange.balance(&self.base_currency).await?;
        self.alt_balance = self.exchange.balance(&self.alt_currency).await?;
        Ok(())
    }

    /// Price is below the buy-threshold percentile and the market is
    /// volatile enough to be worth trading.
    pub fn should_buy(&self, market_data: &MarketData) -> bool {
        market_data.current_price < market_data.percentiles[self.state.buy_threshold]
            && market_data.volatility_index > self.config.volatility_factor
    }

    /// Candidate buy: bid slightly under the current price and spend the
    /// fixed base-currency budget.
    pub fn build_buy_order(&self, market_data: &MarketData) -> Order {
        let price = market_data.current_price * (1.0 - self.config.estimated_fee);
        let amount = self.config.buy_budget / price;
        Order::buy(price, amount)
    }

    pub fn can_buy(&self, order: &Order) -> bool {
        let trade_value = order.price * order.amount * (1.0 + self.config.estimated_fee);
        self.base_balance.available >= trade_value
    }

    /// Decide, place, and record a buy. Returns the placed order, or None
    /// when no buy fired. A placement failure surfaces the candidate order
    /// inside the error and leaves all state untouched.
    pub async fn buy(&mut self, market_data: &MarketData) -> Result<Option<Order>> {
        if !self.should_buy(market_data) {
            return Ok(None);
        }

        let mut order = self.build_buy_order(market_data);

        if !self.can_buy(&order) {
            debug!(
                "market={} buy skipped: {} balance {:.9} below trade value",
                self.config.market, self.base_currency, self.base_balance.available
            );
            return Ok(None);
        }

        order.id = match self.place(&order).await {
            Ok(id) => id,
            Err(e) => {
                return Err(Error::OrderRejected {
                    reason: e.to_string(),
                    order,
                });
            }
        };

        self.state.bids.push(order.clone());

        self.state.buy_threshold = self
            .state
            .buy_threshold
            .saturating_sub(self.config.threshold_increment)
            .max(self.config.buy_threshold_min);
        self.state.sell_threshold =
            (self.state.sell_threshold - self.config.sell_decrement).max(self.config.profit_factor);

        Ok(Some(order))
    }

    /// The latest filled bid can be closed at a profit at the current price.
    pub fn should_sell(&self, market_data: &MarketData) -> bool {
        match self.state.bids.last_filled() {
            Some((_, bid)) => market_data.current_price > bid.price * self.state.sell_threshold,
            None => false,
        }
    }

    /// Candidate sell: offer a fraction of the alt balance slightly above
    /// the current price, raised to the budget-equivalent notional when the
    /// fraction alone would be dust.
    pub fn build_sell_order(&self, market_data: &MarketData) -> Order {
        let price = market_data.current_price * (1.0 + self.config.estimated_fee);
        let mut amount = self.alt_balance.available * self.config.sell_ratio;

        if amount * price < self.config.buy_budget {
            amount = self.config.buy_budget / price;
        }

        Order::sell(price, amount)
    }

    pub fn can_sell(&self, order: &Order) -> bool {
        order.amount <= self.alt_balance.available
    }

    /// Decide, place, and record a sell closing the latest filled bid.
    /// Returns the placed order, or None when no sell fired.
    pub async fn sell(&mut self, market_data: &MarketData) -> Result<Option<Order>> {
        if !self.should_sell(market_data) {
            return Ok(None);
        }

        // should_sell established that a filled bid exists
        let Some((bid_index, _)) = self.state.bids.last_filled() else {
            return Ok(None);
        };

        let mut order = self.build_sell_order(market_data);

        if !self.can_sell(&order) {
            debug!(
                "market={} sell skipped: amount {:.9} exceeds {} balance {:.9}",
                self.config.market, order.amount, self.alt_currency, self.alt_balance.available
            );
            return Ok(None);
        }

        order.id = match self.place(&order).await {
            Ok(id) => id,
            Err(e) => {
                return Err(Error::OrderRejected {
                    reason: e.to_string(),
                    order,
                });
            }
        };

        self.state.bids.remove_at(bid_index);
        self.state.asks.push(order.clone());

        self.state.buy_threshold = (self.state.buy_threshold + self.config.threshold_increment)
            .min(self.config.buy_threshold_max);
        self.state.sell_threshold += self.config.sell_decrement;

        Ok(Some(order))
    }

    /// Hand the order to the exchange, or synthesize a surrogate id in
    /// simulation mode so the ledger flow stays identical.
    async fn place(&self, order: &Order) -> Result<String> {
        if self.config.simulation {
            return Ok(Uuid::new_v4().to_string());
        }

        match order.kind {
            OrderKind::Buy => self.market.buy(order).await,
            OrderKind::Sell => self.market.sell(order).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SummaryData;
    use crate::exchanges::sim::{SimExchange, SimMarket};
    use crate::store::SqliteStore;
    use crate::trading::ledger::OrderLedger;

    fn test_config(market: &str) -> TraderConfig {
        let mut config = TraderConfig::for_market(market);
        config.simulation = false;
        config
    }

    fn test_store() -> (tempfile::TempDir, Arc<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(SqliteStore::open(dir.path().join("trader_test.db"), "trader_test").unwrap());
        (dir, store)
    }

    async fn test_trader(market: Arc<SimMarket>, store: Arc<SqliteStore>) -> Trader {
        let config = test_config(market.name());
        let exchange = Arc::new(SimExchange::new(Arc::clone(&market)));
        Trader::new(exchange, store, config).await.unwrap()
    }

    fn filled_bid(price: f64) -> Order {
        let mut order = Order::buy(price, 1.0);
        order.id = "bid-1".to_string();
        order.filled = true;
        order
    }

    fn descending_window() -> Vec<SummaryData> {
        (0..=1000)
            .map(|i| SummaryData {
                weighted_average: 0.1 - (i as f64 + 500.0) * 0.00002,
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_new_trader() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let trader = test_trader(market, store).await;

        assert_eq!(trader.market.currency(), "ABC");
        assert_eq!(trader.base_currency, "BTC");
        assert_eq!(trader.alt_currency, "ABC");
        assert_eq!(trader.state_key, "trader_state.BTC_ABC");
    }

    #[tokio::test]
    async fn test_new_trader_unknown_market() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_QWERTY"));
        market.set_exists(false);
        let exchange = Arc::new(SimExchange::new(Arc::clone(&market)));

        let result = Trader::new(exchange, store, test_config("BTC_QWERTY")).await;

        assert!(matches!(result, Err(Error::MarketNotFound(_))));
    }

    #[tokio::test]
    async fn test_should_buy() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        trader.state.buy_threshold = 42;
        trader.config.volatility_factor = 1.02;

        let mut market_data = MarketData::default();
        market_data.volatility_index = 1.023;
        market_data.percentiles[42] = 0.004132;
        market_data.current_price = 0.004029;

        assert!(trader.should_buy(&market_data));

        market_data.current_price = 0.004177;
        assert!(!trader.should_buy(&market_data));

        market_data.current_price = 0.004029;
        market_data.volatility_index = 1.019;
        assert!(!trader.should_buy(&market_data));
    }

    #[tokio::test]
    async fn test_can_buy() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        trader.config.estimated_fee = 0.0025;
        trader.base_balance.available = 2.5;
        let order = Order::buy(0.025, 100.0);

        assert!(!trader.can_buy(&order));

        trader.base_balance.available = 2.51;
        assert!(trader.can_buy(&order));
    }

    #[tokio::test]
    async fn test_build_buy_order() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;
        trader.config.buy_budget = 0.0125;

        let market_data = MarketData {
            current_price: 0.00392,
            ..Default::default()
        };

        let order = trader.build_buy_order(&market_data);

        assert_eq!(order.kind, OrderKind::Buy);
        assert!((order.price - 0.0039004).abs() < 1e-8);
        assert!((order.amount - 3.2047995).abs() < 1e-8);
        assert!((order.total - 0.0125).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_load_market_data() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        market.set_summary_window(descending_window());
        market.set_current_price(0.54);
        let trader = test_trader(market, store).await;

        let market_data = trader.load_market_data().await.unwrap();

        assert_eq!(market_data.current_price, 0.54);
        assert!((market_data.volatility_index - 1.025316).abs() < 1e-6);
        assert!((market_data.low - 0.07).abs() < 1e-12);
        assert!((market_data.high - 0.09).abs() < 1e-12);

        for i in 1..=100 {
            assert!(
                market_data.percentiles[i] >= market_data.percentiles[i - 1],
                "expected pct_{} ({}) >= pct_{} ({})",
                i,
                market_data.percentiles[i],
                i - 1,
                market_data.percentiles[i - 1]
            );
        }
    }

    #[tokio::test]
    async fn test_load_market_data_empty_window() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let trader = test_trader(market, store).await;

        let result = trader.load_market_data().await;

        assert!(matches!(result, Err(Error::MarketData(_))));
    }

    #[tokio::test]
    async fn test_should_sell() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        trader.state.sell_threshold = 1.06;
        let mut unfilled = Order::buy(0.01, 1.0);
        unfilled.id = "bid-2".to_string();
        trader.state.bids = OrderLedger::from(vec![filled_bid(0.1), unfilled.clone()]);

        let mut market_data = MarketData::default();
        market_data.current_price = 0.107;
        assert!(trader.should_sell(&market_data));

        market_data.current_price = 0.105;
        assert!(!trader.should_sell(&market_data));

        let mut no_longer_filled = filled_bid(0.1);
        no_longer_filled.filled = false;
        trader.state.bids = OrderLedger::from(vec![no_longer_filled, unfilled]);
        assert!(!trader.should_sell(&market_data));
    }

    #[tokio::test]
    async fn test_build_sell_order() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        trader.config.sell_ratio = 0.5;
        trader.config.estimated_fee = 0.005;
        trader.alt_balance.available = 100.0;

        let mut market_data = MarketData {
            current_price: 0.107,
            ..Default::default()
        };

        let order = trader.build_sell_order(&market_data);

        assert_eq!(order.kind, OrderKind::Sell);
        assert_eq!(order.amount, 50.0);
        assert!((order.price - 0.1075350).abs() < 1e-8);
        assert!((order.total - 5.37675).abs() < 1e-5);

        // ratio-derived amount below the budget notional gets raised
        trader.config.buy_budget = 0.1;
        market_data.current_price = 0.025;
        trader.alt_balance.available = 6.0;

        let order = trader.build_sell_order(&market_data);

        assert!((order.amount - 3.980).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_can_sell() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        let order = Order::sell(0.1, 10.0);
        trader.alt_balance.available = 10.0;

        assert!(trader.can_sell(&order));

        trader.alt_balance.available = 9.99;
        assert!(!trader.can_sell(&order));
    }

    #[tokio::test]
    async fn test_load_balances() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_XYZ"));
        let exchange = Arc::new(SimExchange::new(Arc::clone(&market)));
        exchange.set_balance("BTC", 1.23);
        exchange.set_balance("XYZ", 142.73);

        let mut trader = Trader::new(exchange, store, test_config("BTC_XYZ"))
            .await
            .unwrap();

        trader.load_balances().await.unwrap();

        assert_eq!(trader.base_balance.available, 1.23);
        assert_eq!(trader.alt_balance.available, 142.73);
    }

    #[tokio::test]
    async fn test_reconcile() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_XYZ"));
        let mut trader = test_trader(Arc::clone(&market), store).await;

        let mut bids = Vec::new();
        for (id, price) in [("foo", 0.24), ("bar", 0.19), ("baz", 0.27)] {
            let mut order = Order::buy(price, 1.0);
            order.id = id.to_string();
            bids.push(order);
        }
        trader.state.bids = OrderLedger::from(bids);

        let mut ask = Order::sell(0.29, 1.0);
        ask.id = "boggle".to_string();
        trader.state.asks = OrderLedger::from(vec![ask]);

        let mut pending = Order::buy(0.27, 1.0);
        pending.id = "baz".to_string();
        market.set_pending(vec![pending]);

        trader.reconcile().await.unwrap();

        assert_eq!(trader.state.bids.len(), 3);
        assert_eq!(trader.state.bids.get(0).unwrap().id, "foo");
        assert!(trader.state.bids.get(0).unwrap().filled);
        assert_eq!(trader.state.bids.get(1).unwrap().id, "bar");
        assert!(trader.state.bids.get(1).unwrap().filled);
        assert_eq!(trader.state.bids.get(2).unwrap().id, "baz");
        assert!(!trader.state.bids.get(2).unwrap().filled);

        assert_eq!(trader.state.asks.len(), 0);
    }

    #[tokio::test]
    async fn test_state_roundtrip() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_TESTING"));
        let mut trader = test_trader(Arc::clone(&market), Arc::clone(&store)).await;

        trader.store.delete(&trader.state_key).unwrap();
        trader.load_state().unwrap();

        trader.state.buy_threshold = 36;
        trader.state.sell_threshold = 1.123;
        trader.state.bids = OrderLedger::from(vec![Order::buy(0.1, 1.0), Order::buy(0.2, 1.0)]);
        trader.state.asks = OrderLedger::from(vec![Order::sell(0.3, 1.0)]);

        trader.save_state().unwrap();

        let mut reloaded = test_trader(market, store).await;
        reloaded.load_state().unwrap();

        assert_eq!(reloaded.state.buy_threshold, 36);
        assert_eq!(reloaded.state.sell_threshold, 1.123);
        assert_eq!(reloaded.state.bids.len(), 2);
        assert_eq!(reloaded.state.asks.len(), 1);
        assert_eq!(reloaded.state.bids.get(1).unwrap().price, 0.2);
    }

    #[tokio::test]
    async fn test_buy() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(Arc::clone(&market), store).await;

        trader.base_balance.available = 0.25;

        // successful order adjusts the buy threshold
        let mut market_data = MarketData::default();
        market_data.volatility_index = 1.03;
        market_data.percentiles[50] = 0.06;
        market_data.current_price = 0.05;

        let order = trader.buy(&market_data).await.unwrap().unwrap();

        assert!(!order.id.is_empty());
        assert_eq!(trader.state.bids.len(), 1);
        assert_eq!(trader.state.bids.get(0).unwrap().id, order.id);
        assert_eq!(trader.state.buy_threshold, 48);
        assert_eq!(trader.state.sell_threshold, 1.06);

        // at the floor the buy threshold stays put, sell threshold drops
        trader.state.buy_threshold = 10;
        trader.state.sell_threshold = 1.08;
        market_data.percentiles[10] = 0.06;
        market_data.current_price = 0.05;

        trader.buy(&market_data).await.unwrap().unwrap();

        assert_eq!(trader.state.bids.len(), 2);
        assert_eq!(trader.state.buy_threshold, 10);
        assert_eq!(trader.state.sell_threshold, 1.07);

        // price above the threshold percentile: no buy
        trader.state.buy_threshold = 50;
        trader.state.sell_threshold = 1.08;
        market_data.current_price = 0.07;

        let order = trader.buy(&market_data).await.unwrap();

        assert!(order.is_none());
        assert_eq!(trader.state.buy_threshold, 50);
        assert_eq!(trader.state.sell_threshold, 1.08);

        // insufficient balance: no buy, no state change
        market_data.current_price = 0.05;
        trader.base_balance.available = 0.001;

        let order = trader.buy(&market_data).await.unwrap();

        assert!(order.is_none());
        assert_eq!(trader.state.buy_threshold, 50);
        assert_eq!(trader.state.sell_threshold, 1.08);

        // placement failure surfaces the unplaced order, nothing recorded
        market.set_trigger_buy_error(true);
        trader.base_balance.available = 0.1;

        let err = trader.buy(&market_data).await.unwrap_err();

        match err {
            Error::OrderRejected { order, reason } => {
                assert!(reason.contains("fake buy error"));
                assert!(order.id.is_empty());
                assert!((order.price - 0.04975).abs() < 1e-12);
            }
            other => panic!("expected OrderRejected, got {:?}", other),
        }
        assert_eq!(trader.state.bids.len(), 2);
        assert_eq!(trader.state.buy_threshold, 50);
        assert_eq!(trader.state.sell_threshold, 1.08);
    }

    #[tokio::test]
    async fn test_sell() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(Arc::clone(&market), store).await;

        let market_data = MarketData {
            current_price: 0.05,
            ..Default::default()
        };

        // price below the profit threshold: no sell
        trader.state.sell_threshold = 1.06;
        trader.state.bids = OrderLedger::from(vec![filled_bid(0.053)]);

        let order = trader.sell(&market_data).await.unwrap();

        assert!(order.is_none());
        assert_eq!(trader.state.sell_threshold, 1.06);
        assert_eq!(trader.state.buy_threshold, 50);

        // nothing available to sell: no sell, no state change
        trader.state.bids = OrderLedger::from(vec![filled_bid(0.04)]);
        trader.alt_balance.available = 0.0;

        let order = trader.sell(&market_data).await.unwrap();

        assert!(order.is_none());
        assert_eq!(trader.state.sell_threshold, 1.06);
        assert_eq!(trader.state.buy_threshold, 50);

        // placement failure leaves thresholds and ledgers untouched
        market.set_trigger_sell_error(true);
        trader.alt_balance.available = 400.0;

        let err = trader.sell(&market_data).await.unwrap_err();

        match err {
            Error::OrderRejected { order, reason } => {
                assert!(reason.contains("fake sell error"));
                assert!(order.id.is_empty());
            }
            other => panic!("expected OrderRejected, got {:?}", other),
        }
        assert_eq!(trader.state.sell_threshold, 1.06);
        assert_eq!(trader.state.buy_threshold, 50);
        assert_eq!(trader.state.bids.len(), 1);
        assert_eq!(trader.state.asks.len(), 0);

        // successful sell closes the bid and backs off both thresholds
        market.set_trigger_sell_error(false);
        trader.state.buy_threshold = 42;

        let order = trader.sell(&market_data).await.unwrap().unwrap();

        assert!(!order.id.is_empty());
        assert_eq!(trader.state.sell_threshold, 1.07);
        assert_eq!(trader.state.buy_threshold, 44);
        assert_eq!(trader.state.bids.len(), 0);
        assert_eq!(trader.state.asks.len(), 1);
        assert_eq!(trader.state.asks.get(0).unwrap().id, order.id);

        // at the ceiling the buy threshold stays pinned, sell threshold still rises
        trader.state.buy_threshold = 50;
        trader.state.sell_threshold = 1.06;
        trader.state.bids = OrderLedger::from(vec![filled_bid(0.04)]);

        trader.sell(&market_data).await.unwrap().unwrap();

        assert_eq!(trader.state.buy_threshold, 50);
        assert_eq!(trader.state.sell_threshold, 1.07);
        assert_eq!(trader.state.bids.len(), 0);
        assert_eq!(trader.state.asks.len(), 2);
    }

    #[tokio::test]
    async fn test_sell_closes_latest_filled_bid() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_ABC"));
        let mut trader = test_trader(market, store).await;

        let mut older = filled_bid(0.03);
        older.id = "older".to_string();
        let mut newest = filled_bid(0.04);
        newest.id = "newest".to_string();
        let mut open = Order::buy(0.05, 1.0);
        open.id = "open".to_string();

        trader.state.bids = OrderLedger::from(vec![older, newest, open]);
        trader.state.sell_threshold = 1.06;
        trader.alt_balance.available = 400.0;

        let market_data = MarketData {
            current_price: 0.05,
            ..Default::default()
        };

        trader.sell(&market_data).await.unwrap().unwrap();

        assert_eq!(trader.state.bids.len(), 2);
        assert_eq!(trader.state.bids.get(0).unwrap().id, "older");
        assert_eq!(trader.state.bids.get(1).unwrap().id, "open");
    }

    #[tokio::test]
    async fn test_trade_full_tick() {
        let (_dir, store) = test_store();
        let market = Arc::new(SimMarket::new("BTC_XYZ"));
        market.set_summary_window(descending_window());
        market.set_current_price(0.075);

        let exchange = Arc::new(SimExchange::new(Arc::clone(&market)));
        exchange.set_balance("BTC", 1.0);
        exchange.set_balance("XYZ", 0.0);

        let mut trader = Trader::new(exchange, Arc::clone(&store) as Arc<dyn Store>, test_config("BTC_XYZ"))
            .await
            .unwrap();

        trader.trade().await.unwrap();

        // pct_50 of the window is 0.08 and the volatility gate passes, so
        // the tick buys and persists the adjusted state
        assert_eq!(trader.state.bids.len(), 1);
        assert_eq!(trader.state.buy_threshold, 48);

        assert!(store.has_data("trader_state.BTC_XYZ").unwrap());

        let mut reloaded = Trader::new(
            Arc::new(SimExchange::new(Arc::clone(&market))),
            store,
            test_config("BTC_XYZ"),
        )
        .await
        .unwrap();
        reloaded.load_state().unwrap();

        assert_eq!(reloaded.state.buy_threshold, 48);
        assert_eq!(reloaded.state.bids.len(), 1);
        assert!(!reloaded.state.bids.get(0).unwrap().id.is_empty());
    }
}
