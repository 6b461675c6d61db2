//! Poloniex exchange adapter.
//!
//! Bridges the string-typed wire models onto the core trait types. All
//! numeric parsing happens here so the trading engine only ever sees f64.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Balance, Error, Exchange, Market, Order, OrderKind, Result, SummaryData};
use crate::plx_api::PlxClient;
use crate::plx_api::model::PlxOpenOrder;

/// Candle resolution for the observation window.
const CHART_PERIOD_SECS: i64 = 300;

pub struct PlxExchange {
    client: Arc<PlxClient>,
}

impl PlxExchange {
    pub fn new(client: PlxClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl Exchange for PlxExchange {
    fn name(&self) -> &str {
        "poloniex"
    }

    async fn market(&self, name: &str) -> Result<Arc<dyn Market>> {
        let market = PlxMarket::new(Arc::clone(&self.client), name);
        Ok(Arc::new(market) as Arc<dyn Market>)
    }

    async fn balance(&self, currency: &str) -> Result<Balance> {
        let balances = self.client.complete_balances().await?;

        match balances.get(currency) {
            Some(raw) => Ok(Balance {
                currency: currency.to_string(),
                available: parse_f64("available", &raw.available)?,
                on_orders: parse_f64("onOrders", &raw.on_orders)?,
                btc_value: parse_f64("btcValue", &raw.btc_value)?,
            }),
            None => Ok(Balance::new(currency)),
        }
    }
}

pub struct PlxMarket {
    client: Arc<PlxClient>,
    name: String,
    currency: String,
}

impl PlxMarket {
    pub fn new(client: Arc<PlxClient>, name: &str) -> Self {
        let currency = match name.split_once('_') {
            Some((_, alt)) => alt.to_string(),
            None => name.to_string(),
        };

        Self {
            client,
            name: name.to_string(),
            currency,
        }
    }
}

#[async_trait]
impl Market for PlxMarket {
    fn name(&self) -> &str {
        &self.name
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    async fn exists(&self) -> Result<bool> {
        let ticker = self.client.ticker().await?;
        Ok(ticker.contains_key(&self.name))
    }

    async fn current_price(&self) -> Result<f64> {
        let ticker = self.client.ticker().await?;
        let entry = ticker
            .get(&self.name)
            .ok_or_else(|| Error::MarketNotFound(self.name.clone()))?;
        parse_f64("last", &entry.last)
    }

    async fn summary_data(&self, start: i64, end: i64) -> Result<Vec<SummaryData>> {
        let candles = self
            .client
            .chart_data(&self.name, start, end, CHART_PERIOD_SECS)
            .await?;

        // an empty range comes back as a single all-zero candle
        Ok(candles
            .into_iter()
            .filter(|candle| candle.date != 0)
            .map(|candle| candle.into_summary())
            .collect())
    }

    async fn pending_orders(&self) -> Result<Vec<Order>> {
        let open = self.client.open_orders(&self.name).await?;
        open.iter().map(order_from_wire).collect()
    }

    async fn buy(&self, order: &Order) -> Result<String> {
        let response = self
            .client
            .place_order(OrderKind::Buy, &self.name, order.price, order.amount)
            .await?;
        Ok(response.order_number)
    }

    async fn sell(&self, order: &Order) -> Result<String> {
        let response = self
            .client
            .place_order(OrderKind::Sell, &self.name, order.price, order.amount)
            .await?;
        Ok(response.order_number)
    }
}

fn order_from_wire(raw: &PlxOpenOrder) -> Result<Order> {
    Ok(Order {
        id: raw.order_number.clone(),
        kind: parse_kind(&raw.kind)?,
        price: parse_f64("rate", &raw.rate)?,
        amount: parse_f64("amount", &raw.amount)?,
        total: parse_f64("total", &raw.total)?,
        filled: false,
    })
}

fn parse_kind(value: &str) -> Result<OrderKind> {
    match value {
        "buy" => Ok(OrderKind::Buy),
        "sell" => Ok(OrderKind::Sell),
        other => Err(Error::Exchange(format!("unknown order type: {other}"))),
    }
}

fn parse_f64(field: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| Error::Exchange(format!("invalid {field} value: {value}")))
}
