//! Wire types for the Poloniex REST API.
//!
//! Poloniex serializes most numbers as JSON strings; fields stay `String`
//! here and get parsed at the exchange-adapter boundary.

use serde::Deserialize;

use crate::core::SummaryData;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlxTicker {
    pub id: i64,
    pub last: String,
    pub lowest_ask: String,
    pub highest_bid: String,
    pub percent_change: String,
    pub base_volume: String,
    pub quote_volume: String,
    #[serde(default)]
    pub is_frozen: String,
}

/// One `returnChartData` candle. Unlike the rest of the API these come
/// back as JSON numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlxCandle {
    pub date: i64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub weighted_average: f64,
}

impl PlxCandle {
    pub fn into_summary(self) -> SummaryData {
        SummaryData {
            date: self.date,
            high: self.high,
            low: self.low,
            open: self.open,
            close: self.close,
            volume: self.volume,
            quote_volume: self.quote_volume,
            weighted_average: self.weighted_average,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlxCompleteBalance {
    pub available: String,
    pub on_orders: String,
    pub btc_value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlxOpenOrder {
    pub order_number: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rate: String,
    pub amount: String,
    pub total: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_number: String,
    #[serde(default)]
    pub resulting_trades: Vec<serde_json::Value>,
}
