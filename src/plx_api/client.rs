//! HTTP client for the Poloniex REST API.
//!
//! Public endpoints are plain GETs against `/public`. Private endpoints
//! POST a urlencoded body to `/tradingApi` signed with HMAC-SHA512 over
//! the exact body bytes, carried in `Key` and `Sign` headers.

use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use sha2::Sha512;

use crate::core::{Error, OrderKind, Result};
use crate::plx_api::model::{
    PlaceOrderResponse, PlxCandle, PlxCompleteBalance, PlxOpenOrder, PlxTicker,
};

type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    /// Read `PLX_API_KEY` / `PLX_API_SECRET` from the environment.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("PLX_API_KEY").ok()?;
        let secret = std::env::var("PLX_API_SECRET").ok()?;
        Some(Self { key, secret })
    }
}

pub struct PlxClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl PlxClient {
    /// Client for public endpoints only.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(base_url: &str, credentials: Credentials) -> Self {
        let mut client = Self::new(base_url);
        client.credentials = Some(credentials);
        client
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub async fn ticker(&self) -> Result<HashMap<String, PlxTicker>> {
        let url = format!("{}/public?command=returnTicker", self.base_url);
        let json = self.fetch_json(self.client.get(&url), "returnTicker").await?;
        Ok(serde_json::from_value(json)?)
    }

    pub async fn chart_data(
        &self,
        pair: &str,
        start: i64,
        end: i64,
        period: i64,
    ) -> Result<Vec<PlxCandle>> {
        let url = format!(
            "{}/public?command=returnChartData&currencyPair={}&start={}&end={}&period={}",
            self.base_url, pair, start, end, period
        );
        let json = self
            .fetch_json(self.client.get(&url), "returnChartData")
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    pub async fn complete_balances(&self) -> Result<HashMap<String, PlxCompleteBalance>> {
        let json = self.trading_post("returnCompleteBalances", &[]).await?;
        Ok(serde_json::from_value(json)?)
    }

    pub async fn open_orders(&self, pair: &str) -> Result<Vec<PlxOpenOrder>> {
        let json = self
            .trading_post("returnOpenOrders", &[("currencyPair", pair.to_string())])
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    pub async fn place_order(
        &self,
        kind: OrderKind,
        pair: &str,
        rate: f64,
        amount: f64,
    ) -> Result<PlaceOrderResponse> {
        let command = kind.to_string();
        let json = self
            .trading_post(
                &command,
                &[
                    ("currencyPair", pair.to_string()),
                    ("rate", format!("{:.8}", rate)),
                    ("amount", format!("{:.8}", amount)),
                ],
            )
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    /// Signed POST to `/tradingApi`. The nonce must increase across calls
    /// with the same key, so it comes from the microsecond clock.
    async fn trading_post(&self, command: &str, params: &[(&str, String)]) -> Result<Value> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| Error::Exchange(format!("{command} requires API credentials")))?;

        let nonce = Utc::now().timestamp_micros();
        let mut body = format!("command={}&nonce={}", command, nonce);
        for (name, value) in params {
            body.push('&');
            body.push_str(name);
            body.push('=');
            body.push_str(&urlencoding::encode(value));
        }

        let signature = sign(&credentials.secret, &body)?;

        let url = format!("{}/tradingApi", self.base_url);
        let request = self
            .client
            .post(&url)
            .header("Key", credentials.key.as_str())
            .header("Sign", signature)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);

        self.fetch_json(request, command).await
    }

    /// Send the request and surface Poloniex's error envelope. The API
    /// reports failures as `{"error": "..."}` on both 200 and non-200
    /// responses, so the body is inspected before the status code.
    async fn fetch_json(&self, request: reqwest::RequestBuilder, command: &str) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let json: Value = serde_json::from_str(&body).map_err(|_| {
            Error::Exchange(format!("{command}: unexpected response ({status}): {body}"))
        })?;

        if let Some(message) = json.get("error").and_then(Value::as_str) {
            return Err(Error::Exchange(format!("{command}: {message}")));
        }

        if !status.is_success() {
            return Err(Error::Exchange(format!("{command}: HTTP {status}")));
        }

        Ok(json)
    }
}

fn sign(secret: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Exchange("invalid API secret".to_string()))?;
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
