//! Central configuration, loaded once at startup from `config.toml`.
//!
//! All trading parameters are runtime-configurable. API credentials are
//! never stored here; they come from `PLX_API_KEY` / `PLX_API_SECRET`.

use std::path::Path;

use serde::Deserialize;

use crate::core::{Error, Result};

/// Decision-engine parameters for one market.
#[derive(Debug, Clone, Deserialize)]
pub struct TraderConfig {
    /// Market to trade, in `BASE_ALT` form (e.g. "BTC_XRP")
    pub market: String,
    /// Initial percentile index below which buying is considered
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: usize,
    /// Lower bound for the adaptive buy threshold
    #[serde(default = "default_buy_threshold_min")]
    pub buy_threshold_min: usize,
    /// Upper bound for the adaptive buy threshold
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold_max: usize,
    /// Percentile steps the buy threshold moves per trade
    #[serde(default = "default_threshold_increment")]
    pub threshold_increment: usize,
    /// Initial multiplier over the entry price required to sell
    #[serde(default = "default_profit_factor")]
    pub sell_threshold: f64,
    /// Amount the sell threshold moves per trade
    #[serde(default = "default_sell_decrement")]
    pub sell_decrement: f64,
    /// Floor for the adaptive sell threshold
    #[serde(default = "default_profit_factor")]
    pub profit_factor: f64,
    /// Minimum volatility index required to buy
    #[serde(default = "default_volatility_factor")]
    pub volatility_factor: f64,
    /// Fixed base-currency budget per buy order
    #[serde(default = "default_buy_budget")]
    pub buy_budget: f64,
    /// Fraction of the available alt balance offered per sell order
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: f64,
    /// Exchange fee estimate folded into order prices
    #[serde(default = "default_estimated_fee")]
    pub estimated_fee: f64,
    /// Observation window for percentile statistics, in seconds
    #[serde(default = "default_time_window")]
    pub time_window_secs: i64,
    /// Lower percentile index for the volatility ratio
    #[serde(default = "default_lower_percentile")]
    pub lower_percentile: usize,
    /// Upper percentile index for the volatility ratio
    #[serde(default = "default_upper_percentile")]
    pub upper_percentile: usize,
    /// When true, orders never reach the exchange; surrogate ids are
    /// synthesized locally
    #[serde(default = "default_simulation")]
    pub simulation: bool,
}

fn default_buy_threshold() -> usize {
    50
}
fn default_buy_threshold_min() -> usize {
    10
}
fn default_threshold_increment() -> usize {
    2
}
fn default_profit_factor() -> f64 {
    1.06
}
fn default_sell_decrement() -> f64 {
    0.01
}
fn default_volatility_factor() -> f64 {
    1.02
}
fn default_buy_budget() -> f64 {
    0.01
}
fn default_sell_ratio() -> f64 {
    0.5
}
fn default_estimated_fee() -> f64 {
    0.005
}
fn default_time_window() -> i64 {
    24 * 60 * 60
}
fn default_lower_percentile() -> usize {
    45
}
fn default_upper_percentile() -> usize {
    55
}
fn default_simulation() -> bool {
    true
}

impl TraderConfig {
    /// Minimal config for the given market, everything else defaulted.
    pub fn for_market(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            buy_threshold: default_buy_threshold(),
            buy_threshold_min: default_buy_threshold_min(),
            buy_threshold_max: default_buy_threshold(),
            threshold_increment: default_threshold_increment(),
            sell_threshold: default_profit_factor(),
            sell_decrement: default_sell_decrement(),
            profit_factor: default_profit_factor(),
            volatility_factor: default_volatility_factor(),
            buy_budget: default_buy_budget(),
            sell_ratio: default_sell_ratio(),
            estimated_fee: default_estimated_fee(),
            time_window_secs: default_time_window(),
            lower_percentile: default_lower_percentile(),
            upper_percentile: default_upper_percentile(),
            simulation: default_simulation(),
        }
    }

    /// Split the market name into (base, alt) currencies.
    pub fn currencies(&self) -> Result<(String, String)> {
        match self.market.split_once('_') {
            Some((base, alt)) if !base.is_empty() && !alt.is_empty() => {
                Ok((base.to_string(), alt.to_string()))
            }
            _ => Err(Error::Config(format!(
                "market must be in BASE_ALT form, got: {}",
                self.market
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.currencies()?;

        if self.buy_threshold_max > 100 {
            return Err(Error::Config(format!(
                "buy_threshold_max must be <= 100, got {}",
                self.buy_threshold_max
            )));
        }
        if self.buy_threshold_min > self.buy_threshold_max {
            return Err(Error::Config(format!(
                "buy_threshold_min ({}) must be <= buy_threshold_max ({})",
                self.buy_threshold_min, self.buy_threshold_max
            )));
        }
        if self.buy_threshold < self.buy_threshold_min || self.buy_threshold > self.buy_threshold_max
        {
            return Err(Error::Config(format!(
                "buy_threshold ({}) must be within [{}, {}]",
                self.buy_threshold, self.buy_threshold_min, self.buy_threshold_max
            )));
        }
        if self.sell_threshold < self.profit_factor {
            return Err(Error::Config(format!(
                "sell_threshold ({}) must be >= profit_factor ({})",
                self.sell_threshold, self.profit_factor
            )));
        }
        if !(0.0..1.0).contains(&self.estimated_fee) {
            return Err(Error::Config(format!(
                "estimated_fee must be within [0, 1), got {}",
                self.estimated_fee
            )));
        }
        if self.buy_budget <= 0.0 {
            return Err(Error::Config(format!(
                "buy_budget must be positive, got {}",
                self.buy_budget
            )));
        }
        if !(0.0..=1.0).contains(&self.sell_ratio) || self.sell_ratio == 0.0 {
            return Err(Error::Config(format!(
                "sell_ratio must be within (0, 1], got {}",
                self.sell_ratio
            )));
        }
        if self.time_window_secs <= 0 {
            return Err(Error::Config(format!(
                "time_window_secs must be positive, got {}",
                self.time_window_secs
            )));
        }
        if self.lower_percentile == 0
            || self.lower_percentile >= self.upper_percentile
            || self.upper_percentile > 100
        {
            return Err(Error::Config(format!(
                "percentile bounds must satisfy 0 < lower < upper <= 100, got {}/{}",
                self.lower_percentile, self.upper_percentile
            )));
        }

        Ok(())
    }
}

/// Exchange endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://poloniex.com".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "tidebot.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Tick scheduling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Offset into each interval at which the tick fires
    #[serde(default = "default_offset_secs")]
    pub offset_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}
fn default_offset_secs() -> u64 {
    15
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            offset_secs: default_offset_secs(),
        }
    }
}

/// Top-level config file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub trader: TraderConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load and validate config from the given TOML file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        config.trader.validate()?;

        Ok(config)
    }

    /// Load from the default locations (project root config.toml).
    pub fn load_default() -> Result<Self> {
        let candidates = [
            "config.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml"),
        ];

        for path in &candidates {
            if Path::new(path).is_file() {
                let cfg = Self::load(Path::new(path))?;
                tracing::info!("📋 Loaded config from {}", path);
                return Ok(cfg);
            }
        }

        Err(Error::Config(
            "no config.toml found; pass a path on the command line".to_string(),
        ))
    }
}
