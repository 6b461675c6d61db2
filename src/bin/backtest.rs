//! Replay imported candles through the trading engine against the sim
//! venue and report the outcome.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use tidebot::core::{AppConfig, Exchange, SummaryData};
use tidebot::exchanges::{SimExchange, SimMarket};
use tidebot::store::SqliteStore;
use tidebot::trading::Trader;

const START_BASE_BALANCE: f64 = 1.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tidebot=info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: tidebot-backtest <config.toml>");
            std::process::exit(1);
        }
    };

    let config = AppConfig::load(&config_path)?;
    let mut trader_config = config.trader.clone();
    // orders must flow through the sim venue, not get surrogate ids
    trader_config.simulation = false;

    let market_name = trader_config.market.clone();
    let (base_currency, alt_currency) = trader_config.currencies()?;

    let candle_store = SqliteStore::open(
        &config.store.path,
        &format!("chart_data.{}", market_name),
    )?;
    let candles: Vec<SummaryData> = candle_store.scan()?;
    if candles.is_empty() {
        anyhow::bail!(
            "no imported candles for {}; run tidebot-import first",
            market_name
        );
    }

    // every run starts from a clean slate
    let state_store = Arc::new(SqliteStore::open(
        &config.store.path,
        &format!("backtest.{}", market_name),
    )?);
    state_store.clear()?;

    let market = Arc::new(SimMarket::new(&market_name));
    let exchange = Arc::new(SimExchange::new(Arc::clone(&market)));
    exchange.set_balance(&base_currency, START_BASE_BALANCE);
    exchange.set_balance(&alt_currency, 0.0);

    let mut trader = Trader::new(
        Arc::clone(&exchange) as Arc<dyn Exchange>,
        state_store,
        trader_config.clone(),
    )
    .await?;

    let window = trader_config.time_window_secs;
    let first_date = candles[0].date;
    let warmup = candles
        .iter()
        .position(|candle| candle.date - first_date >= window)
        .unwrap_or(candles.len());

    println!("==================================================");
    println!("📊 Tidebot Backtest: {}", market_name);
    println!("==================================================");
    println!(
        "candles={} warmup={} window={}s budget={}",
        candles.len(),
        warmup,
        window,
        trader_config.buy_budget
    );

    let mut ticks = 0u64;
    let mut failed_ticks = 0u64;
    let mut fills = 0u64;
    let mut start_index = 0usize;

    for i in warmup..candles.len() {
        let candle = &candles[i];

        // settle orders placed on earlier ticks against this candle
        for fill in market.settle_candle(candle) {
            fills += 1;
            tracing::debug!(
                "fill kind={} price={:.9} amount={:.9} id={}",
                fill.kind,
                fill.price,
                fill.amount,
                fill.id
            );
        }

        while candles[start_index].date < candle.date - window {
            start_index += 1;
        }
        market.set_summary_window(candles[start_index..=i].to_vec());
        market.set_current_price(candle.weighted_average);

        match trader.trade().await {
            Ok(()) => ticks += 1,
            Err(e) => {
                failed_ticks += 1;
                tracing::warn!("tick at {} failed: {}", candle.date, e);
            }
        }
    }

    let last_price = candles[candles.len() - 1].weighted_average;
    let base = exchange.balance(&base_currency).await?;
    let alt = exchange.balance(&alt_currency).await?;
    let final_value =
        base.available + base.on_orders + (alt.available + alt.on_orders) * last_price;
    let net_return = (final_value / START_BASE_BALANCE - 1.0) * 100.0;

    println!("--------------------------------------------------");
    println!("ticks={} failed={} orders={} fills={}", ticks, failed_ticks, market.placed_orders().len(), fills);
    println!(
        "open bids={} open asks={} buy_threshold={} sell_threshold={:.4}",
        trader.state().bids.len(),
        trader.state().asks.len(),
        trader.state().buy_threshold,
        trader.state().sell_threshold
    );
    for bid in trader.state().bids.iter() {
        println!(
            "  bid price={:.9} amount={:.9} filled={}",
            bid.price, bid.amount, bid.filled
        );
    }
    for ask in trader.state().asks.iter() {
        println!("  ask price={:.9} amount={:.9}", ask.price, ask.amount);
    }
    println!(
        "{}: available={:.8} on_orders={:.8}",
        base_currency, base.available, base.on_orders
    );
    println!(
        "{}: available={:.8} on_orders={:.8}",
        alt_currency, alt.available, alt.on_orders
    );
    println!(
        "final value={:.8} {} (marked at {:.8}) net return={:+.2}%",
        final_value, base_currency, last_price, net_return
    );
    println!("==================================================");

    Ok(())
}
