//! Fetch historical candles from Poloniex and store them for backtesting.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use tidebot::core::{AppConfig, StoreExt};
use tidebot::plx_api::PlxClient;
use tidebot::store::SqliteStore;

const SECS_PER_DAY: i64 = 86_400;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tidebot=info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let mut args = std::env::args().skip(1);
    let config_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: tidebot-import <config.toml> [days] [period]");
            std::process::exit(1);
        }
    };
    let days: i64 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(7);
    let period: i64 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(300);

    let config = AppConfig::load(&config_path)?;
    let market = config.trader.market.clone();

    let store = SqliteStore::open(&config.store.path, &format!("chart_data.{}", market))?;
    let client = PlxClient::new(&config.exchange.base_url);

    let now = chrono::Utc::now().timestamp();
    tracing::info!(
        "📥 importing {} day(s) of {}s candles for {}",
        days,
        period,
        market
    );

    let mut imported = 0u64;
    for day in 0..days {
        let start = now - (days - day) * SECS_PER_DAY;
        let end = start + SECS_PER_DAY;

        let candles = client.chart_data(&market, start, end, period).await?;

        let mut stored = 0u64;
        for candle in candles {
            // an empty range comes back as a single all-zero candle
            if candle.date == 0 {
                continue;
            }
            let summary = candle.into_summary();
            // zero-padded keys keep scans in date order
            store.write(&format!("{:012}", summary.date), &summary)?;
            stored += 1;
        }
        imported += stored;

        tracing::info!("day {}/{}: {} candles", day + 1, days, stored);
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    tracing::info!(
        "✅ imported {} candles into namespace chart_data.{}",
        imported,
        market
    );
    Ok(())
}
