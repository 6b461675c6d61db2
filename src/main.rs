use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use tidebot::core::AppConfig;
use tidebot::exchanges::PlxExchange;
use tidebot::plx_api::{Credentials, PlxClient};
use tidebot::scheduler::Scheduler;
use tidebot::store::SqliteStore;
use tidebot::trading::Trader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Initialize logger
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tidebot=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    tracing::info!("🌊 Tidebot starting...");

    // 2. Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::load_default()?,
    };
    tracing::info!(
        "📈 market={} simulation={} budget={}",
        config.trader.market,
        config.trader.simulation,
        config.trader.buy_budget
    );

    // 3. Open the state store
    let store = Arc::new(SqliteStore::open(&config.store.path, "trader")?);

    // 4. Connect the exchange. Credentials are required in every mode:
    // each tick reads open orders and balances through the private API.
    let Some(credentials) = Credentials::from_env() else {
        anyhow::bail!("PLX_API_KEY and PLX_API_SECRET must be set");
    };
    let client = PlxClient::with_credentials(&config.exchange.base_url, credentials);
    let exchange = Arc::new(PlxExchange::new(client));

    // 5. Boot the trader and tick forever
    let mut trader = Trader::new(exchange, store, config.trader.clone()).await?;
    let scheduler = Scheduler::new(config.scheduler.interval_secs, config.scheduler.offset_secs)?;

    scheduler.run(&mut trader).await?;
    Ok(())
}
