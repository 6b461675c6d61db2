//! Tick scheduler aligned to wall-clock interval boundaries.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::core::{Error, Result};
use crate::trading::Trader;

pub struct Scheduler {
    interval: Duration,
    offset: Duration,
}

impl Scheduler {
    pub fn new(interval_secs: u64, offset_secs: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(Error::Config(
                "scheduler interval must be positive".to_string(),
            ));
        }
        if offset_secs >= interval_secs {
            return Err(Error::Config(format!(
                "scheduler offset ({offset_secs}s) must be smaller than the interval ({interval_secs}s)"
            )));
        }

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            offset: Duration::from_secs(offset_secs),
        })
    }

    /// Time until the next interval boundary plus offset, strictly in the
    /// future. Ticks land `offset` seconds past each boundary so the candle
    /// closing that boundary is available by the time it is read.
    pub fn delay_until_next_tick(&self, now: i64) -> Duration {
        let interval = self.interval.as_secs() as i64;
        let offset = self.offset.as_secs() as i64;

        let phase = now.rem_euclid(interval);
        let mut wait = offset - phase;
        if wait <= 0 {
            wait += interval;
        }

        Duration::from_secs(wait as u64)
    }

    /// Drive the trader forever. A failed tick is logged and skipped; the
    /// next tick retries from the last persisted state.
    pub async fn run(&self, trader: &mut Trader) -> Result<()> {
        info!(
            "⏱️ scheduling ticks every {}s at +{}s past the boundary",
            self.interval.as_secs(),
            self.offset.as_secs()
        );

        loop {
            let delay = self.delay_until_next_tick(Utc::now().timestamp());
            tokio::time::sleep(delay).await;

            if let Err(e) = trader.trade().await {
                error!("market={} tick failed: {}", trader.config().market, e);
            }
        }
    }
}
