//! Percentile engine - pure statistics over a window of price observations

use crate::core::{Error, Result};

/// Build the 101-entry percentile table for a window of observations.
///
/// Index-based percentiles over the ascending-sorted window: entry 0 is
/// pinned to 0.0, entry 100 is the window maximum, and entry `i` is the
/// sorted value at `i * n / 100`. Ties and small windows produce coarse,
/// repeated values by construction; callers must not assume smoothness
/// for fewer than ~100 observations.
pub fn compute_percentiles(observations: &[f64]) -> Result<[f64; 101]> {
    if observations.is_empty() {
        return Err(Error::MarketData(
            "cannot compute percentiles of an empty observation window".to_string(),
        ));
    }

    let mut sorted = observations.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mut table = [0.0; 101];
    table[100] = sorted[n - 1];

    for i in 1..100 {
        table[i] = sorted[i * n / 100];
    }

    Ok(table)
}

/// Ratio of an upper to a lower percentile, used as the trade-worthiness gate.
///
/// A zero lower percentile means the window is degenerate (all-zero price
/// history) and is reported as a data error rather than propagated as +Inf.
pub fn volatility_index(table: &[f64; 101], upper: usize, lower: usize) -> Result<f64> {
    let denominator = table[lower];
    if denominator <= 0.0 {
        return Err(Error::MarketData(format!(
            "degenerate price history: percentile {} is {}",
            lower, denominator
        )));
    }

    Ok(table[upper] / denominator)
}
