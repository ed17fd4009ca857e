//! Simple Moving Average indicator.
//!
//! Mean of the trailing `n` closes. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let sma = rolling_mean(&closes, period);
    IndicatorSeries::from_options(IndicatorType::Sma(period), bars.iter().map(|b| b.date), &sma)
}

/// Trailing-window mean. Each window is summed afresh so the result does not
/// depend on accumulated rounding from earlier bars.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let window = &values[i + 1 - period..=i];
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect()
}
