//! RSI (Relative Strength Index) indicator implementation.
//!
//! Average gain/loss is a plain rolling mean of the last n close-to-close
//! changes (not Wilder's exponential smoothing):
//! - gain = max(change, 0), loss = max(-change, 0)
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut rsi: Vec<Option<f64>> = vec![None; bars.len()];

    if period > 0 && bars.len() > period {
        let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
        let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
        for pair in bars.windows(2) {
            let change = pair[1].close - pair[0].close;
            gains.push(if change > 0.0 { change } else { 0.0 });
            losses.push(if change < 0.0 { -change } else { 0.0 });
        }

        // change j sits between bars j and j+1, so bar i closes window ending at change i-1
        for (i, slot) in rsi.iter_mut().enumerate().skip(period) {
            let window = (i - period)..i;
            let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
            *slot = Some(if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
            });
        }
    }

    IndicatorSeries::from_options(IndicatorType::Rsi(period), bars.iter().map(|b| b.date), &rsi)
}
