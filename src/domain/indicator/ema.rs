//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first available value, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). No look-ahead: every bar is defined
//! from the first close onwards.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: bars
                .iter()
                .map(|bar| IndicatorPoint::invalid(bar.date, IndicatorValue::Simple(0.0)))
                .collect(),
        };
    }

    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close)).collect();
    let ema = ema_values(&closes, period, 1);

    let values = bars
        .iter()
        .zip(ema)
        .map(|(bar, v)| IndicatorPoint {
            date: bar.date,
            valid: v.is_some(),
            value: IndicatorValue::Simple(v.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// Recursive EMA over a possibly gappy input.
///
/// Leading `None`s are skipped and the first `Some` seeds the average. An
/// output is only reported once `min_periods` observations have been folded
/// in. A `None` after the seed leaves the running average untouched.
pub fn ema_values(values: &[Option<f64>], period: usize, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut seen = 0usize;

    for value in values {
        match (*value, ema) {
            (Some(x), None) => {
                ema = Some(x);
                seen = 1;
            }
            (Some(x), Some(prev)) => {
                ema = Some(x * k + prev * (1.0 - k));
                seen += 1;
            }
            (None, _) => {
                out.push(None);
                continue;
            }
        }
        out.push(if seen >= min_periods { ema } else { None });
    }

    out
}
