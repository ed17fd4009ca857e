//! Indicator pipeline: computes indicator columns and attaches them to a series.

use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
};
use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::price_series::PriceSeries;
use std::collections::HashMap;

/// The column set every strategy in the default registry draws from.
pub const STANDARD_INDICATORS: [IndicatorType; 6] = [
    IndicatorType::Ema(200),
    IndicatorType::Ema(20),
    IndicatorType::Sma(50),
    IndicatorType::Rsi(14),
    IndicatorType::Ema(50),
    IndicatorType::DEFAULT_MACD,
];

pub fn compute_indicator(bars: &[PriceBar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
    }
}

pub fn compute_indicators(
    bars: &[PriceBar],
    indicator_types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    indicator_types
        .iter()
        .map(|t| (*t, compute_indicator(bars, *t)))
        .collect()
}

/// Computes `indicator_types` over the series' bars and attaches them,
/// replacing any column of the same type.
pub fn attach_indicators(
    series: &mut PriceSeries,
    indicator_types: &[IndicatorType],
) -> Result<(), SwingtraderError> {
    let computed = compute_indicators(series.bars(), indicator_types);
    for (_, column) in computed {
        series.insert_indicator(column)?;
    }
    Ok(())
}

/// Augments the series with [`STANDARD_INDICATORS`].
pub fn with_standard_indicators(mut series: PriceSeries) -> Result<PriceSeries, SwingtraderError> {
    attach_indicators(&mut series, &STANDARD_INDICATORS)?;
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(count: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..count)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.2).sin() * 10.0;
                PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect()
    }

    #[test]
    fn compute_indicators_keys() {
        let bars = make_bars(30);
        let map = compute_indicators(&bars, &[IndicatorType::Ema(20), IndicatorType::Rsi(14)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&IndicatorType::Ema(20)].values.len(), 30);
        assert_eq!(map[&IndicatorType::Rsi(14)].values.len(), 30);
    }

    #[test]
    fn standard_indicators_attached() {
        let series = with_standard_indicators(PriceSeries::new(make_bars(60)).unwrap()).unwrap();
        for t in STANDARD_INDICATORS {
            assert!(series.has_indicator(&t), "missing {t}");
            assert_eq!(series.indicator(&t).unwrap().values.len(), 60);
        }
    }

    #[test]
    fn short_series_does_not_fail() {
        let series = with_standard_indicators(PriceSeries::new(make_bars(3)).unwrap()).unwrap();
        let sma = series.indicator(&IndicatorType::Sma(50)).unwrap();
        assert!(sma.values.iter().all(|p| !p.valid));
        let macd = series.indicator(&IndicatorType::DEFAULT_MACD).unwrap();
        assert!(macd.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn recomputing_is_idempotent() {
        let mut series = with_standard_indicators(PriceSeries::new(make_bars(80)).unwrap()).unwrap();
        let before: Vec<IndicatorSeries> = STANDARD_INDICATORS
            .iter()
            .map(|t| series.indicator(t).unwrap().clone())
            .collect();

        attach_indicators(&mut series, &STANDARD_INDICATORS).unwrap();

        for (t, prev) in STANDARD_INDICATORS.iter().zip(before) {
            assert_eq!(series.indicator(t).unwrap(), &prev);
        }
    }
}
