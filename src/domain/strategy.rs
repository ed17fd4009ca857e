//! Strategy definitions and signal evaluation.
//!
//! Every strategy maps a price series (with the indicator columns it needs)
//! to a [`SignalSeries`]. Crossover rules fire on the bar where
//! `prev.a <= prev.b && curr.a > curr.b`, so a flat tie never re-triggers.
//! Undefined (warm-up) values never satisfy a comparison.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::macd;
use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorField, IndicatorSeries, IndicatorType};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{SignalPoint, SignalSeries};
use crate::domain::swing::find_swing_points;

/// Bars in the trailing volume average used by the EMA crossover spike gate.
pub const VOLUME_AVERAGE_WINDOW: usize = 20;

pub const DEFAULT_EMA_SHORT: usize = 20;
pub const DEFAULT_EMA_LONG: usize = 50;
pub const DEFAULT_VOLUME_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_SMA_PERIOD: usize = 50;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_OVERSOLD_LEVEL: f64 = 30.0;
pub const DEFAULT_SWING_WINDOW: usize = 10;
pub const DEFAULT_TREND_PERIODS: usize = 12;
pub const BREAKOUT_EMA_PERIOD: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Short EMA crossing above long EMA on a volume spike.
    EmaCrossover {
        short_period: usize,
        long_period: usize,
        volume_multiplier: f64,
    },
    /// Close crossing above its SMA.
    SmaCrossover { period: usize },
    /// RSI crossing back above the oversold threshold.
    RsiReversal { period: usize, oversold_level: f64 },
    /// MACD line crossing above its signal line.
    MacdCrossover {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Bullish reclaim of the 200-period EMA, judged on the last bar only.
    Ema200Breakout,
    /// Touch of the 50% retracement after an uptrend into a swing high.
    FibonacciRetracement { window: usize, trend_periods: usize },
}

impl Strategy {
    pub fn ema_crossover() -> Self {
        Strategy::EmaCrossover {
            short_period: DEFAULT_EMA_SHORT,
            long_period: DEFAULT_EMA_LONG,
            volume_multiplier: DEFAULT_VOLUME_MULTIPLIER,
        }
    }

    pub fn sma_crossover() -> Self {
        Strategy::SmaCrossover {
            period: DEFAULT_SMA_PERIOD,
        }
    }

    pub fn rsi_reversal() -> Self {
        Strategy::RsiReversal {
            period: DEFAULT_RSI_PERIOD,
            oversold_level: DEFAULT_OVERSOLD_LEVEL,
        }
    }

    pub fn macd_crossover() -> Self {
        Strategy::MacdCrossover {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }

    pub fn fibonacci_retracement() -> Self {
        Strategy::FibonacciRetracement {
            window: DEFAULT_SWING_WINDOW,
            trend_periods: DEFAULT_TREND_PERIODS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::EmaCrossover { .. } => "EMA Crossover",
            Strategy::SmaCrossover { .. } => "SMA Price Crossover",
            Strategy::RsiReversal { .. } => "RSI Oversold Reversal",
            Strategy::MacdCrossover { .. } => "MACD Crossover",
            Strategy::Ema200Breakout => "EMA 200 Breakout",
            Strategy::FibonacciRetracement { .. } => "Fibonacci Retracement",
        }
    }

    /// Indicator columns that must be attached before [`Strategy::evaluate`].
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match self {
            Strategy::EmaCrossover {
                short_period,
                long_period,
                ..
            } => vec![IndicatorType::Ema(*short_period), IndicatorType::Ema(*long_period)],
            Strategy::SmaCrossover { period } => vec![IndicatorType::Sma(*period)],
            Strategy::RsiReversal { period, .. } => vec![IndicatorType::Rsi(*period)],
            Strategy::MacdCrossover { fast, slow, signal } => vec![IndicatorType::Macd {
                fast: *fast,
                slow: *slow,
                signal: *signal,
            }],
            Strategy::Ema200Breakout => vec![IndicatorType::Ema(BREAKOUT_EMA_PERIOD)],
            Strategy::FibonacciRetracement { .. } => Vec::new(),
        }
    }

    /// Evaluates the rule over every bar of `series`.
    ///
    /// Fails with `MissingIndicator` before looking at any bar if a required
    /// column is absent.
    pub fn evaluate(&self, series: &PriceSeries) -> Result<SignalSeries, SwingtraderError> {
        let fired = match self {
            Strategy::EmaCrossover {
                short_period,
                long_period,
                volume_multiplier,
            } => {
                let short = series.require(self.name(), &IndicatorType::Ema(*short_period))?;
                let long = series.require(self.name(), &IndicatorType::Ema(*long_period))?;
                let volumes: Vec<f64> = series.bars().iter().map(|b| b.volume).collect();
                let average_volume = rolling_mean(&volumes, VOLUME_AVERAGE_WINDOW);

                crossover_flags(series.len(), |i| short.value_at(i), |i| long.value_at(i))
                    .into_iter()
                    .enumerate()
                    .map(|(i, crossed)| {
                        crossed
                            && average_volume[i]
                                .is_some_and(|avg| volumes[i] > volume_multiplier * avg)
                    })
                    .collect()
            }
            Strategy::SmaCrossover { period } => {
                let sma = series.require(self.name(), &IndicatorType::Sma(*period))?;
                let bars = series.bars();
                crossover_flags(series.len(), |i| Some(bars[i].close), |i| sma.value_at(i))
            }
            Strategy::RsiReversal {
                period,
                oversold_level,
            } => {
                let rsi = series.require(self.name(), &IndicatorType::Rsi(*period))?;
                crossover_flags(series.len(), |i| rsi.value_at(i), |_| Some(*oversold_level))
            }
            Strategy::MacdCrossover { fast, slow, signal } => {
                let macd = series.require(
                    self.name(),
                    &IndicatorType::Macd {
                        fast: *fast,
                        slow: *slow,
                        signal: *signal,
                    },
                )?;
                macd_crossover_flags(macd, series.len())
            }
            Strategy::Ema200Breakout => {
                let ema = series.require(self.name(), &IndicatorType::Ema(BREAKOUT_EMA_PERIOD))?;
                return Ok(ema_breakout_signals(series, ema));
            }
            Strategy::FibonacciRetracement {
                window,
                trend_periods,
            } => {
                return Ok(fibonacci_signals(series, *window, *trend_periods));
            }
        };

        Ok(signals_at_high(series, &fired))
    }
}

fn crossover_flags(
    len: usize,
    a: impl Fn(usize) -> Option<f64>,
    b: impl Fn(usize) -> Option<f64>,
) -> Vec<bool> {
    (0..len)
        .map(|i| {
            if i == 0 {
                return false;
            }
            match (a(i - 1), b(i - 1), a(i), b(i)) {
                (Some(prev_a), Some(prev_b), Some(curr_a), Some(curr_b)) => {
                    prev_a <= prev_b && curr_a > curr_b
                }
                _ => false,
            }
        })
        .collect()
}

fn macd_crossover_flags(macd: &IndicatorSeries, len: usize) -> Vec<bool> {
    crossover_flags(
        len,
        |i| macd.field_at(i, IndicatorField::MacdLine),
        |i| macd.field_at(i, IndicatorField::MacdSignal),
    )
}

/// Crossover rules report the firing bar's High as the entry level.
fn signals_at_high(series: &PriceSeries, fired: &[bool]) -> SignalSeries {
    SignalSeries::new(
        series
            .bars()
            .iter()
            .zip(fired)
            .map(|(bar, &signal)| SignalPoint {
                date: bar.date,
                signal,
                entry_level: signal.then_some(bar.high),
            })
            .collect(),
    )
}

/// Point-in-time rule: only the last bar can fire.
///
/// Fires when the bar closes above the EMA, opened or traded at/below it, and
/// closed above its open. The entry level is the Close.
fn ema_breakout_signals(series: &PriceSeries, ema: &IndicatorSeries) -> SignalSeries {
    let last = series.len().checked_sub(1);
    SignalSeries::new(
        series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let signal = Some(i) == last
                    && ema.value_at(i).is_some_and(|level| {
                        bar.close > level
                            && (bar.open <= level || bar.low <= level)
                            && bar.is_bullish()
                    });
                SignalPoint {
                    date: bar.date,
                    signal,
                    entry_level: signal.then_some(bar.close),
                }
            })
            .collect(),
    )
}

/// For each bar `i`, take the highest swing high in the previous
/// `trend_periods` bars and the lowest Low from that swing to `i`. The bar
/// fires when its range contains the 50% retracement between the two and the
/// closes over those `trend_periods` bars never fell. The entry level is the
/// Close.
fn fibonacci_signals(series: &PriceSeries, window: usize, trend_periods: usize) -> SignalSeries {
    let bars = series.bars();
    let swings = find_swing_points(bars, window);

    let fired: Vec<bool> = (0..bars.len())
        .map(|i| {
            if i <= window || i < trend_periods || trend_periods == 0 {
                return false;
            }
            let lookback = i - trend_periods..i;

            let mut recent_high: Option<(usize, f64)> = None;
            for j in lookback.clone() {
                if let Some(high) = swings.highs[j] {
                    if recent_high.is_none_or(|(_, best)| high > best) {
                        recent_high = Some((j, high));
                    }
                }
            }
            let Some((high_idx, high)) = recent_high else {
                return false;
            };

            let subsequent_low = bars[high_idx..=i]
                .iter()
                .map(|b| b.low)
                .fold(f64::INFINITY, f64::min);
            if high <= subsequent_low {
                return false;
            }

            let fib_50 = subsequent_low + (high - subsequent_low) * 0.5;
            let prior_uptrend = bars[lookback].windows(2).all(|w| w[0].close <= w[1].close);

            bars[i].touches(fib_50) && prior_uptrend
        })
        .collect();

    SignalSeries::new(
        bars.iter()
            .zip(fired)
            .map(|(bar, signal)| SignalPoint {
                date: bar.date,
                signal,
                entry_level: signal.then_some(bar.close),
            })
            .collect(),
    )
}
