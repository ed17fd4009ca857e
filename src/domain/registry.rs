//! Timeframes, the strategy registry, and the latest-bar scan.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{self, Strategy};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly];

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1 Day",
            Timeframe::Weekly => "1 Week",
            Timeframe::Monthly => "1 Month",
        }
    }

    /// Bar interval requested from a data provider.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
            Timeframe::Monthly => "1mo",
        }
    }

    /// Default history window requested alongside [`Timeframe::interval`].
    pub fn lookback_period(&self) -> &'static str {
        match self {
            Timeframe::Daily => "2y",
            Timeframe::Weekly | Timeframe::Monthly => "10y",
        }
    }

    /// Start date of the default history window ending at `end`.
    pub fn default_start(&self, end: NaiveDate) -> NaiveDate {
        let years = match self {
            Timeframe::Daily => 2,
            Timeframe::Weekly | Timeframe::Monthly => 10,
        };
        end.checked_sub_months(chrono::Months::new(12 * years))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    /// Accepts the label ("1 Day"), the interval ("1d"), or a plain name ("daily").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| {
                let plain = match tf {
                    Timeframe::Daily => "daily",
                    Timeframe::Weekly => "weekly",
                    Timeframe::Monthly => "monthly",
                };
                normalized == tf.label().to_lowercase()
                    || normalized == tf.interval()
                    || normalized == plain
            })
            .ok_or_else(|| format!("unknown timeframe {s:?} (expected 1 Day, 1 Week or 1 Month)"))
    }
}

/// Tunable strategy parameters, read from the `[strategy]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub ema_short: usize,
    pub ema_long: usize,
    pub volume_multiplier: f64,
    pub sma_period: usize,
    pub rsi_period: usize,
    pub oversold_level: f64,
    pub swing_window: usize,
    pub trend_periods: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ema_short: strategy::DEFAULT_EMA_SHORT,
            ema_long: strategy::DEFAULT_EMA_LONG,
            volume_multiplier: strategy::DEFAULT_VOLUME_MULTIPLIER,
            sma_period: strategy::DEFAULT_SMA_PERIOD,
            rsi_period: strategy::DEFAULT_RSI_PERIOD,
            oversold_level: strategy::DEFAULT_OVERSOLD_LEVEL,
            swing_window: strategy::DEFAULT_SWING_WINDOW,
            trend_periods: strategy::DEFAULT_TREND_PERIODS,
        }
    }
}

/// Ordered timeframe → strategies table.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRegistry {
    entries: Vec<(Timeframe, Vec<Strategy>)>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::from_params(&StrategyParams::default())
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_params(params: &StrategyParams) -> Self {
        let mut registry = Self::new();
        registry.register(
            Timeframe::Daily,
            Strategy::EmaCrossover {
                short_period: params.ema_short,
                long_period: params.ema_long,
                volume_multiplier: params.volume_multiplier,
            },
        );
        registry.register(
            Timeframe::Daily,
            Strategy::SmaCrossover {
                period: params.sma_period,
            },
        );
        registry.register(
            Timeframe::Daily,
            Strategy::RsiReversal {
                period: params.rsi_period,
                oversold_level: params.oversold_level,
            },
        );
        registry.register(Timeframe::Daily, Strategy::macd_crossover());
        registry.register(
            Timeframe::Daily,
            Strategy::FibonacciRetracement {
                window: params.swing_window,
                trend_periods: params.trend_periods,
            },
        );
        registry.register(Timeframe::Weekly, Strategy::Ema200Breakout);
        registry.entries.push((Timeframe::Monthly, Vec::new()));
        registry
    }

    /// Appends a strategy to the timeframe's list.
    pub fn register(&mut self, timeframe: Timeframe, strategy: Strategy) {
        match self.entries.iter_mut().find(|(tf, _)| *tf == timeframe) {
            Some((_, strategies)) => strategies.push(strategy),
            None => self.entries.push((timeframe, vec![strategy])),
        }
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.entries.iter().map(|(tf, _)| *tf)
    }

    pub fn strategies(&self, timeframe: Timeframe) -> &[Strategy] {
        self.entries
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, strategies)| strategies.as_slice())
            .unwrap_or(&[])
    }

    /// Case-insensitive lookup by display name.
    pub fn find(&self, timeframe: Timeframe, name: &str) -> Result<&Strategy, SwingtraderError> {
        self.strategies(timeframe)
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SwingtraderError::UnknownStrategy {
                name: name.to_string(),
                timeframe: timeframe.to_string(),
            })
    }

    /// Union of indicator columns needed by the timeframe's strategies.
    pub fn required_indicators(&self, timeframe: Timeframe) -> Vec<IndicatorType> {
        let mut types: Vec<IndicatorType> = self
            .strategies(timeframe)
            .iter()
            .flat_map(Strategy::required_indicators)
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

/// A strategy that fired on the most recent bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanHit {
    pub strategy: &'static str,
    pub date: NaiveDate,
    pub entry_level: Option<f64>,
}

/// Evaluates each of the timeframe's strategies and keeps those whose signal
/// fired on the last bar, in registry order.
pub fn scan_latest(
    series: &PriceSeries,
    registry: &StrategyRegistry,
    timeframe: Timeframe,
) -> Result<Vec<ScanHit>, SwingtraderError> {
    let mut hits = Vec::new();
    for strategy in registry.strategies(timeframe) {
        let signals = strategy.evaluate(series)?;
        if let Some(last) = signals.last().filter(|p| p.signal) {
            hits.push(ScanHit {
                strategy: strategy.name(),
                date: last.date,
                entry_level: last.entry_level,
            });
        }
    }
    Ok(hits)
}
