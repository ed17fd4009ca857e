//! Position state machine.
//!
//! Replays bars in chronological order against a signal stream and records a
//! position per bar plus a ledger of closed trades. State is owned by a single
//! call; nothing survives between invocations.

use crate::domain::error::SwingtraderError;
use crate::domain::position::{ExitReason, PositionPoint, PositionState, Trade};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::Strategy;
use crate::domain::swing::{identify_support_resistance, resistance_levels};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Whether the protective variant's stop-loss level can force an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopLossPolicy {
    /// Recorded on the trade only; exits stay signal-driven.
    #[default]
    Advisory,
    /// A bar after entry with Low <= stop closes the position at its Close.
    Enforced,
}

impl fmt::Display for StopLossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopLossPolicy::Advisory => f.write_str("advisory"),
            StopLossPolicy::Enforced => f.write_str("enforced"),
        }
    }
}

impl FromStr for StopLossPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advisory" => Ok(StopLossPolicy::Advisory),
            "enforced" => Ok(StopLossPolicy::Enforced),
            other => Err(format!(
                "unknown stop_loss_policy {other:?} (expected advisory or enforced)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Bars on each side used when locating support/resistance.
    pub lookahead: usize,
    /// Fraction below the entry price at which the stop sits.
    pub stop_loss_pct: f64,
    pub stop_loss_policy: StopLossPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookahead: 20,
            stop_loss_pct: 0.02,
            stop_loss_policy: StopLossPolicy::Advisory,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    /// One entry per input bar.
    pub positions: Vec<PositionPoint>,
    pub trades: Vec<Trade>,
}

impl BacktestResult {
    /// Whether the last bar ends Long.
    pub fn is_open_at_end(&self) -> bool {
        self.positions
            .last()
            .is_some_and(|p| p.position.is_long())
    }
}

struct OpenPosition {
    index: usize,
    date: NaiveDate,
    price: f64,
    stop_level: f64,
}

/// Signal-driven long-only replay.
///
/// Flat→Long on a true signal (fill at Close), Long→Flat on a false signal
/// (fill at Close). A bar whose date is absent from `signals` holds the
/// previous position. An open position at the end stays open.
pub fn run_backtest(series: &PriceSeries, signals: &SignalSeries) -> BacktestResult {
    replay(series, signals, None)
}

/// Same transitions as [`run_backtest`], with stop-loss and resistance
/// context on each trade.
///
/// On an exit bar, support/resistance is recomputed from bars up to and
/// including that bar only. The exit is tagged `Resistance` when the Close is
/// above a resistance level that is itself above the entry price; the highest
/// such level is recorded. Under [`StopLossPolicy::Enforced`] a bar after
/// entry whose Low reaches the stop level closes the position with
/// `StopLoss`, even if the signal is still true.
pub fn run_backtest_with_protection(
    series: &PriceSeries,
    signals: &SignalSeries,
    config: &BacktestConfig,
) -> BacktestResult {
    replay(series, signals, Some(config))
}

/// Evaluates `strategy` over `series` and replays its signals.
pub fn backtest_strategy(
    series: &PriceSeries,
    strategy: &Strategy,
    config: &BacktestConfig,
    protective: bool,
) -> Result<BacktestResult, SwingtraderError> {
    let signals = strategy.evaluate(series)?;
    debug!(
        strategy = strategy.name(),
        firing = signals.firing().count(),
        "evaluated strategy"
    );
    Ok(if protective {
        run_backtest_with_protection(series, &signals, config)
    } else {
        run_backtest(series, &signals)
    })
}

fn replay(
    series: &PriceSeries,
    signals: &SignalSeries,
    protection: Option<&BacktestConfig>,
) -> BacktestResult {
    let mut result = BacktestResult {
        positions: Vec::with_capacity(series.len()),
        trades: Vec::new(),
    };
    let mut open: Option<OpenPosition> = None;

    for (i, bar) in series.bars().iter().enumerate() {
        let signal = signals.get(bar.date).map(|p| p.signal);

        open = match (open, signal) {
            (None, Some(true)) => {
                let stop_level = protection
                    .map(|cfg| bar.close * (1.0 - cfg.stop_loss_pct))
                    .unwrap_or(f64::NAN);
                debug!(date = %bar.date, price = bar.close, "enter long");
                Some(OpenPosition {
                    index: i,
                    date: bar.date,
                    price: bar.close,
                    stop_level,
                })
            }
            (Some(pos), signal) => {
                let stopped = protection.is_some_and(|cfg| {
                    cfg.stop_loss_policy == StopLossPolicy::Enforced
                        && i > pos.index
                        && bar.low <= pos.stop_level
                });

                if stopped || signal == Some(false) {
                    let mut trade = Trade::new(
                        pos.date,
                        pos.price,
                        bar.date,
                        bar.close,
                        ExitReason::Signal,
                    );
                    if let Some(cfg) = protection {
                        trade.stop_loss_level = Some(pos.stop_level);
                        trade.resistance_level =
                            resistance_below_close(series, i, cfg.lookahead, pos.price);
                        if stopped {
                            trade.exit_reason = ExitReason::StopLoss;
                        } else if trade.resistance_level.is_some() {
                            trade.exit_reason = ExitReason::Resistance;
                        }
                    }
                    debug!(
                        date = %bar.date,
                        price = bar.close,
                        pnl_pct = trade.profit_loss_percentage,
                        reason = %trade.exit_reason,
                        "exit long"
                    );
                    result.trades.push(trade);
                    None
                } else {
                    Some(pos)
                }
            }
            (None, _) => None,
        };

        result.positions.push(PositionPoint {
            date: bar.date,
            position: if open.is_some() {
                PositionState::Long
            } else {
                PositionState::Flat
            },
        });
    }

    result
}

/// Highest resistance level strictly between `entry_price` and the Close of
/// bar `index`, using bars `0..=index` only.
fn resistance_below_close(
    series: &PriceSeries,
    index: usize,
    lookahead: usize,
    entry_price: f64,
) -> Option<f64> {
    let visible = series.prefix(index + 1);
    let close = visible.last()?.close;
    let levels = identify_support_resistance(visible, lookahead);
    resistance_levels(&levels)
        .filter(|&level| level > entry_price && close > level)
        .reduce(f64::max)
}
