//! Swing point and support/resistance detection.
//!
//! All functions here are pure: they read a slice of bars and return fresh
//! values. Callers that must avoid look-ahead pass a prefix of the series.

use crate::domain::ohlcv::PriceBar;

/// Retracement ratios between a swing low (0.0) and a swing high (1.0).
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Sparse swing highs/lows, aligned index-for-index with the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingPoints {
    pub highs: Vec<Option<f64>>,
    pub lows: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportResistanceLevel {
    pub price: f64,
    pub kind: LevelKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Strict swing detection.
///
/// Bar `i` is a swing high iff its High is greater than every High in
/// `[i-window, i-1]` and `[i+1, i+window]`; swing lows mirror this with Low
/// and "less than". Bars within `window` of either end are never classified.
pub fn find_swing_points(bars: &[PriceBar], window: usize) -> SwingPoints {
    let n = bars.len();
    let mut highs = vec![None; n];
    let mut lows = vec![None; n];

    if window == 0 || n <= 2 * window {
        return SwingPoints { highs, lows };
    }

    for i in window..(n - window) {
        let neighbours = bars[i - window..i]
            .iter()
            .chain(bars[i + 1..=i + window].iter());

        let (mut is_high, mut is_low) = (true, true);
        for other in neighbours {
            is_high &= bars[i].high > other.high;
            is_low &= bars[i].low < other.low;
        }

        if is_high {
            highs[i] = Some(bars[i].high);
        }
        if is_low {
            lows[i] = Some(bars[i].low);
        }
    }

    SwingPoints { highs, lows }
}

/// Non-strict local extrema over `lookahead` bars on each side.
///
/// A Low no greater than every Low in its neighbourhood is support; a High no
/// less than every High is resistance. Duplicate prices are collapsed and each
/// kind is returned in ascending price order, supports first.
pub fn identify_support_resistance(
    bars: &[PriceBar],
    lookahead: usize,
) -> Vec<SupportResistanceLevel> {
    let n = bars.len();
    let mut support: Vec<f64> = Vec::new();
    let mut resistance: Vec<f64> = Vec::new();

    if n > 2 * lookahead {
        for i in lookahead..(n - lookahead) {
            let neighbourhood = &bars[i - lookahead..=i + lookahead];
            if neighbourhood.iter().all(|b| bars[i].low <= b.low) {
                support.push(bars[i].low);
            }
            if neighbourhood.iter().all(|b| bars[i].high >= b.high) {
                resistance.push(bars[i].high);
            }
        }
    }

    for prices in [&mut support, &mut resistance] {
        prices.sort_by(f64::total_cmp);
        prices.dedup();
    }

    support
        .into_iter()
        .map(|price| SupportResistanceLevel {
            price,
            kind: LevelKind::Support,
        })
        .chain(resistance.into_iter().map(|price| SupportResistanceLevel {
            price,
            kind: LevelKind::Resistance,
        }))
        .collect()
}

/// Resistance prices from a level set, ascending.
pub fn resistance_levels(levels: &[SupportResistanceLevel]) -> impl Iterator<Item = f64> + '_ {
    levels
        .iter()
        .filter(|l| l.kind == LevelKind::Resistance)
        .map(|l| l.price)
}

/// Support prices from a level set, ascending.
pub fn support_levels(levels: &[SupportResistanceLevel]) -> impl Iterator<Item = f64> + '_ {
    levels
        .iter()
        .filter(|l| l.kind == LevelKind::Support)
        .map(|l| l.price)
}

/// Linear interpolation from `low` (ratio 0) to `high` (ratio 1).
pub fn compute_fibonacci_levels(high: f64, low: f64) -> Vec<FibonacciLevel> {
    let range = high - low;
    FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| FibonacciLevel {
            ratio,
            price: low + range * ratio,
        })
        .collect()
}

/// Fibonacci levels between the highest High and lowest Low of `bars`.
pub fn fibonacci_levels_for_series(bars: &[PriceBar]) -> Option<Vec<FibonacciLevel>> {
    let high = bars.iter().map(|b| b.high).reduce(f64::max)?;
    let low = bars.iter().map(|b| b.low).reduce(f64::min)?;
    Some(compute_fibonacci_levels(high, low))
}
