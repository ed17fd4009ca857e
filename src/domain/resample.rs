//! Aggregation of daily bars into weekly or monthly candles.

use crate::domain::ohlcv::PriceBar;
use crate::domain::registry::Timeframe;
use chrono::{Datelike, NaiveDate};

/// Calendar bucket a date falls into for `timeframe`.
///
/// Weeks follow ISO numbering, so a week starts on Monday and a week that
/// straddles New Year keeps one key.
fn period_key(timeframe: Timeframe, date: NaiveDate) -> (i32, u32) {
    match timeframe {
        Timeframe::Daily => (date.year(), date.ordinal()),
        Timeframe::Weekly => {
            let week = date.iso_week();
            (week.year(), week.week())
        }
        Timeframe::Monthly => (date.year(), date.month()),
    }
}

/// Folds date-ordered daily bars into one candle per period.
///
/// Each candle takes the first Open, the highest High, the lowest Low, the
/// last Close and the summed Volume. It is dated by its first bar.
pub fn resample(bars: &[PriceBar], timeframe: Timeframe) -> Vec<PriceBar> {
    if timeframe == Timeframe::Daily {
        return bars.to_vec();
    }

    let mut candles: Vec<PriceBar> = Vec::new();
    let mut current_key = None;
    for bar in bars {
        let key = period_key(timeframe, bar.date);
        match candles.last_mut() {
            Some(candle) if current_key == Some(key) => {
                candle.high = candle.high.max(bar.high);
                candle.low = candle.low.min(bar.low);
                candle.close = bar.close;
                candle.volume += bar.volume;
            }
            _ => {
                candles.push(bar.clone());
                current_key = Some(key);
            }
        }
    }
    candles
}
