#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use swingtrader::domain::error::SwingtraderError;
pub use swingtrader::domain::ohlcv::PriceBar;
use swingtrader::domain::price_series::PriceSeries;
use swingtrader::domain::registry::Timeframe;
use swingtrader::domain::resample::resample;
use swingtrader::domain::signal::{SignalPoint, SignalSeries};
use swingtrader::ports::data_port::DataPort;

/// In-memory daily bars, resampled on request like the CSV adapter.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, Timeframe)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Vec<PriceBar>>, SwingtraderError> {
        self.requests
            .borrow_mut()
            .push((ticker.to_string(), timeframe));
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SwingtraderError::DataRead {
                reason: reason.clone(),
            });
        }
        let daily: Vec<PriceBar> = self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let bars = resample(&daily, timeframe);
        Ok(if bars.is_empty() { None } else { Some(bars) })
    }

    fn list_tickers(&self) -> Result<Vec<String>, SwingtraderError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// One bar per day from 2024-01-01, open = close, a one-point range.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: day(i),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(bars_from_closes(closes)).unwrap()
}

/// Smooth oscillating prices, useful for indicator pipelines.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.05;
            PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 + ((i * 37) % 500) as f64,
            }
        })
        .collect()
}

/// Signals on the same dates as [`bars_from_closes`].
pub fn signals_from_flags(flags: &[bool]) -> SignalSeries {
    SignalSeries::new(
        flags
            .iter()
            .enumerate()
            .map(|(i, &signal)| SignalPoint {
                date: day(i),
                signal,
                entry_level: None,
            })
            .collect(),
    )
}
