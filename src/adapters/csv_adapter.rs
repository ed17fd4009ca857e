//! CSV file data adapter.
//!
//! Files live in one directory with the header
//! `date,open,high,low,close,volume`. A ticker's bars for a timeframe come
//! from `<TICKER>_<interval>.csv` (`_1d`, `_1wk`, `_1mo`) when that file
//! exists. Otherwise the daily file `<TICKER>.csv` is read and resampled.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::registry::Timeframe;
use crate::domain::resample::resample;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    fn interval_path(&self, ticker: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{ticker}_{}.csv", timeframe.interval()))
    }
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    row: usize,
) -> Result<f64, SwingtraderError> {
    record
        .get(idx)
        .ok_or_else(|| SwingtraderError::DataRead {
            reason: format!("row {row}: missing {name} column"),
        })?
        .trim()
        .parse()
        .map_err(|e| SwingtraderError::DataRead {
            reason: format!("row {row}: invalid {name} value: {e}"),
        })
}

/// Bars of one file within `[start_date, end_date]`, sorted and
/// de-duplicated. `Ok(None)` when the file does not exist.
fn read_bars(
    path: &Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Option<Vec<PriceBar>>, SwingtraderError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SwingtraderError::DataRead {
                reason: format!("failed to read {}: {}", path.display(), e),
            });
        }
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result?;

        let date_str = record.get(0).ok_or_else(|| SwingtraderError::DataRead {
            reason: format!("row {row}: missing date column"),
        })?;
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
            SwingtraderError::DataRead {
                reason: format!("row {row}: invalid date format: {e}"),
            }
        })?;

        if date < start_date || date > end_date {
            continue;
        }

        let bar = PriceBar {
            date,
            open: parse_field(&record, 1, "open", row)?,
            high: parse_field(&record, 2, "high", row)?,
            low: parse_field(&record, 3, "low", row)?,
            close: parse_field(&record, 4, "close", row)?,
            volume: parse_field(&record, 5, "volume", row)?,
        };
        if !bar.is_well_formed() {
            return Err(SwingtraderError::DataRead {
                reason: format!(
                    "{} row {row}: malformed bar on {date} (open {}, high {}, low {}, close {}, volume {})",
                    path.display(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ),
            });
        }
        bars.push(bar);
    }

    // stable sort keeps file order among equal dates; dedup keeps the first
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(Some(bars))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Vec<PriceBar>>, SwingtraderError> {
        let native = self.interval_path(ticker, timeframe);
        let bars = match read_bars(&native, start_date, end_date)? {
            Some(bars) => {
                debug!(
                    path = %native.display(),
                    interval = timeframe.interval(),
                    "native interval file"
                );
                bars
            }
            None => {
                let daily = self.csv_path(ticker);
                match read_bars(&daily, start_date, end_date)? {
                    Some(bars) => {
                        debug!(
                            path = %daily.display(),
                            interval = timeframe.interval(),
                            "resampling daily file"
                        );
                        resample(&bars, timeframe)
                    }
                    None => {
                        debug!(ticker, interval = timeframe.interval(), "no price file");
                        return Ok(None);
                    }
                }
            }
        };

        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some(bars))
    }

    /// Tickers with any price file, with interval suffixes folded together.
    fn list_tickers(&self) -> Result<Vec<String>, SwingtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SwingtraderError::DataRead {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let ticker = Timeframe::ALL
                    .into_iter()
                    .find_map(|tf| stem.strip_suffix(&format!("_{}", tf.interval())))
                    .unwrap_or(stem);
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        tickers.dedup();
        Ok(tickers)
    }
}
