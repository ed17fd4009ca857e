//! Per-bar entry signals produced by strategies or loaded from a file.

use crate::domain::error::SwingtraderError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: bool,
    /// Reference price on a firing bar; `None` whenever `signal` is false.
    pub entry_level: Option<f64>,
}

/// Signals keyed by date. A date absent from the stream means "no opinion";
/// the backtester holds the previous position there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    points: Vec<SignalPoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl SignalSeries {
    pub fn new(points: Vec<SignalPoint>) -> Self {
        let points: Vec<SignalPoint> = points
            .into_iter()
            .map(|p| SignalPoint {
                entry_level: if p.signal { p.entry_level } else { None },
                ..p
            })
            .collect();
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self { points, date_index }
    }

    /// A stream with `false` on every date.
    pub fn quiet(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self::new(
            dates
                .into_iter()
                .map(|date| SignalPoint {
                    date,
                    signal: false,
                    entry_level: None,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SignalPoint> {
        self.date_index.get(&date).map(|&i| &self.points[i])
    }

    pub fn last(&self) -> Option<&SignalPoint> {
        self.points.last()
    }

    pub fn firing(&self) -> impl Iterator<Item = &SignalPoint> {
        self.points.iter().filter(|p| p.signal)
    }

    /// Reads `date,signal[,entry_level]` rows.
    ///
    /// `signal` accepts true/false, 1/0 and yes/no (case-insensitive).
    /// A header without a `signal` column fails with `MissingSignalColumn`.
    pub fn from_csv_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, SwingtraderError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let signal_col = column("signal").ok_or_else(|| SwingtraderError::MissingSignalColumn {
            source_name: source_name.to_string(),
        })?;
        let date_col = column("date").ok_or_else(|| SwingtraderError::DataRead {
            reason: format!("{source_name}: missing date column"),
        })?;
        let entry_col = column("entry_level");

        let mut points = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

            let date = NaiveDate::parse_from_str(field(date_col), "%Y-%m-%d").map_err(|e| {
                SwingtraderError::DataRead {
                    reason: format!("{source_name} row {}: invalid date: {e}", row + 1),
                }
            })?;
            let signal = parse_flag(field(signal_col)).ok_or_else(|| SwingtraderError::DataRead {
                reason: format!(
                    "{source_name} row {}: invalid signal value {:?}",
                    row + 1,
                    field(signal_col)
                ),
            })?;
            let entry_level = match entry_col.map(field) {
                Some("") | None => None,
                Some(raw) => Some(raw.parse::<f64>().map_err(|e| SwingtraderError::DataRead {
                    reason: format!("{source_name} row {}: invalid entry_level: {e}", row + 1),
                })?),
            };

            points.push(SignalPoint {
                date,
                signal,
                entry_level,
            });
        }

        Ok(Self::new(points))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
