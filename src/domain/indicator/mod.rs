//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Points inside the warm-up region carry `valid: false`.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    pub fn invalid(date: NaiveDate, value: IndicatorValue) -> Self {
        Self {
            date,
            valid: false,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

/// Selects one number out of an [`IndicatorValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
}

impl IndicatorValue {
    pub fn field(&self, field: IndicatorField) -> Option<f64> {
        match (self, field) {
            (IndicatorValue::Simple(v), IndicatorField::Value) => Some(*v),
            (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => Some(*line),
            (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => Some(*signal),
            (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => {
                Some(*histogram)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Ema(usize),
    Sma(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    pub const DEFAULT_MACD: IndicatorType = IndicatorType::Macd {
        fast: macd::DEFAULT_FAST,
        slow: macd::DEFAULT_SLOW,
        signal: macd::DEFAULT_SIGNAL,
    };

    /// Column headers this indicator contributes to a tabular view.
    pub fn column_names(&self) -> Vec<String> {
        match self {
            IndicatorType::Macd { .. } if *self == Self::DEFAULT_MACD => vec![
                "MACD".to_string(),
                "Signal".to_string(),
                "Histogram".to_string(),
            ],
            IndicatorType::Macd { .. } => {
                let base = self.to_string();
                vec![
                    base.clone(),
                    format!("{base}_Signal"),
                    format!("{base}_Histogram"),
                ]
            }
            _ => vec![self.to_string()],
        }
    }

    /// Fields matching [`IndicatorType::column_names`], in the same order.
    pub fn fields(&self) -> &'static [IndicatorField] {
        match self {
            IndicatorType::Macd { .. } => &[
                IndicatorField::MacdLine,
                IndicatorField::MacdSignal,
                IndicatorField::MacdHistogram,
            ],
            _ => &[IndicatorField::Value],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The requested field at `index`, or `None` during warm-up / out of range.
    pub fn field_at(&self, index: usize, field: IndicatorField) -> Option<f64> {
        let point = self.values.get(index)?;
        if !point.valid {
            return None;
        }
        point.value.field(field)
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.field_at(index, IndicatorField::Value)
    }

    /// Builds a simple-valued series from optional values aligned with `dates`.
    pub fn from_options(
        indicator_type: IndicatorType,
        dates: impl IntoIterator<Item = NaiveDate>,
        values: &[Option<f64>],
    ) -> Self {
        let values = dates
            .into_iter()
            .zip(values.iter())
            .map(|(date, v)| IndicatorPoint {
                date,
                valid: v.is_some(),
                value: IndicatorValue::Simple(v.unwrap_or(0.0)),
            })
            .collect();
        Self {
            indicator_type,
            values,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA_{}", period),
            IndicatorType::Sma(period) => write!(f, "SMA_{}", period),
            IndicatorType::Rsi(period) => write!(f, "RSI_{}", period),
            IndicatorType::Macd { .. } if *self == Self::DEFAULT_MACD => write!(f, "MACD"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD_{}_{}_{}", fast, slow, signal)
            }
        }
    }
}
