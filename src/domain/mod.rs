//! Core domain types and logic.

pub mod ohlcv;
pub mod error;
pub mod indicator;
pub mod indicator_helpers;
pub mod price_series;
pub mod swing;
pub mod signal;
pub mod strategy;
pub mod registry;
pub mod resample;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
