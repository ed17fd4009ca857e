//! Position states and closed-trade records.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        *self == PositionState::Long
    }

    /// 0 for Flat, 1 for Long.
    pub fn as_int(&self) -> u8 {
        match self {
            PositionState::Flat => 0,
            PositionState::Long => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub position: PositionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    Signal,
    Resistance,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Signal => "Signal",
            ExitReason::Resistance => "Resistance",
            ExitReason::StopLoss => "StopLoss",
        };
        f.write_str(s)
    }
}

/// A closed long trade. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    /// Absolute price change per unit.
    pub profit_loss: f64,
    /// `(exit - entry) / entry`, as a fraction.
    pub profit_loss_percentage: f64,
    pub exit_reason: ExitReason,
    pub stop_loss_level: Option<f64>,
    pub resistance_level: Option<f64>,
}

impl Trade {
    pub fn new(
        entry_date: NaiveDate,
        entry_price: f64,
        exit_date: NaiveDate,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            entry_date,
            entry_price,
            exit_date,
            exit_price,
            profit_loss: exit_price - entry_price,
            profit_loss_percentage: (exit_price - entry_price) / entry_price,
            exit_reason,
            stop_loss_level: None,
            resistance_level: None,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.profit_loss_percentage > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn flat_is_default() {
        assert_eq!(PositionState::default(), PositionState::Flat);
        assert_eq!(PositionState::Flat.as_int(), 0);
        assert_eq!(PositionState::Long.as_int(), 1);
        assert!(PositionState::Long.is_long());
    }

    #[test]
    fn losing_trade_pnl() {
        let trade = Trade::new(d(2), 11.0, d(3), 9.0, ExitReason::Signal);
        assert_relative_eq!(trade.profit_loss, -2.0);
        assert_relative_eq!(trade.profit_loss_percentage, -2.0 / 11.0);
        assert!(!trade.is_winner());
        assert_eq!(trade.holding_days(), 1);
    }

    #[test]
    fn winning_trade_pnl() {
        let trade = Trade::new(d(1), 100.0, d(11), 110.0, ExitReason::Resistance);
        assert_relative_eq!(trade.profit_loss_percentage, 0.1);
        assert!(trade.is_winner());
        assert_eq!(trade.exit_reason.to_string(), "Resistance");
        assert_eq!(trade.stop_loss_level, None);
    }

    #[test]
    fn flat_trade_is_not_winner() {
        let trade = Trade::new(d(1), 50.0, d(2), 50.0, ExitReason::StopLoss);
        assert_eq!(trade.profit_loss_percentage, 0.0);
        assert!(!trade.is_winner());
    }
}
