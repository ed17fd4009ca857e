//! Trade ledger statistics.

use super::position::Trade;

/// Summary of a trade ledger. Percentages are fractions (0.05 = 5%).
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub average_pnl_pct: f64,
    pub best_pnl_pct: f64,
    pub worst_pnl_pct: f64,
    pub total_pnl_pct: f64,
    /// Sum of winning percentages over the absolute sum of losing ones.
    pub profit_factor: f64,
    pub avg_holding_days: f64,
}

impl BacktestSummary {
    /// An empty ledger yields all zeros.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let total_trades = trades.len();
        if total_trades == 0 {
            return Self {
                total_trades: 0,
                winning_trades: 0,
                losing_trades: 0,
                win_rate: 0.0,
                average_pnl_pct: 0.0,
                best_pnl_pct: 0.0,
                worst_pnl_pct: 0.0,
                total_pnl_pct: 0.0,
                profit_factor: 0.0,
                avg_holding_days: 0.0,
            };
        }

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut best = f64::NEG_INFINITY;
        let mut worst = f64::INFINITY;
        let mut total_days = 0i64;

        for trade in trades {
            let pnl = trade.profit_loss_percentage;
            if pnl > 0.0 {
                winning_trades += 1;
                total_wins += pnl;
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_losses += pnl.abs();
            }
            best = best.max(pnl);
            worst = worst.min(pnl);
            total_days += trade.holding_days();
        }

        let total_pnl_pct = total_wins - total_losses;
        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: winning_trades as f64 / total_trades as f64,
            average_pnl_pct: total_pnl_pct / total_trades as f64,
            best_pnl_pct: best,
            worst_pnl_pct: worst,
            total_pnl_pct,
            profit_factor,
            avg_holding_days: total_days as f64 / total_trades as f64,
        }
    }
}
