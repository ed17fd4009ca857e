//! Integration tests for the indicator → strategy → backtest pipeline.
//!
//! Tests cover:
//! - Reference scenarios for the state machine and the strategies
//! - Ledger invariants (entry/exit prices, PnL sign, no-signal)
//! - Indicator idempotence
//! - Protective exits with stop-loss and resistance context
//! - Registry-driven runs over a mock data port

mod common;

use approx::assert_relative_eq;
use common::*;
use swingtrader::domain::backtest::{
    BacktestConfig, StopLossPolicy, backtest_strategy, run_backtest,
    run_backtest_with_protection,
};
use swingtrader::domain::error::SwingtraderError;
use swingtrader::domain::indicator::{IndicatorSeries, IndicatorType};
use swingtrader::domain::indicator_helpers::{
    STANDARD_INDICATORS, attach_indicators, with_standard_indicators,
};
use swingtrader::domain::position::{ExitReason, PositionState};
use swingtrader::domain::price_series::PriceSeries;
use swingtrader::domain::registry::{StrategyRegistry, Timeframe, scan_latest};
use swingtrader::domain::signal::{SignalPoint, SignalSeries};
use swingtrader::domain::strategy::Strategy;
use swingtrader::ports::data_port::DataPort;

mod reference_scenarios {
    use super::*;

    #[test]
    fn single_losing_round_trip() {
        let series = series_from_closes(&[10.0, 11.0, 9.0, 12.0, 8.0]);
        let signals = signals_from_flags(&[false, true, false, false, false]);

        let result = run_backtest(&series, &signals);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_date, day(1));
        assert_eq!(trade.exit_date, day(2));
        assert_relative_eq!(trade.entry_price, 11.0);
        assert_relative_eq!(trade.exit_price, 9.0);
        assert_relative_eq!(trade.profit_loss_percentage, -0.181818, epsilon = 1e-6);
    }

    #[test]
    fn rsi_cross_out_of_oversold_fires_on_second_bar_only() {
        let mut series = series_from_closes(&[50.0, 51.0, 52.0]);
        series.insert_indicator(IndicatorSeries::from_options(
            IndicatorType::Rsi(14),
            series.dates().collect::<Vec<_>>(),
            &[Some(25.0), Some(28.0), Some(32.0)],
        ))
        .unwrap();

        let signals = Strategy::rsi_reversal().evaluate(&series).unwrap();
        let flags: Vec<bool> = signals.points().iter().map(|p| p.signal).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn empty_series_gives_empty_result() {
        let series = PriceSeries::new(vec![]).unwrap();
        let result = run_backtest(&series, &SignalSeries::default());
        assert!(result.positions.is_empty());
        assert!(result.trades.is_empty());

        let result = backtest_strategy(
            &with_standard_indicators(series).unwrap(),
            &Strategy::ema_crossover(),
            &BacktestConfig::default(),
            true,
        )
        .unwrap();
        assert!(result.positions.is_empty());
    }

    fn breakout_series(open: f64, low: f64, close: f64) -> PriceSeries {
        let mut bars = bars_from_closes(&[98.0, 99.0]);
        bars.push(PriceBar {
            date: day(2),
            open,
            high: close.max(open) + 1.0,
            low,
            close,
            volume: 1000.0,
        });
        let mut series = PriceSeries::new(bars).unwrap();
        series.insert_indicator(IndicatorSeries::from_options(
            IndicatorType::Ema(200),
            series.dates().collect::<Vec<_>>(),
            &[Some(100.0), Some(100.0), Some(100.0)],
        ))
        .unwrap();
        series
    }

    #[test]
    fn weekly_breakout_fires_on_reclaim_candle() {
        let series = breakout_series(95.0, 94.0, 105.0);
        let signals = Strategy::Ema200Breakout.evaluate(&series).unwrap();
        let flags: Vec<bool> = signals.points().iter().map(|p| p.signal).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn weekly_breakout_ignores_open_above_ema() {
        for close in [103.0, 120.0] {
            let series = breakout_series(105.0, 101.0, close);
            let signals = Strategy::Ema200Breakout.evaluate(&series).unwrap();
            assert_eq!(signals.firing().count(), 0);
        }
    }
}

mod ledger_invariants {
    use super::*;

    fn closes() -> Vec<f64> {
        vec![10.0, 10.5, 11.0, 10.0, 9.5, 9.8, 10.4, 11.2, 11.0, 12.0, 11.5, 12.5]
    }

    #[test]
    fn no_signal_means_flat_and_no_trades() {
        let series = series_from_closes(&closes());
        let result = run_backtest(&series, &SignalSeries::quiet(series.dates()));
        assert!(
            result
                .positions
                .iter()
                .all(|p| p.position == PositionState::Flat)
        );
        assert!(result.trades.is_empty());
    }

    #[test]
    fn prices_match_closes_and_pnl_sign_matches() {
        let closes = closes();
        let series = series_from_closes(&closes);
        let flags = [
            true, true, false, true, false, false, true, true, true, false, true, false,
        ];
        let result = run_backtest(&series, &signals_from_flags(&flags));

        assert_eq!(result.trades.len(), 4);
        for trade in &result.trades {
            let entry = series.get_bar(trade.entry_date).unwrap();
            let exit = series.get_bar(trade.exit_date).unwrap();
            assert_eq!(trade.entry_price, entry.close);
            assert_eq!(trade.exit_price, exit.close);
            assert_eq!(
                trade.profit_loss_percentage > 0.0,
                trade.exit_price > trade.entry_price
            );
        }
    }

    #[test]
    fn never_double_enters() {
        let series = series_from_closes(&closes());
        let flags = vec![true; closes().len()];
        let result = run_backtest(&series, &signals_from_flags(&flags));
        assert!(result.trades.is_empty());
        assert!(
            result
                .positions
                .iter()
                .all(|p| p.position == PositionState::Long)
        );
    }

    #[test]
    fn gaps_in_signal_stream_hold_position() {
        let series = series_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let signals = SignalSeries::new(vec![
            SignalPoint {
                date: day(1),
                signal: true,
                entry_level: Some(11.5),
            },
            SignalPoint {
                date: day(4),
                signal: false,
                entry_level: None,
            },
        ]);

        let result = run_backtest(&series, &signals);
        let positions: Vec<u8> = result.positions.iter().map(|p| p.position.as_int()).collect();
        assert_eq!(positions, vec![0, 1, 1, 1, 0, 0]);
        assert_relative_eq!(result.trades[0].profit_loss, 3.0);
    }
}

mod indicators {
    use super::*;

    #[test]
    fn recomputing_indicators_is_idempotent() {
        let series = PriceSeries::new(generate_bars("2023-01-01", 250, 100.0)).unwrap();
        let first = with_standard_indicators(series.clone()).unwrap();
        let mut second = first.clone();
        attach_indicators(&mut second, &STANDARD_INDICATORS).unwrap();

        for t in STANDARD_INDICATORS {
            assert_eq!(first.indicator(&t), second.indicator(&t));
        }
    }

    #[test]
    fn every_column_aligned_with_bars() {
        let series = with_standard_indicators(
            PriceSeries::new(generate_bars("2023-01-01", 120, 50.0)).unwrap(),
        )
        .unwrap();
        let dates: Vec<_> = series.dates().collect();
        for t in series.indicator_types() {
            let column = series.indicator(&t).unwrap();
            let column_dates: Vec<_> = column.values.iter().map(|p| p.date).collect();
            assert_eq!(column_dates, dates, "{t} misaligned");
        }
    }
}

mod protective_exits {
    use super::*;

    #[test]
    fn advisory_and_plain_runs_share_transitions() {
        let series = series_from_closes(&[10.0, 11.0, 12.0, 11.0, 13.0, 12.0, 9.0, 10.0]);
        let signals =
            signals_from_flags(&[true, true, true, true, false, true, true, false]);

        let plain = run_backtest(&series, &signals);
        let protected = run_backtest_with_protection(
            &series,
            &signals,
            &BacktestConfig {
                lookahead: 1,
                ..BacktestConfig::default()
            },
        );

        assert_eq!(plain.positions, protected.positions);
        assert_eq!(plain.trades.len(), protected.trades.len());
        for (a, b) in plain.trades.iter().zip(&protected.trades) {
            assert_eq!(a.exit_date, b.exit_date);
            assert_eq!(a.exit_price, b.exit_price);
            assert!(b.stop_loss_level.is_some());
        }
        assert_eq!(protected.trades[0].exit_reason, ExitReason::Resistance);
    }

    #[test]
    fn enforced_stop_closes_despite_true_signal() {
        let series = series_from_closes(&[20.0, 20.0, 20.0, 18.0, 18.0]);
        let signals = signals_from_flags(&[true, true, true, true, true]);
        let config = BacktestConfig {
            stop_loss_pct: 0.05,
            stop_loss_policy: StopLossPolicy::Enforced,
            ..BacktestConfig::default()
        };

        let result = run_backtest_with_protection(&series, &signals, &config);

        // stop at 19.0; bar 3 trades down to 17.5
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_date, day(3));
        assert_relative_eq!(trade.stop_loss_level.unwrap(), 19.0);
        // signal still true on bar 4: re-entry
        assert_eq!(result.positions[4].position, PositionState::Long);
    }
}

mod registry_pipeline {
    use super::*;

    #[test]
    fn every_daily_strategy_runs_on_generated_data() {
        let port = MockDataPort::new().with_bars("AAA", generate_bars("2022-01-01", 300, 80.0));
        let bars = port
            .fetch_ohlcv("AAA", Timeframe::Daily, date(2022, 1, 1), date(2023, 12, 31))
            .unwrap()
            .unwrap();
        let series = with_standard_indicators(PriceSeries::new(bars).unwrap()).unwrap();
        let registry = StrategyRegistry::default();

        for strategy in registry.strategies(Timeframe::Daily) {
            let result =
                backtest_strategy(&series, strategy, &BacktestConfig::default(), false).unwrap();
            assert_eq!(result.positions.len(), series.len(), "{}", strategy.name());
            for trade in &result.trades {
                assert!(trade.exit_date > trade.entry_date);
            }
        }
    }

    #[test]
    fn scan_needs_indicators_attached() {
        let series = PriceSeries::new(generate_bars("2022-01-01", 30, 80.0)).unwrap();
        let err = scan_latest(&series, &StrategyRegistry::default(), Timeframe::Weekly).unwrap_err();
        assert!(matches!(
            err,
            SwingtraderError::MissingIndicator { ref column, .. } if column == "EMA_200"
        ));
    }

    #[test]
    fn absent_ticker_is_none() {
        let port = MockDataPort::new();
        assert!(
            port.fetch_ohlcv("ZZZ", Timeframe::Weekly, date(2024, 1, 1), date(2024, 2, 1))
                .unwrap()
                .is_none()
        );
    }
}
