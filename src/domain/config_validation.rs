//! Configuration validation.
//!
//! Every check runs before any bar is processed.

use crate::domain::backtest::StopLossPolicy;
use crate::domain::error::SwingtraderError;
use crate::domain::strategy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

/// `[data]` dates are optional; when both are present, start must not follow end.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    if config.get_int("backtest", "lookahead", 20) < 1 {
        return Err(invalid("backtest", "lookahead", "lookahead must be at least 1"));
    }

    let stop = config.get_double("backtest", "stop_loss_pct", 0.02);
    if !(0.0..1.0).contains(&stop) {
        return Err(invalid(
            "backtest",
            "stop_loss_pct",
            "stop_loss_pct must be in [0, 1)",
        ));
    }

    if let Some(policy) = config.get_string("backtest", "stop_loss_policy") {
        policy
            .parse::<StopLossPolicy>()
            .map_err(|reason| invalid("backtest", "stop_loss_policy", &reason))?;
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    let period = |key: &str, default: usize| config.get_int("strategy", key, default as i64);

    for (key, default) in [
        ("ema_short", strategy::DEFAULT_EMA_SHORT),
        ("ema_long", strategy::DEFAULT_EMA_LONG),
        ("sma_period", strategy::DEFAULT_SMA_PERIOD),
        ("rsi_period", strategy::DEFAULT_RSI_PERIOD),
    ] {
        if period(key, default) < 1 {
            return Err(invalid("strategy", key, &format!("{key} must be positive")));
        }
    }

    if period("ema_short", strategy::DEFAULT_EMA_SHORT)
        >= period("ema_long", strategy::DEFAULT_EMA_LONG)
    {
        return Err(invalid(
            "strategy",
            "ema_short",
            "ema_short must be less than ema_long",
        ));
    }

    let multiplier = config.get_double(
        "strategy",
        "volume_multiplier",
        strategy::DEFAULT_VOLUME_MULTIPLIER,
    );
    if multiplier <= 0.0 {
        return Err(invalid(
            "strategy",
            "volume_multiplier",
            "volume_multiplier must be positive",
        ));
    }

    let oversold = config.get_double(
        "strategy",
        "oversold_level",
        strategy::DEFAULT_OVERSOLD_LEVEL,
    );
    if oversold <= 0.0 || oversold >= 100.0 {
        return Err(invalid(
            "strategy",
            "oversold_level",
            "oversold_level must be between 0 and 100",
        ));
    }

    if period("swing_window", strategy::DEFAULT_SWING_WINDOW) < 1 {
        return Err(invalid(
            "strategy",
            "swing_window",
            "swing_window must be at least 1",
        ));
    }
    if period("trend_periods", strategy::DEFAULT_TREND_PERIODS) < 2 {
        return Err(invalid(
            "strategy",
            "trend_periods",
            "trend_periods must be at least 2",
        ));
    }
    Ok(())
}

/// Reads a `[data]` date, `None` when the key is absent or blank.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, SwingtraderError> {
    match config.get_string("data", key) {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "data",
                    key,
                    &format!("invalid {key} format, expected YYYY-MM-DD"),
                )
            }),
        _ => Ok(None),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> SwingtraderError {
    SwingtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: SwingtraderError) -> String {
        match err {
            SwingtraderError::ConfigInvalid { key, .. } => key,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[data]
dir = /tmp/prices
start_date = 2020-01-01
end_date = 2024-12-31

[backtest]
lookahead = 10
stop_loss_pct = 0.05
stop_loss_policy = enforced

[strategy]
ema_short = 10
ema_long = 30
volume_multiplier = 2.0
oversold_level = 25
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn lookahead_zero_fails() {
        let err = validate_backtest_config(&make_config("[backtest]\nlookahead = 0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "lookahead");
    }

    #[test]
    fn stop_loss_pct_range() {
        for bad in ["-0.1", "1.0", "1.5"] {
            let config = make_config(&format!("[backtest]\nstop_loss_pct = {bad}\n"));
            let err = validate_backtest_config(&config).unwrap_err();
            assert_eq!(invalid_key(err), "stop_loss_pct");
        }
        assert!(validate_backtest_config(&make_config("[backtest]\nstop_loss_pct = 0\n")).is_ok());
    }

    #[test]
    fn unknown_policy_fails() {
        let config = make_config("[backtest]\nstop_loss_policy = sometimes\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "stop_loss_policy");
    }

    #[test]
    fn ema_short_must_be_below_long() {
        let config = make_config("[strategy]\nema_short = 50\nema_long = 50\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "ema_short");
    }

    #[test]
    fn zero_period_fails() {
        let config = make_config("[strategy]\nrsi_period = 0\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "rsi_period");
    }

    #[test]
    fn oversold_level_bounds() {
        for bad in ["0", "100", "-5"] {
            let config = make_config(&format!("[strategy]\noversold_level = {bad}\n"));
            let err = validate_strategy_config(&config).unwrap_err();
            assert_eq!(invalid_key(err), "oversold_level");
        }
    }

    #[test]
    fn volume_multiplier_must_be_positive() {
        let config = make_config("[strategy]\nvolume_multiplier = 0\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "volume_multiplier");
    }

    #[test]
    fn trend_periods_minimum() {
        let config = make_config("[strategy]\ntrend_periods = 1\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "trend_periods");
    }

    #[test]
    fn swing_window_minimum() {
        let config = make_config("[strategy]\nswing_window = 0\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "swing_window");
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[data]\nstart_date = 2020/01/01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "start_date");
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[data]\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "start_date");
    }

    #[test]
    fn same_start_and_end_allowed() {
        let config = make_config("[data]\nstart_date = 2024-01-02\nend_date = 2024-01-02\n");
        assert!(validate_data_config(&config).is_ok());
        assert_eq!(
            parse_optional_date(&config, "end_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(parse_optional_date(&config, "missing").unwrap(), None);
    }
}
