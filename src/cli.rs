//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, StopLossPolicy,
};
use crate::domain::config_validation::{parse_optional_date, validate_config};
use crate::domain::error::SwingtraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::{STANDARD_INDICATORS, attach_indicators};
use crate::domain::metrics::BacktestSummary;
use crate::domain::position::Trade;
use crate::domain::price_series::PriceSeries;
use crate::domain::registry::{ScanHit, StrategyParams, StrategyRegistry, Timeframe, scan_latest};
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::{self, Strategy};
use crate::domain::swing::{FibonacciLevel, fibonacci_levels_for_series};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "swingtrader", about = "Swing-trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a strategy (or a signal file) over one ticker
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// CSV with date,signal[,entry_level] used instead of a strategy
        #[arg(long)]
        signals: Option<PathBuf>,
        /// Record stop-loss/resistance context on every trade
        #[arg(long)]
        protective: bool,
        /// Write the trade ledger as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report strategies firing on the latest bar
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Vec<String>,
        #[arg(long)]
        timeframe: Vec<String>,
    },
    /// Print the standard indicator table as CSV
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Print Fibonacci levels between the series extremes
    Fibonacci {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// List the strategy registry
    Strategies {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Backtest { config, .. }
            | Command::Scan { config, .. }
            | Command::Indicators { config, .. }
            | Command::Fibonacci { config, .. }
            | Command::Validate { config } => Some(config.as_path()),
            Command::Strategies { config } => config.as_deref(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let level = cli
        .command
        .config_path()
        .and_then(|p| FileConfigAdapter::from_file(p).ok())
        .and_then(|c| c.get_string("logging", "level"));
    init_logging(level.as_deref());

    let result = match cli.command {
        Command::Backtest {
            config,
            ticker,
            strategy,
            timeframe,
            signals,
            protective,
            output,
        } => run_backtest(
            &config,
            ticker.as_deref(),
            strategy.as_deref(),
            timeframe.as_deref(),
            signals.as_deref(),
            protective,
            output.as_deref(),
        ),
        Command::Scan {
            config,
            ticker,
            timeframe,
        } => run_scan(&config, &ticker, &timeframe),
        Command::Indicators {
            config,
            ticker,
            timeframe,
        } => run_indicators(&config, &ticker, timeframe.as_deref()),
        Command::Fibonacci {
            config,
            ticker,
            timeframe,
        } => run_fibonacci(&config, &ticker, timeframe.as_deref()),
        Command::Strategies { config } => run_strategies(config.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Installs the stderr fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SwingtraderError> {
    info!(path = %path.display(), "loading config");
    let config = FileConfigAdapter::from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SwingtraderError> {
    let defaults = BacktestConfig::default();
    let stop_loss_policy = match adapter.get_string("backtest", "stop_loss_policy") {
        Some(raw) => raw
            .parse::<StopLossPolicy>()
            .map_err(|reason| SwingtraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "stop_loss_policy".into(),
                reason,
            })?,
        None => defaults.stop_loss_policy,
    };

    Ok(BacktestConfig {
        lookahead: adapter
            .get_int("backtest", "lookahead", defaults.lookahead as i64)
            .max(1) as usize,
        stop_loss_pct: adapter.get_double("backtest", "stop_loss_pct", defaults.stop_loss_pct),
        stop_loss_policy,
    })
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> StrategyParams {
    let period = |key: &str, default: usize| {
        adapter
            .get_int("strategy", key, default as i64)
            .max(1) as usize
    };
    StrategyParams {
        ema_short: period("ema_short", strategy::DEFAULT_EMA_SHORT),
        ema_long: period("ema_long", strategy::DEFAULT_EMA_LONG),
        volume_multiplier: adapter.get_double(
            "strategy",
            "volume_multiplier",
            strategy::DEFAULT_VOLUME_MULTIPLIER,
        ),
        sma_period: period("sma_period", strategy::DEFAULT_SMA_PERIOD),
        rsi_period: period("rsi_period", strategy::DEFAULT_RSI_PERIOD),
        oversold_level: adapter.get_double(
            "strategy",
            "oversold_level",
            strategy::DEFAULT_OVERSOLD_LEVEL,
        ),
        swing_window: period("swing_window", strategy::DEFAULT_SWING_WINDOW),
        trend_periods: period("trend_periods", strategy::DEFAULT_TREND_PERIODS),
    }
}

pub fn build_registry(adapter: &dyn ConfigPort) -> StrategyRegistry {
    StrategyRegistry::from_params(&build_strategy_params(adapter))
}

pub fn parse_timeframe(raw: Option<&str>) -> Result<Timeframe, SwingtraderError> {
    match raw {
        None => Ok(Timeframe::Daily),
        Some(s) => s.parse().map_err(|reason| SwingtraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "timeframe".into(),
            reason,
        }),
    }
}

/// `[data]` start/end, with the timeframe's default window when only the end
/// is set. Missing bounds are open.
pub fn resolve_date_range(
    adapter: &dyn ConfigPort,
    timeframe: Timeframe,
) -> Result<(NaiveDate, NaiveDate), SwingtraderError> {
    let start = parse_optional_date(adapter, "start_date")?;
    let end = parse_optional_date(adapter, "end_date")?;
    Ok(match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, NaiveDate::MAX),
        (None, Some(end)) => {
            let start = timeframe.default_start(end);
            debug!(lookback = timeframe.lookback_period(), %start, "default start for {timeframe}");
            (start, end)
        }
        (None, None) => (NaiveDate::MIN, NaiveDate::MAX),
    })
}

fn data_adapter(adapter: &dyn ConfigPort) -> Result<CsvAdapter, SwingtraderError> {
    match adapter.get_string("data", "dir") {
        Some(dir) if !dir.trim().is_empty() => Ok(CsvAdapter::new(PathBuf::from(dir.trim()))),
        _ => Err(SwingtraderError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        }),
    }
}

/// Fetches a ticker at the timeframe's interval and attaches `indicators`.
/// DataAbsence becomes `NoData`.
pub fn load_series(
    data_port: &dyn DataPort,
    ticker: &str,
    timeframe: Timeframe,
    range: (NaiveDate, NaiveDate),
    indicators: &[IndicatorType],
) -> Result<PriceSeries, SwingtraderError> {
    debug!(
        ticker,
        interval = timeframe.interval(),
        start = %range.0,
        end = %range.1,
        "fetching bars"
    );
    let bars = data_port
        .fetch_ohlcv(ticker, timeframe, range.0, range.1)?
        .ok_or_else(|| SwingtraderError::NoData {
            ticker: ticker.to_string(),
        })?;
    let mut series = PriceSeries::new(bars)?;
    attach_indicators(&mut series, indicators)?;
    info!(ticker, interval = timeframe.interval(), bars = series.len(), "loaded series");
    Ok(series)
}

/// Evaluates `strategy` on one ticker and replays its signals.
pub fn backtest_ticker(
    data_port: &dyn DataPort,
    ticker: &str,
    strategy: &Strategy,
    config: &BacktestConfig,
    protective: bool,
    timeframe: Timeframe,
    range: (NaiveDate, NaiveDate),
) -> Result<BacktestResult, SwingtraderError> {
    let series = load_series(
        data_port,
        ticker,
        timeframe,
        range,
        &strategy.required_indicators(),
    )?;
    info!(ticker, strategy = strategy.name(), protective, "running backtest");
    backtest_engine::backtest_strategy(&series, strategy, config, protective)
}

/// Replays an externally supplied signal stream on one ticker.
pub fn backtest_signals(
    data_port: &dyn DataPort,
    ticker: &str,
    signals: &SignalSeries,
    config: &BacktestConfig,
    protective: bool,
    timeframe: Timeframe,
    range: (NaiveDate, NaiveDate),
) -> Result<BacktestResult, SwingtraderError> {
    let series = load_series(data_port, ticker, timeframe, range, &[])?;
    info!(ticker, signals = signals.len(), protective, "replaying signal stream");
    Ok(if protective {
        backtest_engine::run_backtest_with_protection(&series, signals, config)
    } else {
        backtest_engine::run_backtest(&series, signals)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerHit {
    pub ticker: String,
    pub timeframe: Timeframe,
    pub hit: ScanHit,
}

/// Latest-bar scan across tickers and timeframes. Tickers without data are
/// skipped with a warning.
pub fn scan_tickers(
    data_port: &dyn DataPort,
    adapter: &dyn ConfigPort,
    registry: &StrategyRegistry,
    tickers: &[String],
    timeframes: &[Timeframe],
) -> Result<Vec<TickerHit>, SwingtraderError> {
    let mut hits = Vec::new();
    for &timeframe in timeframes {
        let range = resolve_date_range(adapter, timeframe)?;
        let indicators = registry.required_indicators(timeframe);
        for ticker in tickers {
            let series = match load_series(data_port, ticker, timeframe, range, &indicators) {
                Ok(series) => series,
                Err(SwingtraderError::NoData { .. }) => {
                    warn!(ticker = %ticker, timeframe = %timeframe, "no data, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for hit in scan_latest(&series, registry, timeframe)? {
                hits.push(TickerHit {
                    ticker: ticker.clone(),
                    timeframe,
                    hit,
                });
            }
        }
    }
    Ok(hits)
}

/// Writes the ledger as CSV, one row per trade.
pub fn write_ledger<W: Write>(writer: W, trades: &[Trade]) -> Result<(), SwingtraderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for trade in trades {
        wtr.serialize(trade)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Bars plus every attached indicator column; warm-up cells are empty.
pub fn write_indicator_table<W: Write>(
    writer: W,
    series: &PriceSeries,
) -> Result<(), SwingtraderError> {
    let types = series.indicator_types();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = ["date", "open", "high", "low", "close", "volume"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for t in &types {
        header.extend(t.column_names());
    }
    wtr.write_record(&header)?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut row = vec![
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ];
        for t in &types {
            let column = series.indicator(t);
            for &field in t.fields() {
                row.push(
                    column
                        .and_then(|c| c.field_at(i, field))
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(ticker: &str, label: &str, result: &BacktestResult) {
    let summary = BacktestSummary::from_trades(&result.trades);
    println!("=== {ticker}: {label} ===");
    println!("Total Trades:     {}", summary.total_trades);
    println!("Win Rate:         {:.1}%", summary.win_rate * 100.0);
    println!("Average P/L:      {:.2}%", summary.average_pnl_pct * 100.0);
    println!("Best Trade:       {:.2}%", summary.best_pnl_pct * 100.0);
    println!("Worst Trade:      {:.2}%", summary.worst_pnl_pct * 100.0);
    println!("Avg Holding Days: {:.1}", summary.avg_holding_days);
    if result.is_open_at_end() {
        println!("Position open at last bar");
    }

    if !result.trades.is_empty() {
        println!();
        println!(
            "{:<12} {:>10} {:<12} {:>10} {:>8}  Reason",
            "Entry", "Price", "Exit", "Price", "P/L %"
        );
        for t in &result.trades {
            println!(
                "{:<12} {:>10.2} {:<12} {:>10.2} {:>8.2}  {}",
                t.entry_date,
                t.entry_price,
                t.exit_date,
                t.exit_price,
                t.profit_loss_percentage * 100.0,
                t.exit_reason
            );
        }
    }
}

fn required_setting(
    cli_value: Option<&str>,
    adapter: &dyn ConfigPort,
    key: &str,
) -> Result<String, SwingtraderError> {
    cli_value
        .map(str::to_string)
        .or_else(|| adapter.get_string("backtest", key))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SwingtraderError::ConfigMissing {
            section: "backtest".into(),
            key: key.into(),
        })
}

fn run_backtest(
    config_path: &Path,
    ticker: Option<&str>,
    strategy_name: Option<&str>,
    timeframe: Option<&str>,
    signals_path: Option<&Path>,
    protective: bool,
    output: Option<&Path>,
) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let protective = protective || config.get_bool("backtest", "protective_exit", false);

    let ticker = required_setting(ticker, &config, "ticker")?.to_uppercase();
    let timeframe_raw = timeframe
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "timeframe"));
    let timeframe = parse_timeframe(timeframe_raw.as_deref())?;
    let range = resolve_date_range(&config, timeframe)?;

    let (label, result) = match signals_path {
        Some(path) => {
            info!(path = %path.display(), "loading signal stream");
            let signals =
                SignalSeries::from_csv_reader(File::open(path)?, &path.display().to_string())?;
            let result = backtest_signals(
                &data_port,
                &ticker,
                &signals,
                &bt_config,
                protective,
                timeframe,
                range,
            )?;
            (path.display().to_string(), result)
        }
        None => {
            let name = required_setting(strategy_name, &config, "strategy")?;
            let registry = build_registry(&config);
            let strategy = registry.find(timeframe, &name)?;
            let result = backtest_ticker(
                &data_port,
                &ticker,
                strategy,
                &bt_config,
                protective,
                timeframe,
                range,
            )?;
            (strategy.name().to_string(), result)
        }
    };

    print_summary(&ticker, &label, &result);

    if let Some(path) = output {
        write_ledger(File::create(path)?, &result.trades)?;
        info!(path = %path.display(), trades = result.trades.len(), "ledger written");
    }
    Ok(())
}

fn run_scan(
    config_path: &Path,
    tickers: &[String],
    timeframes: &[String],
) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let registry = build_registry(&config);

    let tickers: Vec<String> = if tickers.is_empty() {
        data_port.list_tickers()?
    } else {
        tickers.iter().map(|t| t.to_uppercase()).collect()
    };
    let timeframes: Vec<Timeframe> = if timeframes.is_empty() {
        registry.timeframes().collect()
    } else {
        timeframes
            .iter()
            .map(|t| parse_timeframe(Some(t)))
            .collect::<Result<_, _>>()?
    };

    info!(tickers = tickers.len(), timeframes = timeframes.len(), "scanning");
    let hits = scan_tickers(&data_port, &config, &registry, &tickers, &timeframes)?;

    if hits.is_empty() {
        println!("No signals on the latest bar");
    }
    for h in &hits {
        let level = h
            .hit
            .entry_level
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<8} {:<24} {}  entry {}",
            h.ticker,
            h.timeframe.label(),
            h.hit.strategy,
            h.hit.date,
            level
        );
    }
    Ok(())
}

fn run_indicators(
    config_path: &Path,
    ticker: &str,
    timeframe: Option<&str>,
) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let timeframe = parse_timeframe(timeframe)?;
    let range = resolve_date_range(&config, timeframe)?;
    let series = load_series(
        &data_port,
        &ticker.to_uppercase(),
        timeframe,
        range,
        &STANDARD_INDICATORS,
    )?;
    write_indicator_table(io::stdout().lock(), &series)
}

fn format_fibonacci(levels: &[FibonacciLevel]) -> Vec<String> {
    levels
        .iter()
        .map(|l| format!("{:>6.1}%  {:.4}", l.ratio * 100.0, l.price))
        .collect()
}

fn run_fibonacci(
    config_path: &Path,
    ticker: &str,
    timeframe: Option<&str>,
) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let ticker = ticker.to_uppercase();
    let timeframe = parse_timeframe(timeframe)?;
    let range = resolve_date_range(&config, timeframe)?;
    let series = load_series(&data_port, &ticker, timeframe, range, &[])?;

    let levels = fibonacci_levels_for_series(series.bars()).ok_or_else(|| {
        SwingtraderError::NoData {
            ticker: ticker.clone(),
        }
    })?;
    println!("Fibonacci levels for {ticker}:");
    for line in format_fibonacci(&levels) {
        println!("{line}");
    }
    Ok(())
}

fn run_strategies(config_path: Option<&Path>) -> Result<(), SwingtraderError> {
    let registry = match config_path {
        Some(path) => build_registry(&load_config(path)?),
        None => StrategyRegistry::default(),
    };
    for timeframe in registry.timeframes() {
        println!("{timeframe}:");
        let strategies = registry.strategies(timeframe);
        if strategies.is_empty() {
            println!("  (none)");
        }
        for s in strategies {
            let columns: Vec<String> = s
                .required_indicators()
                .iter()
                .map(|t| t.to_string())
                .collect();
            if columns.is_empty() {
                println!("  {}", s.name());
            } else {
                println!("  {} [{}]", s.name(), columns.join(", "));
            }
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config)?;
    let params = build_strategy_params(&config);
    eprintln!("Backtest: {bt_config:?}");
    eprintln!("Strategy parameters: {params:?}");
    eprintln!("Configuration is valid");
    Ok(())
}
