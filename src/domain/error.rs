//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for swingtrader.
#[derive(Debug, thiserror::Error)]
pub enum SwingtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// A strategy's required indicator column is absent from the series.
    #[error("strategy {strategy} requires indicator column {column}")]
    MissingIndicator { strategy: String, column: String },

    /// A signal stream without the mandatory `signal` column.
    #[error("signal stream from {source_name} has no 'signal' column")]
    MissingSignalColumn { source_name: String },

    /// An indicator column whose points do not line up with the bars.
    #[error("indicator column {column} is misaligned: {reason}")]
    MisalignedIndicator { column: String, reason: String },

    #[error("unknown strategy {name:?} for timeframe {timeframe}")]
    UnknownStrategy { name: String, timeframe: String },

    #[error("bars out of order: {date} does not follow {previous}")]
    UnorderedBars { previous: NaiveDate, date: NaiveDate },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("data read error: {reason}")]
    DataRead { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SwingtraderError> for std::process::ExitCode {
    fn from(err: &SwingtraderError) -> Self {
        let code: u8 = match err {
            SwingtraderError::Io(_) | SwingtraderError::Csv(_) => 1,
            SwingtraderError::ConfigParse { .. }
            | SwingtraderError::ConfigMissing { .. }
            | SwingtraderError::ConfigInvalid { .. } => 2,
            SwingtraderError::MissingIndicator { .. }
            | SwingtraderError::MissingSignalColumn { .. }
            | SwingtraderError::MisalignedIndicator { .. }
            | SwingtraderError::UnknownStrategy { .. } => 4,
            SwingtraderError::NoData { .. }
            | SwingtraderError::DataRead { .. }
            | SwingtraderError::UnorderedBars { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
