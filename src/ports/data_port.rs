//! Price data port trait.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::registry::Timeframe;
use chrono::NaiveDate;

/// A source of daily/weekly/monthly bars.
///
/// Implementations return bars at the interval of `timeframe`, in strictly
/// increasing date order with no duplicates. `Ok(None)` means the provider
/// has nothing for the ticker in the requested range; callers skip such
/// tickers instead of failing.
pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Vec<PriceBar>>, SwingtraderError>;

    fn list_tickers(&self) -> Result<Vec<String>, SwingtraderError>;
}
