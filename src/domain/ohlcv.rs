//! Price bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// A bar closing above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// True when `price` lies within [low, high].
    pub fn touches(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }

    /// High ≥ Low, High ≥ Open/Close, Low ≤ Open/Close, all values finite
    /// and non-negative.
    pub fn is_well_formed(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
