//! Ordered price series with a date lookup and attached indicator columns.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
    indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl PriceSeries {
    /// Builds a series from bars whose dates strictly increase.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SwingtraderError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SwingtraderError::UnorderedBars {
                    previous: pair[0].date,
                    date: pair[1].date,
                });
            }
        }
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Ok(Self {
            bars,
            date_index,
            indicators: HashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn last_bar(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Attaches (or replaces) an indicator column.
    ///
    /// The column must hold one point per bar, dated like the bar it sits
    /// next to; otherwise `MisalignedIndicator`.
    pub fn insert_indicator(&mut self, series: IndicatorSeries) -> Result<(), SwingtraderError> {
        let misaligned = |reason: String| SwingtraderError::MisalignedIndicator {
            column: series.indicator_type.to_string(),
            reason,
        };
        if series.values.len() != self.bars.len() {
            return Err(misaligned(format!(
                "{} points for {} bars",
                series.values.len(),
                self.bars.len()
            )));
        }
        if let Some((bar, point)) = self
            .bars
            .iter()
            .zip(&series.values)
            .find(|(bar, point)| bar.date != point.date)
        {
            return Err(misaligned(format!(
                "point dated {} next to bar {}",
                point.date, bar.date
            )));
        }
        self.indicators.insert(series.indicator_type, series);
        Ok(())
    }

    pub fn indicator(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.indicators.get(indicator_type)
    }

    pub fn has_indicator(&self, indicator_type: &IndicatorType) -> bool {
        self.indicators.contains_key(indicator_type)
    }

    /// Looks up a column a strategy depends on.
    pub fn require(
        &self,
        strategy: &str,
        indicator_type: &IndicatorType,
    ) -> Result<&IndicatorSeries, SwingtraderError> {
        self.indicators
            .get(indicator_type)
            .ok_or_else(|| SwingtraderError::MissingIndicator {
                strategy: strategy.to_string(),
                column: indicator_type.to_string(),
            })
    }

    /// Attached indicator types in a stable order.
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types: Vec<IndicatorType> = self.indicators.keys().copied().collect();
        types.sort();
        types
    }

    /// The first `len` bars, without indicator columns.
    pub fn prefix(&self, len: usize) -> &[PriceBar] {
        &self.bars[..len.min(self.bars.len())]
    }
}
