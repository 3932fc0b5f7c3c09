//! In-memory quote store implementing [`QuotePort`].
//!
//! The whole price history lives in per-symbol sorted bar vectors with a
//! date index, so every lookup the core makes during a run is a hash probe.
//! The SQLite adapter loads into this type once at startup; tests build it
//! directly from fixture bars.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::bar::{trailing_atr, QuoteBar};
use crate::ports::quote_port::{QuoteField, QuotePort};

#[derive(Debug, Default)]
pub struct MemoryQuoteAdapter {
    bars: HashMap<String, Vec<QuoteBar>>,
    index: HashMap<String, HashMap<NaiveDate, usize>>,
}

impl MemoryQuoteAdapter {
    /// Group, sort and index a flat bar list.
    pub fn from_bars(bars: Vec<QuoteBar>) -> Self {
        let mut grouped: HashMap<String, Vec<QuoteBar>> = HashMap::new();
        for bar in bars {
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }

        let mut index = HashMap::new();
        for (symbol, series) in grouped.iter_mut() {
            series.sort_by_key(|b| b.date);
            index.insert(
                symbol.clone(),
                series
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (b.date, i))
                    .collect(),
            );
        }

        MemoryQuoteAdapter {
            bars: grouped,
            index,
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.bars.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Bar counts per symbol, for universe validation.
    pub fn coverage(&self) -> HashMap<String, usize> {
        self.bars
            .iter()
            .map(|(symbol, series)| (symbol.clone(), series.len()))
            .collect()
    }

    pub fn trading_dates(&self, symbol: &str) -> Option<Vec<NaiveDate>> {
        self.bars
            .get(symbol)
            .map(|series| series.iter().map(|b| b.date).collect())
    }

    /// `(first, last, count)` of a symbol's history.
    pub fn data_range(&self, symbol: &str) -> Option<(NaiveDate, NaiveDate, usize)> {
        let series = self.bars.get(symbol)?;
        let first = series.first()?;
        let last = series.last()?;
        Some((first.date, last.date, series.len()))
    }

    fn bar_at(&self, symbol: &str, date: NaiveDate) -> Option<&QuoteBar> {
        let idx = *self.index.get(symbol)?.get(&date)?;
        Some(&self.bars[symbol][idx])
    }
}

impl QuotePort for MemoryQuoteAdapter {
    fn quote(&self, symbol: &str, date: NaiveDate, field: QuoteField) -> Option<f64> {
        let bar = self.bar_at(symbol, date)?;
        Some(match field {
            QuoteField::Open => bar.open,
            QuoteField::High => bar.high,
            QuoteField::Low => bar.low,
            QuoteField::Close => bar.close,
            QuoteField::Volume => bar.volume as f64,
        })
    }

    fn previous_trading_date(&self, symbol: &str, date: NaiveDate) -> Option<NaiveDate> {
        let series = self.bars.get(symbol)?;
        // Works for non-trading dates too: the latest bar strictly before.
        let before = series.partition_point(|b| b.date < date);
        if before == 0 {
            return None;
        }
        Some(series[before - 1].date)
    }

    fn average_true_range(&self, symbol: &str, date: NaiveDate, window: usize) -> Option<f64> {
        let idx = *self.index.get(symbol)?.get(&date)?;
        trailing_atr(&self.bars[symbol][..=idx], window)
    }
}
