//! Date-indexed, symbol-columned value table.
//!
//! Backs both the signal file (one score per symbol per date) and the
//! market-cap file. Rows are kept in date order so as-of lookups can walk
//! backwards.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct DateTable {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
    rows: BTreeMap<NaiveDate, Vec<f64>>,
}

impl DateTable {
    pub fn new(symbols: Vec<String>) -> Self {
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        DateTable {
            symbols,
            index,
            rows: BTreeMap::new(),
        }
    }

    /// Insert one row of values, parallel to the symbol list. Values are
    /// truncated or zero-padded to the column count.
    pub fn insert_row(&mut self, date: NaiveDate, mut values: Vec<f64>) {
        values.resize(self.symbols.len(), 0.0);
        self.rows.insert(date, values);
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-date lookup.
    pub fn get(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        let col = *self.index.get(symbol)?;
        self.rows.get(&date).map(|row| row[col])
    }

    /// Latest value at or before `date` (market caps are published sparsely).
    pub fn as_of(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        let col = *self.index.get(symbol)?;
        self.rows
            .range(..=date)
            .next_back()
            .map(|(_, row)| row[col])
    }

    /// One full row as `(symbol, value)` pairs, in column order.
    pub fn row(&self, date: NaiveDate) -> Option<Vec<(String, f64)>> {
        self.rows.get(&date).map(|row| {
            self.symbols
                .iter()
                .cloned()
                .zip(row.iter().copied())
                .collect()
        })
    }
}
