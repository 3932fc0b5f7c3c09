#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};

pub use aurum::adapters::memory_quote_adapter::MemoryQuoteAdapter;
pub use aurum::domain::bar::QuoteBar;
pub use aurum::domain::table::DateTable;

/// Weekday dates starting at `start`, `count` of them.
pub fn trading_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut date = start;
    while dates.len() < count {
        if date.weekday().number_from_monday() <= 5 {
            dates.push(date);
        }
        date = date.succ_opt().unwrap();
    }
    dates
}

/// Bars with a constant close and a fixed 2% intraday range on each date.
pub fn flat_bars(symbol: &str, dates: &[NaiveDate], close: f64) -> Vec<QuoteBar> {
    dates
        .iter()
        .map(|date| QuoteBar {
            symbol: symbol.to_string(),
            date: *date,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 250_000,
        })
        .collect()
}

/// Bars drifting linearly from `start_close` by `step` per bar.
pub fn drifting_bars(
    symbol: &str,
    dates: &[NaiveDate],
    start_close: f64,
    step: f64,
) -> Vec<QuoteBar> {
    dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let close = start_close + step * i as f64;
            QuoteBar {
                symbol: symbol.to_string(),
                date: *date,
                open: close - step,
                high: close + close * 0.01,
                low: close - close * 0.01,
                close,
                volume: 250_000,
            }
        })
        .collect()
}

/// A signal table with the same value for every symbol on every date.
pub fn constant_signals(symbols: &[&str], dates: &[NaiveDate], value: f64) -> DateTable {
    let mut table = DateTable::new(symbols.iter().map(|s| s.to_string()).collect());
    for date in dates {
        table.insert_row(*date, vec![value; symbols.len()]);
    }
    table
}

/// A market-cap table with one constant cap per symbol across all dates.
pub fn constant_caps(rows: &[(&str, f64)], dates: &[NaiveDate]) -> DateTable {
    let mut table = DateTable::new(rows.iter().map(|(s, _)| s.to_string()).collect());
    for date in dates {
        table.insert_row(*date, rows.iter().map(|(_, cap)| *cap).collect());
    }
    table
}
