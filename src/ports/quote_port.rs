//! Price lookup port trait.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Read-only access to historical daily quotes.
///
/// Missing data is a value, never an error: `None` means the symbol has no
/// bar for the requested date (or not enough history, for the ATR query).
pub trait QuotePort {
    fn quote(&self, symbol: &str, date: NaiveDate, field: QuoteField) -> Option<f64>;

    /// Convenience for the overwhelmingly common close lookup.
    fn close(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.quote(symbol, date, QuoteField::Close)
    }

    /// The trading date for `symbol` immediately before `date`, if any.
    fn previous_trading_date(&self, symbol: &str, date: NaiveDate) -> Option<NaiveDate>;

    /// Mean true range over the trailing `window` bars ending at `date`.
    ///
    /// Requires `window + 1` bars of history (one extra bar seeds the first
    /// previous close); `None` when history is too short or `date` is not a
    /// trading date for the symbol.
    fn average_true_range(&self, symbol: &str, date: NaiveDate, window: usize) -> Option<f64>;
}
