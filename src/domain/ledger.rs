//! Portfolio ledger: cash and signed stock positions.
//!
//! All mutation goes through four contract methods: [`PortfolioLedger::add_position`],
//! [`PortfolioLedger::remove_position`], [`PortfolioLedger::deposit_cash`] and
//! [`PortfolioLedger::withdraw_cash`]. Valuation queries price positions through
//! an injected [`QuotePort`] at an explicit date.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::AurumError;
use super::position::Position;
use crate::ports::quote_port::QuotePort;

/// Precondition violations on [`PortfolioLedger::remove_position`].
///
/// These indicate a logic error in the caller and must propagate; they are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown symbol {symbol}: no position to remove")]
    UnknownSymbol { symbol: String },

    #[error(
        "sign mismatch on {symbol}: held {held}, removing {removed} \
         (cover shorts and sell longs only)"
    )]
    SignMismatch {
        symbol: String,
        held: i64,
        removed: i64,
    },

    #[error("insufficient position on {symbol}: held {held}, removing {removed}")]
    InsufficientPosition {
        symbol: String,
        held: i64,
        removed: i64,
    },
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    cash: f64,
    margin_percent: f64,
    positions: HashMap<String, Position>,
}

impl PortfolioLedger {
    pub fn new(starting_cash: f64, margin_percent: f64) -> Self {
        PortfolioLedger {
            cash: starting_cash,
            margin_percent,
            positions: HashMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn margin_percent(&self) -> f64 {
        self.margin_percent
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn long_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_long()).collect()
    }

    pub fn short_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_short()).collect()
    }

    /// Open (non-flat) positions, as owned `(symbol, quantity)` pairs.
    pub fn open_positions(&self) -> Vec<(String, i64)> {
        let mut open: Vec<(String, i64)> = self
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| (p.symbol.clone(), p.quantity))
            .collect();
        open.sort();
        open
    }

    /// Add `quantity` of `symbol` at `price`, averaging into any existing row.
    ///
    /// The new average price is the quantity-weighted mean of the old row and
    /// the new lot. Quantities carry sign, so this opens and extends both long
    /// and short positions. A lot that nets the row to exactly zero resets the
    /// average price to 0.
    pub fn add_position(&mut self, symbol: &str, quantity: i64, price: f64) {
        let (held_qty, held_price) = match self.positions.get(symbol) {
            Some(pos) => (pos.quantity, pos.average_price),
            None => (0, 0.0),
        };

        let new_qty = held_qty + quantity;
        let new_price = if new_qty == 0 {
            0.0
        } else {
            (held_qty as f64 * held_price + quantity as f64 * price) / new_qty as f64
        };

        self.positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                quantity: new_qty,
                average_price: new_price,
            },
        );
    }

    /// Shrink the position in `symbol` by the signed delta `quantity`.
    ///
    /// `quantity` must be opposite in sign to the held quantity (sell a long
    /// with a negative delta, cover a short with a positive one) and no larger
    /// in magnitude. A full close leaves the row at quantity 0 with average
    /// price 0. The fill price is accepted for symmetry with `add_position`
    /// but not stored.
    pub fn remove_position(
        &mut self,
        symbol: &str,
        quantity: i64,
        _price: f64,
    ) -> Result<(), LedgerError> {
        let pos = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;

        let held_qty = pos.quantity;
        if held_qty.signum() * quantity.signum() >= 0 {
            return Err(LedgerError::SignMismatch {
                symbol: symbol.to_string(),
                held: held_qty,
                removed: quantity,
            });
        }
        if quantity.abs() > held_qty.abs() {
            return Err(LedgerError::InsufficientPosition {
                symbol: symbol.to_string(),
                held: held_qty,
                removed: quantity,
            });
        }

        pos.quantity = held_qty + quantity;
        if pos.quantity == 0 {
            pos.average_price = 0.0;
        }
        Ok(())
    }

    pub fn deposit_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    /// Deduct `amount` iff the balance covers it. Returns whether the
    /// withdrawal happened; on `false` the ledger is untouched. Callers retry
    /// this routinely, so failure is a value, not an error.
    pub fn withdraw_cash(&mut self, amount: f64) -> bool {
        if self.cash >= amount {
            self.cash -= amount;
            true
        } else {
            false
        }
    }

    /// Cash plus the gross value of every open position at `date`.
    ///
    /// Both long and short exposure contribute positively: this is a
    /// gross-exposure measure, not mark-to-market equity.
    pub fn account_value(
        &self,
        quotes: &dyn QuotePort,
        date: NaiveDate,
    ) -> Result<f64, AurumError> {
        let mut stock_value = 0.0;
        for pos in self.positions.values() {
            if pos.is_flat() {
                continue;
            }
            let price = self.close_or_err(quotes, &pos.symbol, date)?;
            stock_value += pos.gross_value(price);
        }
        Ok(self.cash + stock_value)
    }

    pub fn margin_value(&self, quotes: &dyn QuotePort, date: NaiveDate) -> Result<f64, AurumError> {
        Ok(self.account_value(quotes, date)? * self.margin_percent / 100.0)
    }

    pub fn percent_account_value(
        &self,
        quotes: &dyn QuotePort,
        date: NaiveDate,
        percent: f64,
    ) -> Result<f64, AurumError> {
        Ok(self.account_value(quotes, date)? * percent)
    }

    /// Gross value of one holding at `date`.
    pub fn position_value(
        &self,
        quotes: &dyn QuotePort,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<f64, AurumError> {
        let pos = self
            .positions
            .get(symbol)
            .ok_or_else(|| LedgerError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        let price = self.close_or_err(quotes, symbol, date)?;
        Ok(pos.gross_value(price))
    }

    /// Sum of `quantity * close` over long positions.
    pub fn long_value(&self, quotes: &dyn QuotePort, date: NaiveDate) -> Result<f64, AurumError> {
        let mut value = 0.0;
        for pos in self.positions.values().filter(|p| p.is_long()) {
            let price = self.close_or_err(quotes, &pos.symbol, date)?;
            value += pos.quantity as f64 * price;
        }
        Ok(value)
    }

    /// Sum of short positions revalued through their return since entry.
    ///
    /// For each short row: `original = entry_price * quantity` (negative),
    /// `ret = -((close * quantity / original) - 1)`, `value = (1 + ret) * original`.
    /// This is not the same number as a direct `quantity * close` mark and the
    /// difference is intentional.
    pub fn short_value(&self, quotes: &dyn QuotePort, date: NaiveDate) -> Result<f64, AurumError> {
        let mut value = 0.0;
        for pos in self.positions.values().filter(|p| p.is_short()) {
            let price = self.close_or_err(quotes, &pos.symbol, date)?;
            let original = pos.average_price * pos.quantity as f64;
            let ret = -((price * pos.quantity as f64 / original) - 1.0);
            value += (1.0 + ret) * original;
        }
        Ok(value)
    }

    fn close_or_err(
        &self,
        quotes: &dyn QuotePort,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<f64, AurumError> {
        quotes.close(symbol, date).ok_or_else(|| AurumError::NoQuote {
            symbol: symbol.to_string(),
            date,
        })
    }
}
