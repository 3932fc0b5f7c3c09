//! Simulated order execution with slippage and a tiered commission schedule.
//!
//! Dollar-amount orders are fitted to the available cash by a retry loop that
//! shrinks the share count one at a time until the transfer fits both the
//! requested amount and the ledger balance. Exhausting the count is a normal
//! outcome reported as a zero-quantity fill, never an error.

use chrono::NaiveDate;

use super::error::AurumError;
use super::ledger::{LedgerError, PortfolioLedger};
use crate::ports::quote_port::QuotePort;

/// The four supported order types.
///
/// Each row fixes the ledger mutation, the cash direction, the slippage sign
/// and the commission sign:
///
/// | type  | position          | cash     | slippage | commission |
/// |-------|-------------------|----------|----------|------------|
/// | buy   | add `+qty`        | withdraw | +        | +          |
/// | sell  | remove `-qty`     | deposit  | −        | −          |
/// | short | add `-qty`        | withdraw | −        | −          |
/// | cover | remove `+qty`     | deposit  | +        | −          |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Buy,
    Sell,
    Short,
    Cover,
}

impl OrderType {
    /// Sign applied to both the slippage offset and the signed share count.
    pub fn sign(self) -> i64 {
        match self {
            OrderType::Buy | OrderType::Cover => 1,
            OrderType::Sell | OrderType::Short => -1,
        }
    }

    /// Sign of the commission inside the transfer amount: buys pay on top,
    /// every other type pays out of the proceeds/escrow.
    pub fn fee_sign(self) -> f64 {
        match self {
            OrderType::Buy => 1.0,
            _ => -1.0,
        }
    }

    /// Whether this type grows a position (`add_position` + withdraw) rather
    /// than shrinking one (`remove_position` + deposit).
    fn opens(self) -> bool {
        matches!(self, OrderType::Buy | OrderType::Short)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Sell => "sell",
            OrderType::Short => "short",
            OrderType::Cover => "cover",
        }
    }
}

/// Either a dollar budget to fit shares into, or an explicit share count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSize {
    Amount(f64),
    Quantity(i64),
}

/// Execution parameters shared by every order in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Absolute price offset applied against the trader on every fill.
    pub slippage: f64,
    pub commission_per_share: f64,
    pub commission_min: f64,
    /// Cap, as a fraction of trade value, applied once the per-share fee
    /// exceeds one dollar.
    pub commission_max_fraction: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            slippage: 0.01,
            commission_per_share: 0.005,
            commission_min: 1.0,
            commission_max_fraction: 0.005,
        }
    }
}

/// Outcome of one order. `quantity` is signed (negative for sell/short rows)
/// and 0 when the retry loop exhausted without a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub symbol: String,
    pub order_type: OrderType,
    pub quantity: i64,
    pub fill_price: f64,
    pub transfer_amount: f64,
    pub commission: f64,
}

impl OrderResult {
    pub fn filled(&self) -> bool {
        self.quantity != 0
    }
}

/// Commission for `quantity` shares worth `shares_value` in total:
/// per-share fee with a floor, then (above one dollar) a cap expressed as a
/// fraction of trade value.
fn commission_for(config: &ExecutionConfig, quantity: i64, shares_value: f64) -> f64 {
    let mut commission =
        (config.commission_per_share * quantity as f64).max(config.commission_min);
    if commission > 1.0 {
        commission = commission.min(config.commission_max_fraction * shares_value);
    }
    commission
}

/// Execute one simulated order against the ledger.
///
/// The fitting loop strictly decreases the share count each iteration, so it
/// terminates after at most the initial count of passes. Insufficient funds
/// are absorbed by the loop; `remove_position` precondition violations
/// propagate, since they mean the caller ordered against a position it does
/// not hold.
pub fn post_order(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
    order_type: OrderType,
    size: OrderSize,
) -> Result<OrderResult, AurumError> {
    let quote = quotes
        .close(symbol, date)
        .ok_or_else(|| AurumError::NoQuote {
            symbol: symbol.to_string(),
            date,
        })?;
    let fill_price = quote + config.slippage * order_type.sign() as f64;

    let target_amount = match size {
        OrderSize::Amount(amount) => Some(amount),
        OrderSize::Quantity(_) => None,
    };
    let mut quantity = match size {
        OrderSize::Amount(amount) => (amount / fill_price).floor() as i64,
        OrderSize::Quantity(qty) => qty,
    };

    while quantity > 0 {
        let shares_value = quantity as f64 * fill_price;
        let commission = commission_for(config, quantity, shares_value);
        let transfer_amount = shares_value + order_type.fee_sign() * commission;

        if let Some(amount) = target_amount {
            if transfer_amount > amount {
                quantity -= 1;
                continue;
            }
        }

        if order_type.opens() {
            if !ledger.withdraw_cash(transfer_amount) {
                quantity -= 1;
                continue;
            }
            ledger.add_position(symbol, quantity * order_type.sign(), fill_price);
        } else {
            // Shrink the position before banking the proceeds, so a
            // precondition violation leaves the cash balance untouched.
            ledger.remove_position(symbol, quantity * order_type.sign(), fill_price)?;
            ledger.deposit_cash(transfer_amount);
        }

        return Ok(OrderResult {
            symbol: symbol.to_string(),
            order_type,
            quantity: quantity * order_type.sign(),
            fill_price,
            transfer_amount,
            commission,
        });
    }

    Ok(OrderResult {
        symbol: symbol.to_string(),
        order_type,
        quantity: 0,
        fill_price,
        transfer_amount: 0.0,
        commission: 0.0,
    })
}

pub fn buy(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
    amount: f64,
) -> Result<OrderResult, AurumError> {
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Buy,
        OrderSize::Amount(amount),
    )
}

pub fn sell(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
    amount: f64,
) -> Result<OrderResult, AurumError> {
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Sell,
        OrderSize::Amount(amount),
    )
}

pub fn short(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
    amount: f64,
) -> Result<OrderResult, AurumError> {
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Short,
        OrderSize::Amount(amount),
    )
}

pub fn cover(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
    amount: f64,
) -> Result<OrderResult, AurumError> {
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Cover,
        OrderSize::Amount(amount),
    )
}

/// Sell the entire long holding in `symbol` at `date`.
pub fn sell_all(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
) -> Result<OrderResult, AurumError> {
    let quantity = held_magnitude(ledger, symbol)?;
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Sell,
        OrderSize::Quantity(quantity),
    )
}

/// Cover the entire short holding in `symbol` at `date`.
pub fn cover_all(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    config: &ExecutionConfig,
    symbol: &str,
    date: NaiveDate,
) -> Result<OrderResult, AurumError> {
    let quantity = held_magnitude(ledger, symbol)?;
    post_order(
        ledger,
        quotes,
        config,
        symbol,
        date,
        OrderType::Cover,
        OrderSize::Quantity(quantity),
    )
}

fn held_magnitude(ledger: &PortfolioLedger, symbol: &str) -> Result<i64, AurumError> {
    let pos = ledger
        .position(symbol)
        .ok_or_else(|| LedgerError::UnknownSymbol {
            symbol: symbol.to_string(),
        })?;
    Ok(pos.quantity.abs())
}
