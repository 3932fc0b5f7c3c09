//! The rebalance loop: sizer → executor → ledger, once per rebalance date.
//!
//! Each pass liquidates the book, re-selects the long and hedge sets for the
//! date, and deploys fixed fractions of account value across them in
//! proportion to the position-size weights. Every fill and every skipped
//! symbol is recorded so the report layer can reconstruct the run.

use chrono::NaiveDate;

use super::error::AurumError;
use super::ledger::PortfolioLedger;
use super::order::{self, ExecutionConfig, OrderResult};
use super::rebalance::{rebalance_dates, RebalancePeriod};
use super::sizer::{
    self, filter_by_market_cap, hedge_symbols, long_candidates, SkipReason, SkippedSymbol,
};
use super::table::DateTable;
use crate::ports::quote_port::QuotePort;

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// First date eligible for rebalancing (earlier signal rows are ignored).
    pub start_day: NaiveDate,
    pub period: RebalancePeriod,
    /// Trailing window for the ATR volatility proxy.
    pub atr_window: usize,
    /// Minimum market cap (same unit as the cap file) for long candidates.
    pub min_market_cap: f64,
    /// How many hedge symbols to short, picked by descending market cap.
    pub hedge_count: usize,
    /// Fraction of account value deployed long each rebalance.
    pub long_allocation: f64,
    /// Fraction of account value deployed into the hedge shorts.
    pub hedge_allocation: f64,
}

/// Everything that happened on one rebalance date.
#[derive(Debug, Clone)]
pub struct RebalanceRecord {
    pub date: NaiveDate,
    pub account_value: f64,
    pub cash: f64,
    pub long_value: f64,
    pub short_value: f64,
    pub fills: Vec<OrderResult>,
    pub skipped: Vec<SkippedSymbol>,
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct BacktestHistory {
    pub starting_cash: f64,
    pub records: Vec<RebalanceRecord>,
    pub final_account_value: f64,
}

impl BacktestHistory {
    pub fn total_return(&self) -> f64 {
        if self.starting_cash == 0.0 {
            return 0.0;
        }
        self.final_account_value / self.starting_cash - 1.0
    }
}

/// Run the full rebalance loop over every scheduled date.
///
/// Data-availability holes are absorbed per symbol (the skipped list records
/// them); ledger precondition violations and missing quotes for *held*
/// positions at valuation time propagate, since they indicate a driver bug or
/// an unusable store.
pub fn run_backtest(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    exec: &ExecutionConfig,
    signals: &DateTable,
    market_caps: &DateTable,
    hedge_universe: &[String],
    config: &DriverConfig,
) -> Result<BacktestHistory, AurumError> {
    let starting_cash = ledger.cash();

    let eligible: Vec<NaiveDate> = signals
        .dates()
        .copied()
        .filter(|d| *d >= config.start_day)
        .collect();
    let schedule = rebalance_dates(&eligible, config.period);

    let mut records = Vec::with_capacity(schedule.len());

    for date in schedule {
        let mut fills = Vec::new();
        let mut skipped = Vec::new();

        liquidate(ledger, quotes, exec, date, &mut fills, &mut skipped)?;

        let outcome = long_candidates(signals, date, config.atr_window, quotes);
        skipped.extend(outcome.skipped);
        let longs = filter_by_market_cap(outcome.candidates, market_caps, date, config.min_market_cap);

        let hedge_picks: Vec<(String, f64)> = hedge_symbols(
            hedge_universe,
            &longs,
            date,
            quotes,
            Some(market_caps),
            Some(config.hedge_count),
        )
        .into_iter()
        .map(|symbol| (symbol, 1.0))
        .collect();
        let hedge_outcome = sizer::size_candidates(&hedge_picks, date, config.atr_window, quotes);
        skipped.extend(hedge_outcome.skipped);

        let account = ledger.account_value(quotes, date)?;
        let long_budget = account * config.long_allocation;
        let hedge_budget = account * config.hedge_allocation;

        for candidate in &longs {
            fills.push(order::buy(
                ledger,
                quotes,
                exec,
                &candidate.symbol,
                date,
                long_budget * candidate.position_size_weight,
            )?);
        }
        for candidate in &hedge_outcome.candidates {
            fills.push(order::short(
                ledger,
                quotes,
                exec,
                &candidate.symbol,
                date,
                hedge_budget * candidate.position_size_weight,
            )?);
        }

        records.push(RebalanceRecord {
            date,
            account_value: ledger.account_value(quotes, date)?,
            cash: ledger.cash(),
            long_value: ledger.long_value(quotes, date)?,
            short_value: ledger.short_value(quotes, date)?,
            fills,
            skipped,
        });
    }

    let final_account_value = match records.last() {
        Some(record) => record.account_value,
        None => starting_cash,
    };

    Ok(BacktestHistory {
        starting_cash,
        records,
        final_account_value,
    })
}

/// Close every open position at `date`.
///
/// A symbol with no bar on the date (halted or delisted since entry) is
/// closed at its most recent close instead, so the book never carries a
/// position the valuation queries cannot price. A symbol with no history at
/// all is recorded as skipped and retained.
fn liquidate(
    ledger: &mut PortfolioLedger,
    quotes: &dyn QuotePort,
    exec: &ExecutionConfig,
    date: NaiveDate,
    fills: &mut Vec<OrderResult>,
    skipped: &mut Vec<SkippedSymbol>,
) -> Result<(), AurumError> {
    for (symbol, quantity) in ledger.open_positions() {
        let fill_date = if quotes.close(&symbol, date).is_some() {
            date
        } else {
            match quotes.previous_trading_date(&symbol, date) {
                Some(last) => last,
                None => {
                    skipped.push(SkippedSymbol {
                        symbol,
                        reason: SkipReason::NoQuote,
                    });
                    continue;
                }
            }
        };

        let fill = if quantity > 0 {
            order::sell_all(ledger, quotes, exec, &symbol, fill_date)?
        } else {
            order::cover_all(ledger, quotes, exec, &symbol, fill_date)?
        };
        fills.push(fill);
    }
    Ok(())
}
