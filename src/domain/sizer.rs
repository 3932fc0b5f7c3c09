//! Candidate selection and volatility/signal-rank position sizing.
//!
//! For a rebalance date the sizer turns a signal row into a weighted candidate
//! set: ATR-derived volatility is inverted and blended with the signal-rank
//! weight, and the blend is normalized so the weights sum to one. Symbols with
//! missing quotes or too little history for the ATR window are skipped, not
//! fatal; an empty candidate set is a valid result.

use chrono::NaiveDate;

use super::table::DateTable;
use crate::ports::quote_port::QuotePort;

/// One selected symbol with its sizing inputs and final weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub signal: f64,
    pub prev_date: NaiveDate,
    pub prev_close: f64,
    pub close: f64,
    pub atr: f64,
    /// ATR over close, normalized so the candidate set sums to 1.
    pub volatility: f64,
    pub inverse_volatility_weight: f64,
    pub rank_weight: f64,
    pub position_size_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No close available on the sizing date (or on the previous date).
    NoQuote,
    /// The symbol has no trading date before the sizing date.
    NoPreviousDate,
    /// Fewer than `window + 1` bars of history.
    NoAtr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

/// A sized candidate set plus the symbols that fell out along the way.
#[derive(Debug, Clone, Default)]
pub struct SizingOutcome {
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Symbols whose signal is strictly positive on `date`, in column order.
pub fn positive_signal_picks(signals: &DateTable, date: NaiveDate) -> Vec<(String, f64)> {
    match signals.row(date) {
        Some(row) => row.into_iter().filter(|(_, signal)| *signal > 0.0).collect(),
        None => Vec::new(),
    }
}

/// Bottom-`count` symbols by ascending signal ("most undervalued" mode),
/// keeping only symbols with a close on `date`.
pub fn bottom_signal_picks(
    signals: &DateTable,
    date: NaiveDate,
    count: usize,
    quotes: &dyn QuotePort,
) -> Vec<(String, f64)> {
    let mut picks: Vec<(String, f64)> = match signals.row(date) {
        Some(row) => row
            .into_iter()
            .filter(|(symbol, _)| quotes.close(symbol, date).is_some())
            .collect(),
        None => Vec::new(),
    };
    picks.sort_by(|a, b| a.1.total_cmp(&b.1));
    picks.truncate(count);
    picks
}

/// Fetch prices and ATR for each pick and compute the blended weights.
///
/// Weight pipeline across the surviving set: `volatility = atr / close`
/// normalized to sum 1; `inverse_volatility_weight = 1 / (volatility * 100)`
/// renormalized; `rank_weight = signal / Σ signal`; the position size weight
/// is the renormalized sum of the last two.
pub fn size_candidates(
    picks: &[(String, f64)],
    date: NaiveDate,
    window: usize,
    quotes: &dyn QuotePort,
) -> SizingOutcome {
    let mut outcome = SizingOutcome::default();

    for (symbol, signal) in picks {
        let Some(close) = quotes.close(symbol, date) else {
            outcome.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoQuote,
            });
            continue;
        };
        let Some(prev_date) = quotes.previous_trading_date(symbol, date) else {
            outcome.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoPreviousDate,
            });
            continue;
        };
        let Some(prev_close) = quotes.close(symbol, prev_date) else {
            outcome.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoQuote,
            });
            continue;
        };
        let Some(atr) = quotes.average_true_range(symbol, date, window) else {
            outcome.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoAtr,
            });
            continue;
        };

        outcome.candidates.push(Candidate {
            symbol: symbol.clone(),
            signal: *signal,
            prev_date,
            prev_close,
            close,
            atr,
            volatility: atr / close,
            inverse_volatility_weight: 0.0,
            rank_weight: 0.0,
            position_size_weight: 0.0,
        });
    }

    weigh(&mut outcome.candidates);
    outcome
}

/// Positive-signal selection plus sizing, the default long-side mode.
pub fn long_candidates(
    signals: &DateTable,
    date: NaiveDate,
    window: usize,
    quotes: &dyn QuotePort,
) -> SizingOutcome {
    size_candidates(&positive_signal_picks(signals, date), date, window, quotes)
}

fn weigh(candidates: &mut [Candidate]) {
    if candidates.is_empty() {
        return;
    }

    let vol_sum: f64 = candidates.iter().map(|c| c.volatility).sum();
    for c in candidates.iter_mut() {
        c.volatility /= vol_sum;
        c.inverse_volatility_weight = 1.0 / (c.volatility * 100.0);
    }

    let inv_sum: f64 = candidates.iter().map(|c| c.inverse_volatility_weight).sum();
    let signal_sum: f64 = candidates.iter().map(|c| c.signal).sum();
    for c in candidates.iter_mut() {
        c.inverse_volatility_weight /= inv_sum;
        c.rank_weight = c.signal / signal_sum;
        c.position_size_weight = c.inverse_volatility_weight + c.rank_weight;
    }

    let size_sum: f64 = candidates.iter().map(|c| c.position_size_weight).sum();
    for c in candidates.iter_mut() {
        c.position_size_weight /= size_sum;
    }
}

/// Drop candidates whose market cap (as of `date`) is below `min_cap`.
///
/// Surviving rows keep the weights computed over the unfiltered set; whether
/// to re-normalize afterwards is the caller's decision.
pub fn filter_by_market_cap(
    candidates: Vec<Candidate>,
    caps: &DateTable,
    date: NaiveDate,
    min_cap: f64,
) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| caps.as_of(date, &c.symbol).unwrap_or(0.0) >= min_cap)
        .collect()
}

/// Hedge/complement selection from a secondary universe.
///
/// Excludes anything already in the long set, requires a close on `date`,
/// sorts by market cap descending when a cap table is supplied, and truncates
/// to `count` when given.
pub fn hedge_symbols(
    universe: &[String],
    longs: &[Candidate],
    date: NaiveDate,
    quotes: &dyn QuotePort,
    caps: Option<&DateTable>,
    count: Option<usize>,
) -> Vec<String> {
    let mut symbols: Vec<String> = universe
        .iter()
        .filter(|s| !longs.iter().any(|c| &c.symbol == *s))
        .filter(|s| quotes.close(s, date).is_some())
        .cloned()
        .collect();

    if let Some(caps) = caps {
        symbols.sort_by(|a, b| {
            let cap_a = caps.as_of(date, a).unwrap_or(0.0);
            let cap_b = caps.as_of(date, b).unwrap_or(0.0);
            cap_b.total_cmp(&cap_a)
        });
    }
    if let Some(count) = count {
        symbols.truncate(count);
    }
    symbols
}
