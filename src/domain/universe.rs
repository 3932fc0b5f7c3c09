//! Symbol universe validation against quote-store coverage.
//!
//! Universe files are maintained by hand and routinely contain symbols the
//! store has never captured or holds only a stub of history for. Those are
//! dropped with a reason rather than failing the run.

use std::collections::HashMap;

use super::table::DateTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniverseSkipReason {
    NotInStore,
    InsufficientBars { bars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUniverseSymbol {
    pub symbol: String,
    pub reason: UniverseSkipReason,
}

#[derive(Debug, Clone)]
pub struct UniverseValidation {
    pub symbols: Vec<String>,
    pub skipped: Vec<SkippedUniverseSymbol>,
}

/// Split `symbols` into those with at least `min_bars` bars of coverage and
/// those to drop. `coverage` maps symbol to bar count in the quote store.
pub fn validate_universe(
    symbols: &[String],
    coverage: &HashMap<String, usize>,
    min_bars: usize,
) -> UniverseValidation {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match coverage.get(symbol) {
            None => skipped.push(SkippedUniverseSymbol {
                symbol: symbol.clone(),
                reason: UniverseSkipReason::NotInStore,
            }),
            Some(&bars) if bars < min_bars => skipped.push(SkippedUniverseSymbol {
                symbol: symbol.clone(),
                reason: UniverseSkipReason::InsufficientBars { bars },
            }),
            Some(_) => valid.push(symbol.clone()),
        }
    }

    UniverseValidation {
        symbols: valid,
        skipped,
    }
}

/// Keep only symbols that have a column in the signal table.
pub fn restrict_to_signals(symbols: Vec<String>, signals: &DateTable) -> Vec<String> {
    symbols
        .into_iter()
        .filter(|s| signals.has_symbol(s))
        .collect()
}
