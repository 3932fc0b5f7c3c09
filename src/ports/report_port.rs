//! Backtest history output port trait.

use std::path::Path;

use crate::domain::driver::BacktestHistory;
use crate::domain::error::AurumError;

/// Port for persisting a completed backtest run.
pub trait ReportPort {
    fn write(&self, history: &BacktestHistory, output_path: &Path) -> Result<(), AurumError>;
}
