//! Domain error types.

use chrono::NaiveDate;

use super::ledger::LedgerError;

/// Top-level error type for aurum.
#[derive(Debug, thiserror::Error)]
pub enum AurumError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("no quote for {symbol} on {date}")]
    NoQuote { symbol: String, date: NaiveDate },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("no usable symbols: {reason}")]
    EmptyUniverse { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AurumError> for std::process::ExitCode {
    fn from(err: &AurumError) -> Self {
        let code: u8 = match err {
            AurumError::Io(_) => 1,
            AurumError::ConfigParse { .. }
            | AurumError::ConfigMissing { .. }
            | AurumError::ConfigInvalid { .. } => 2,
            AurumError::Database { .. } | AurumError::DatabaseQuery { .. } => 3,
            AurumError::Csv { .. } => 4,
            AurumError::NoQuote { .. } | AurumError::EmptyUniverse { .. } => 5,
            AurumError::Ledger(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
