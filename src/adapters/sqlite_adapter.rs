//! SQLite quote store.
//!
//! Quotes persist in a single `quotes` table keyed by symbol and date. A run
//! loads the whole table once into a [`MemoryQuoteAdapter`]; nothing reads
//! the database during the rebalance loop.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use super::memory_quote_adapter::MemoryQuoteAdapter;
use crate::domain::bar::QuoteBar;
use crate::domain::error::AurumError;
use crate::ports::config_port::ConfigPort;

pub struct SqliteQuoteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteQuoteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AurumError> {
        let db_path =
            config
                .get_string("data", "quotes_db")
                .ok_or_else(|| AurumError::ConfigMissing {
                    section: "data".into(),
                    key: "quotes_db".into(),
                })?;

        let pool_size = config.get_int("data", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| AurumError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, AurumError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AurumError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), AurumError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (symbol, date)
            );
            CREATE INDEX IF NOT EXISTS idx_quotes_symbol ON quotes(symbol);",
        )
        .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_bars(&self, bars: &[QuoteBar]) -> Result<(), AurumError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO quotes (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    /// One-time load of the entire table into memory.
    pub fn load(&self) -> Result<MemoryQuoteAdapter, AurumError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, open, high, low, close, volume
                 FROM quotes ORDER BY symbol, date",
            )
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| {
                let date_str: String = row.get(1)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(QuoteBar {
                    symbol: row.get(0)?,
                    date,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(
                row.map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(MemoryQuoteAdapter::from_bars(bars))
    }

    pub fn list_symbols(&self) -> Result<Vec<String>, AurumError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM quotes ORDER BY symbol")
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(
                row.map_err(|e: rusqlite::Error| AurumError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(symbols)
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, AurumError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AurumError::Database {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::quote_port::QuotePort;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_float(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn bar(symbol: &str, day: u32, close: f64) -> QuoteBar {
        QuoteBar {
            symbol: symbol.into(),
            date: NaiveDate::from_ymd_opt(2016, 10, day).unwrap(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 2_500,
        }
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteQuoteStore::from_config(&EmptyConfig);
        match result {
            Err(AurumError::ConfigMissing { section, key }) => {
                assert_eq!(section, "data");
                assert_eq!(key, "quotes_db");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn in_memory_schema_initializes() {
        let store = SqliteQuoteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
    }

    #[test]
    fn insert_and_load_round_trip() {
        let store = SqliteQuoteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store
            .insert_bars(&[bar("ABX", 3, 17.0), bar("ABX", 4, 17.5), bar("NEM", 3, 35.0)])
            .unwrap();

        let quotes = store.load().unwrap();
        assert_eq!(
            quotes.close("ABX", NaiveDate::from_ymd_opt(2016, 10, 4).unwrap()),
            Some(17.5)
        );
        assert_eq!(quotes.coverage()["ABX"], 2);
        assert_eq!(quotes.coverage()["NEM"], 1);
    }

    #[test]
    fn insert_or_replace_deduplicates() {
        let store = SqliteQuoteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store.insert_bars(&[bar("ABX", 3, 17.0)]).unwrap();
        store.insert_bars(&[bar("ABX", 3, 18.0)]).unwrap();

        let quotes = store.load().unwrap();
        assert_eq!(quotes.coverage()["ABX"], 1);
        assert_eq!(
            quotes.close("ABX", NaiveDate::from_ymd_opt(2016, 10, 3).unwrap()),
            Some(18.0)
        );
    }

    #[test]
    fn list_symbols_sorted() {
        let store = SqliteQuoteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store
            .insert_bars(&[bar("NEM", 3, 35.0), bar("ABX", 3, 17.0)])
            .unwrap();

        assert_eq!(
            store.list_symbols().unwrap(),
            vec!["ABX".to_string(), "NEM".to_string()]
        );
    }

    #[test]
    fn empty_store_loads_empty_adapter() {
        let store = SqliteQuoteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        let quotes = store.load().unwrap();
        assert!(quotes.symbols().is_empty());
    }
}
