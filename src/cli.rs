//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::{load_date_table, load_symbol_list, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    validate_backtest_config, validate_data_config, validate_execution_config,
    validate_sizing_config,
};
use crate::domain::driver::DriverConfig;
use crate::domain::error::AurumError;
use crate::domain::order::ExecutionConfig;
use crate::domain::rebalance::RebalancePeriod;
use crate::domain::table::DateTable;
use crate::domain::universe::{restrict_to_signals, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "aurum", about = "Volatility-weighted rebalancing backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a rebalancing backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override [backtest] start_day
        #[arg(long)]
        start_day: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List symbols held in the quote store
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show per-symbol data ranges in the quote store
    Info {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            start_day,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_ref(), start_day)
            }
        }
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { symbol, config } => run_info(symbol.as_deref(), &config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = AurumError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn validate_all(config: &dyn ConfigPort) -> Result<(), AurumError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_execution_config(config)?;
    validate_sizing_config(config)?;
    Ok(())
}

pub fn build_execution_config(config: &dyn ConfigPort) -> ExecutionConfig {
    ExecutionConfig {
        slippage: config.get_float("execution", "slippage", 0.01),
        commission_per_share: config.get_float("execution", "commission_per_share", 0.005),
        commission_min: config.get_float("execution", "commission_min", 1.0),
        commission_max_fraction: config.get_float("execution", "commission_max_fraction", 0.005),
    }
}

pub fn build_driver_config(
    config: &dyn ConfigPort,
    start_day_override: Option<NaiveDate>,
) -> Result<DriverConfig, AurumError> {
    let start_day = match start_day_override {
        Some(day) => day,
        None => {
            let raw = config.get_string("backtest", "start_day").ok_or_else(|| {
                AurumError::ConfigMissing {
                    section: "backtest".into(),
                    key: "start_day".into(),
                }
            })?;
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                AurumError::ConfigInvalid {
                    section: "backtest".into(),
                    key: "start_day".into(),
                    reason: "invalid date format (expected YYYY-MM-DD)".into(),
                }
            })?
        }
    };

    let period_str = config
        .get_string("backtest", "rebalance_period")
        .unwrap_or_else(|| "W".to_string());
    let period: RebalancePeriod =
        period_str
            .parse()
            .map_err(|reason| AurumError::ConfigInvalid {
                section: "backtest".into(),
                key: "rebalance_period".into(),
                reason,
            })?;

    Ok(DriverConfig {
        start_day,
        period,
        atr_window: config.get_int("sizing", "atr_window", 10) as usize,
        min_market_cap: config.get_float("sizing", "min_market_cap", 0.0),
        hedge_count: config.get_int("sizing", "hedge_count", 10) as usize,
        long_allocation: config.get_float("sizing", "long_allocation", 1.0),
        hedge_allocation: config.get_float("sizing", "hedge_allocation", 0.0),
    })
}

/// Market caps are optional: without a file every candidate passes the cap
/// filter, so an empty table with no columns is the neutral element.
fn load_market_caps(config: &dyn ConfigPort) -> Result<DateTable, AurumError> {
    match config.get_string("data", "market_caps") {
        Some(path) if !path.trim().is_empty() => load_date_table(PathBuf::from(path).as_path()),
        _ => Ok(DateTable::new(Vec::new())),
    }
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    start_day_override: Option<NaiveDate>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let exec_config = build_execution_config(&config);
    let driver_config = match build_driver_config(&config, start_day_override) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteQuoteStore;
        use crate::domain::driver;
        use crate::domain::ledger::PortfolioLedger;

        let store = match SqliteQuoteStore::from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        eprintln!("Loading quote store into memory...");
        let quotes = match store.load() {
            Ok(q) => q,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        eprintln!("  {} symbols loaded", quotes.symbols().len());

        let signals_path = config
            .get_string("data", "signals")
            .unwrap_or_default();
        let signals = match load_date_table(PathBuf::from(&signals_path).as_path()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if signals.symbols().is_empty() || signals.is_empty() {
            let e = AurumError::EmptyUniverse {
                reason: format!("signal file {} has no usable rows", signals_path),
            };
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!(
            "Signals: {} symbols over {} dates",
            signals.symbols().len(),
            signals.len()
        );

        let market_caps = match load_market_caps(&config) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let hedge_path = config
            .get_string("data", "hedge_universe")
            .unwrap_or_default();
        let hedge_raw = match load_symbol_list(PathBuf::from(&hedge_path).as_path()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let min_history = config.get_int("data", "min_history", 1) as usize;
        let hedge_in_signals = restrict_to_signals(hedge_raw, &signals);
        let validation = validate_universe(&hedge_in_signals, &quotes.coverage(), min_history);
        for skipped in &validation.skipped {
            eprintln!("warning: dropping hedge symbol {} ({:?})", skipped.symbol, skipped.reason);
        }
        let hedge_universe = validation.symbols;
        eprintln!("Hedge universe: {} symbols", hedge_universe.len());

        let starting_cash = config.get_float("backtest", "starting_cash", 100_000.0);
        let margin_percent = config.get_float("backtest", "margin_percent", 0.0);
        let mut ledger = PortfolioLedger::new(starting_cash, margin_percent);

        eprintln!(
            "Running backtest from {} ({:?} rebalance)",
            driver_config.start_day, driver_config.period
        );

        let history = match driver::run_backtest(
            &mut ledger,
            &quotes,
            &exec_config,
            &signals,
            &market_caps,
            &hedge_universe,
            &driver_config,
        ) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        eprintln!("\n=== Results ===");
        eprintln!("Rebalances:       {}", history.records.len());
        eprintln!("Starting cash:    {:.2}", history.starting_cash);
        eprintln!("Final value:      {:.2}", history.final_account_value);
        eprintln!("Total return:     {:.2}%", history.total_return() * 100.0);
        let skipped_total: usize = history.records.iter().map(|r| r.skipped.len()).sum();
        if skipped_total > 0 {
            eprintln!("Skipped symbols:  {} (see report)", skipped_total);
        }

        let output = output_path
            .cloned()
            .unwrap_or_else(|| PathBuf::from("history.csv"));

        match CsvReportAdapter.write(&history, &output) {
            Ok(()) => {
                eprintln!("\nReport written to: {}", output.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (exec_config, driver_config, output_path);
        eprintln!("error: sqlite feature is required for backtest");
        ExitCode::from(1)
    }
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");

    let driver_config = match build_driver_config(&config, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let exec_config = build_execution_config(&config);

    eprintln!("\nBacktest parameters:");
    eprintln!("  start_day:        {}", driver_config.start_day);
    eprintln!("  period:           {:?}", driver_config.period);
    eprintln!("  atr_window:       {}", driver_config.atr_window);
    eprintln!("  min_market_cap:   {}", driver_config.min_market_cap);
    eprintln!("  hedge_count:      {}", driver_config.hedge_count);
    eprintln!("  long_allocation:  {}", driver_config.long_allocation);
    eprintln!("  hedge_allocation: {}", driver_config.hedge_allocation);
    eprintln!("\nExecution:");
    eprintln!("  slippage:         {}", exec_config.slippage);
    eprintln!("  commission/share: {}", exec_config.commission_per_share);
    eprintln!("  commission_min:   {}", exec_config.commission_min);
    eprintln!("  commission_max:   {}", exec_config.commission_max_fraction);

    let signals_path = config
        .get_string("data", "signals")
        .unwrap_or_default();
    match load_date_table(PathBuf::from(&signals_path).as_path()) {
        Ok(signals) => {
            eprintln!(
                "\nSignals: {} symbols over {} dates",
                signals.symbols().len(),
                signals.len()
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let hedge_path = config
        .get_string("data", "hedge_universe")
        .unwrap_or_default();
    match load_symbol_list(PathBuf::from(&hedge_path).as_path()) {
        Ok(symbols) => eprintln!("Hedge universe file: {} symbols", symbols.len()),
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteQuoteStore;

        let store = match SqliteQuoteStore::from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let symbols = match store.list_symbols() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        if symbols.is_empty() {
            eprintln!("No symbols found in quote store");
        } else {
            for symbol in &symbols {
                println!("{}", symbol);
            }
            eprintln!("{} symbols found", symbols.len());
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        eprintln!("error: sqlite feature is required for list-symbols");
        ExitCode::from(1)
    }
}

fn run_info(symbol: Option<&str>, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteQuoteStore;

        let store = match SqliteQuoteStore::from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let quotes = match store.load() {
            Ok(q) => q,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let symbols = match symbol {
            Some(s) => vec![s.to_string()],
            None => quotes.symbols(),
        };

        for s in &symbols {
            match quotes.data_range(s) {
                Some((first, last, count)) => {
                    println!("{}: {} bars, {} to {}", s, count, first, last);
                }
                None => eprintln!("{}: no data found", s),
            }
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (symbol, config);
        eprintln!("error: sqlite feature is required for info");
        ExitCode::from(1)
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match validate_all(&config) {
        Ok(()) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
