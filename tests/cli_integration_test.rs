//! CLI integration tests: config parsing, builders, and dry-run mode with
//! real INI and CSV files on disk.

use chrono::NaiveDate;
use std::fs;
use std::process::ExitCode;

use aurum::adapters::file_config_adapter::FileConfigAdapter;
use aurum::cli;
use aurum::domain::rebalance::RebalancePeriod;

const VALID_INI: &str = r#"
[data]
quotes_db = data/daily_gold.db
signals = signals/signal_data.csv
market_caps = data/market_caps.csv
hedge_universe = symbols/hedge.csv
min_history = 1

[backtest]
start_day = 2008-01-02
rebalance_period = W
starting_cash = 100000.0
margin_percent = 0.0

[execution]
slippage = 0.01
commission_per_share = 0.005
commission_min = 1.0
commission_max_fraction = 0.005

[sizing]
atr_window = 10
min_market_cap = 100
hedge_count = 10
long_allocation = 1.0
hedge_allocation = 0.0
"#;

mod config_building {
    use super::*;

    #[test]
    fn build_driver_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_driver_config(&adapter, None).unwrap();

        assert_eq!(
            config.start_day,
            NaiveDate::from_ymd_opt(2008, 1, 2).unwrap()
        );
        assert_eq!(config.period, RebalancePeriod::Weekly);
        assert_eq!(config.atr_window, 10);
        assert!((config.min_market_cap - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.hedge_count, 10);
        assert!((config.long_allocation - 1.0).abs() < f64::EPSILON);
        assert!((config.hedge_allocation - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_driver_config_defaults() {
        let ini = "[backtest]\nstart_day = 2016-01-04\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let config = cli::build_driver_config(&adapter, None).unwrap();

        assert_eq!(config.period, RebalancePeriod::Weekly);
        assert_eq!(config.atr_window, 10);
        assert_eq!(config.hedge_count, 10);
        assert!((config.long_allocation - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_driver_config_start_day_override_wins() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let override_day = NaiveDate::from_ymd_opt(2016, 1, 4).unwrap();
        let config = cli::build_driver_config(&adapter, Some(override_day)).unwrap();
        assert_eq!(config.start_day, override_day);
    }

    #[test]
    fn build_driver_config_missing_start_day_fails() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert!(cli::build_driver_config(&adapter, None).is_err());
    }

    #[test]
    fn build_execution_config_reads_values() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_execution_config(&adapter);

        assert!((config.slippage - 0.01).abs() < f64::EPSILON);
        assert!((config.commission_per_share - 0.005).abs() < f64::EPSILON);
        assert!((config.commission_min - 1.0).abs() < f64::EPSILON);
        assert!((config.commission_max_fraction - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn build_execution_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[execution]\n").unwrap();
        let config = cli::build_execution_config(&adapter);
        assert!((config.slippage - 0.01).abs() < f64::EPSILON);
        assert!((config.commission_min - 1.0).abs() < f64::EPSILON);
    }
}

mod dry_run {
    use super::*;

    fn write_fixture_files(dir: &std::path::Path) -> std::path::PathBuf {
        let signals = dir.join("signals.csv");
        fs::write(
            &signals,
            "date,ABX,NEM\n2016-10-03,1.0,0.5\n2016-10-04,1.2,0.4\n",
        )
        .unwrap();

        let hedge = dir.join("hedge.csv");
        fs::write(&hedge, "symbol\nAU\nKGC\n").unwrap();

        let config = dir.join("aurum.ini");
        fs::write(
            &config,
            format!(
                "[data]\nquotes_db = {}\nsignals = {}\nhedge_universe = {}\n\n\
                 [backtest]\nstart_day = 2016-10-03\nrebalance_period = D\nstarting_cash = 50000\n\n\
                 [execution]\nslippage = 0.01\n\n\
                 [sizing]\natr_window = 5\nlong_allocation = 0.8\nhedge_allocation = 0.1\n",
                dir.join("quotes.db").display(),
                signals.display(),
                hedge.display(),
            ),
        )
        .unwrap();
        config
    }

    #[test]
    fn dry_run_accepts_valid_setup() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = write_fixture_files(dir.path());

        let code = cli::run_dry_run(&config);
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn dry_run_rejects_missing_signals_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = write_fixture_files(dir.path());
        fs::remove_file(dir.path().join("signals.csv")).unwrap();

        let code = cli::run_dry_run(&config);
        assert_ne!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn dry_run_rejects_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("bad.ini");
        fs::write(&config, "[backtest]\nstarting_cash = -5\n").unwrap();

        let code = cli::run_dry_run(&config);
        assert_ne!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn load_config_missing_file_is_config_error() {
        let path = std::path::PathBuf::from("/nonexistent/aurum.ini");
        assert!(cli::load_config(&path).is_err());
    }
}
