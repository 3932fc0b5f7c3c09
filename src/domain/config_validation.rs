//! Configuration validation.
//!
//! Validates every field before a run starts, so a bad config fails fast
//! instead of dying mid-backtest.

use chrono::NaiveDate;

use super::error::AurumError;
use super::rebalance::RebalancePeriod;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), AurumError> {
    validate_start_day(config)?;
    validate_rebalance_period(config)?;
    validate_starting_cash(config)?;
    validate_margin_percent(config)?;
    Ok(())
}

pub fn validate_execution_config(config: &dyn ConfigPort) -> Result<(), AurumError> {
    for key in [
        "slippage",
        "commission_per_share",
        "commission_min",
        "commission_max_fraction",
    ] {
        let value = config.get_float("execution", key, 0.0);
        if value < 0.0 {
            return Err(AurumError::ConfigInvalid {
                section: "execution".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be non-negative"),
            });
        }
    }
    Ok(())
}

pub fn validate_sizing_config(config: &dyn ConfigPort) -> Result<(), AurumError> {
    let window = config.get_int("sizing", "atr_window", 10);
    if window < 1 {
        return Err(AurumError::ConfigInvalid {
            section: "sizing".to_string(),
            key: "atr_window".to_string(),
            reason: "atr_window must be at least 1".to_string(),
        });
    }

    let min_cap = config.get_float("sizing", "min_market_cap", 0.0);
    if min_cap < 0.0 {
        return Err(AurumError::ConfigInvalid {
            section: "sizing".to_string(),
            key: "min_market_cap".to_string(),
            reason: "min_market_cap must be non-negative".to_string(),
        });
    }

    let hedge_count = config.get_int("sizing", "hedge_count", 10);
    if hedge_count < 0 {
        return Err(AurumError::ConfigInvalid {
            section: "sizing".to_string(),
            key: "hedge_count".to_string(),
            reason: "hedge_count must be non-negative".to_string(),
        });
    }

    for key in ["long_allocation", "hedge_allocation"] {
        let value = config.get_float("sizing", key, 0.0);
        if !(0.0..=1.0).contains(&value) {
            return Err(AurumError::ConfigInvalid {
                section: "sizing".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be between 0 and 1"),
            });
        }
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), AurumError> {
    for key in ["quotes_db", "signals", "hedge_universe"] {
        match config.get_string("data", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(AurumError::ConfigMissing {
                    section: "data".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    // market_caps is optional; min_history just needs to be sane.
    let min_history = config.get_int("data", "min_history", 1);
    if min_history < 1 {
        return Err(AurumError::ConfigInvalid {
            section: "data".to_string(),
            key: "min_history".to_string(),
            reason: "min_history must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_start_day(config: &dyn ConfigPort) -> Result<(), AurumError> {
    match config.get_string("backtest", "start_day") {
        None => Err(AurumError::ConfigMissing {
            section: "backtest".to_string(),
            key: "start_day".to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| AurumError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_day".to_string(),
                reason: "invalid date format (expected YYYY-MM-DD)".to_string(),
            }),
    }
}

fn validate_rebalance_period(config: &dyn ConfigPort) -> Result<(), AurumError> {
    let period = config
        .get_string("backtest", "rebalance_period")
        .unwrap_or_else(|| "W".to_string());
    period
        .parse::<RebalancePeriod>()
        .map(|_| ())
        .map_err(|reason| AurumError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "rebalance_period".to_string(),
            reason,
        })
}

fn validate_starting_cash(config: &dyn ConfigPort) -> Result<(), AurumError> {
    let value = config.get_float("backtest", "starting_cash", 0.0);
    if value <= 0.0 {
        return Err(AurumError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "starting_cash".to_string(),
            reason: "starting_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_margin_percent(config: &dyn ConfigPort) -> Result<(), AurumError> {
    let value = config.get_float("backtest", "margin_percent", 0.0);
    if value < 0.0 {
        return Err(AurumError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "margin_percent".to_string(),
            reason: "margin_percent must be non-negative".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

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

    #[test]
    fn valid_config_passes_all_sections() {
        let config = FileConfigAdapter::from_string(VALID_INI).unwrap();
        validate_data_config(&config).unwrap();
        validate_backtest_config(&config).unwrap();
        validate_execution_config(&config).unwrap();
        validate_sizing_config(&config).unwrap();
    }

    #[test]
    fn missing_start_day_fails() {
        let config =
            FileConfigAdapter::from_string("[backtest]\nstarting_cash = 1000\n").unwrap();
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigMissing { section, key }
            if section == "backtest" && key == "start_day"));
    }

    #[test]
    fn bad_start_day_format_fails() {
        let config = FileConfigAdapter::from_string(
            "[backtest]\nstart_day = 2008_01_02\nstarting_cash = 1000\n",
        )
        .unwrap();
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "start_day"));
    }

    #[test]
    fn bad_rebalance_period_fails() {
        let config = FileConfigAdapter::from_string(
            "[backtest]\nstart_day = 2008-01-02\nrebalance_period = Y\nstarting_cash = 1000\n",
        )
        .unwrap();
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "rebalance_period"));
    }

    #[test]
    fn nonpositive_starting_cash_fails() {
        let config = FileConfigAdapter::from_string(
            "[backtest]\nstart_day = 2008-01-02\nstarting_cash = 0\n",
        )
        .unwrap();
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "starting_cash"));
    }

    #[test]
    fn negative_slippage_fails() {
        let config = FileConfigAdapter::from_string("[execution]\nslippage = -0.5\n").unwrap();
        let err = validate_execution_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "slippage"));
    }

    #[test]
    fn zero_atr_window_fails() {
        let config = FileConfigAdapter::from_string("[sizing]\natr_window = 0\n").unwrap();
        let err = validate_sizing_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "atr_window"));
    }

    #[test]
    fn allocation_above_one_fails() {
        let config =
            FileConfigAdapter::from_string("[sizing]\nlong_allocation = 1.5\n").unwrap();
        let err = validate_sizing_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigInvalid { key, .. } if key == "long_allocation"));
    }

    #[test]
    fn missing_data_paths_fail() {
        let config = FileConfigAdapter::from_string("[data]\nquotes_db = db.sqlite\n").unwrap();
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, AurumError::ConfigMissing { key, .. } if key == "signals"));
    }
}
