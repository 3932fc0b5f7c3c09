//! CSV loading for signals, market caps and symbol lists, plus the CSV
//! report writer.
//!
//! Signal and market-cap files are wide tables: a date index column followed
//! by one column per symbol. Cells that fail to parse (blank, `nan`, junk)
//! become 0.0 and rows with unparseable dates are dropped, matching how the
//! upstream signal exports behave.

use chrono::NaiveDate;
use std::fs::File;
use std::path::Path;

use crate::domain::driver::BacktestHistory;
use crate::domain::error::AurumError;
use crate::domain::table::DateTable;
use crate::ports::report_port::ReportPort;

fn csv_err(path: &Path, e: impl std::fmt::Display) -> AurumError {
    AurumError::Csv {
        file: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Load a wide date/symbol table (signals or market caps).
pub fn load_date_table(path: &Path) -> Result<DateTable, AurumError> {
    let file = File::open(path).map_err(|e| csv_err(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers().map_err(|e| csv_err(path, e))?;
    if headers.is_empty() {
        return Err(csv_err(path, "empty header row"));
    }
    let symbols: Vec<String> = headers
        .iter()
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();

    let mut table = DateTable::new(symbols);

    for record in reader.records() {
        let record = record.map_err(|e| csv_err(path, e))?;
        let Some(date_str) = record.get(0) else {
            continue;
        };
        // Rows with an unparseable index (the NaT rows of the source export)
        // are dropped rather than failing the load.
        let Ok(date) = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d") else {
            continue;
        };

        let values: Vec<f64> = record
            .iter()
            .skip(1)
            .map(|cell| {
                let parsed: f64 = cell.trim().parse().unwrap_or(0.0);
                if parsed.is_nan() { 0.0 } else { parsed }
            })
            .collect();

        table.insert_row(date, values);
    }

    Ok(table)
}

/// Load a one-column symbol list (header row skipped).
pub fn load_symbol_list(path: &Path) -> Result<Vec<String>, AurumError> {
    let file = File::open(path).map_err(|e| csv_err(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_err(path, e))?;
        if let Some(symbol) = record.get(0) {
            let symbol = symbol.trim();
            if !symbol.is_empty() {
                symbols.push(symbol.to_string());
            }
        }
    }
    Ok(symbols)
}

/// Writes a run as two CSVs: the per-date summary at the requested path and
/// the per-order fills next to it with a `_fills` suffix.
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn fills_path(output_path: &Path) -> std::path::PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "history".to_string());
        output_path.with_file_name(format!("{stem}_fills.csv"))
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, history: &BacktestHistory, output_path: &Path) -> Result<(), AurumError> {
        let mut writer =
            csv::Writer::from_path(output_path).map_err(|e| csv_err(output_path, e))?;

        writer
            .write_record([
                "date",
                "account_value",
                "cash",
                "long_value",
                "short_value",
                "fills",
                "skipped",
            ])
            .map_err(|e| csv_err(output_path, e))?;

        for record in &history.records {
            writer
                .write_record([
                    record.date.format("%Y-%m-%d").to_string(),
                    format!("{:.2}", record.account_value),
                    format!("{:.2}", record.cash),
                    format!("{:.2}", record.long_value),
                    format!("{:.2}", record.short_value),
                    record.fills.len().to_string(),
                    record.skipped.len().to_string(),
                ])
                .map_err(|e| csv_err(output_path, e))?;
        }
        writer.flush().map_err(|e| csv_err(output_path, e))?;

        let fills_path = Self::fills_path(output_path);
        let mut fills =
            csv::Writer::from_path(&fills_path).map_err(|e| csv_err(&fills_path, e))?;

        fills
            .write_record([
                "date",
                "symbol",
                "type",
                "quantity",
                "fill_price",
                "transfer_amount",
                "commission",
            ])
            .map_err(|e| csv_err(&fills_path, e))?;

        for record in &history.records {
            for fill in &record.fills {
                fills
                    .write_record([
                        record.date.format("%Y-%m-%d").to_string(),
                        fill.symbol.clone(),
                        fill.order_type.as_str().to_string(),
                        fill.quantity.to_string(),
                        format!("{:.4}", fill.fill_price),
                        format!("{:.2}", fill.transfer_amount),
                        format!("{:.2}", fill.commission),
                    ])
                    .map_err(|e| csv_err(&fills_path, e))?;
            }
        }
        fills.flush().map_err(|e| csv_err(&fills_path, e))?;

        Ok(())
    }
}
