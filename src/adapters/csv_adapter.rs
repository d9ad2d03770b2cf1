//! CSV file data adapter.
//!
//! Reads bar and signal series from `<instrument>_bars.csv` and
//! `<instrument>_signals.csv` under a base directory. Timestamps are
//! ISO-8601 (`2024-01-15T16:00:00`); signal directions use the kebab-case
//! vocabulary (`long-entry`, `hold`, ...).

use std::fs::File;
use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::RiskbenchError;
use crate::domain::signal::Signal;
use crate::ports::data_port::DataPort;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn open(&self, file_name: &str) -> Result<csv::Reader<File>, RiskbenchError> {
        let path = self.base_path.join(file_name);
        let file = File::open(&path).map_err(|e| RiskbenchError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(csv::Reader::from_reader(file))
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, RiskbenchError> {
        let file_name = format!("{instrument}_bars.csv");
        let mut rdr = self.open(&file_name)?;
        let mut bars = Vec::new();
        for (row, result) in rdr.deserialize::<Bar>().enumerate() {
            let bar = result.map_err(|e| RiskbenchError::MalformedBar {
                index: row,
                reason: format!("{file_name}: {e}"),
            })?;
            bars.push(bar);
        }
        Ok(bars)
    }

    fn fetch_signals(&self, instrument: &str) -> Result<Vec<Signal>, RiskbenchError> {
        let file_name = format!("{instrument}_signals.csv");
        let mut rdr = self.open(&file_name)?;
        let mut signals = Vec::new();
        for (row, result) in rdr.deserialize::<Signal>().enumerate() {
            let signal = result.map_err(|e| RiskbenchError::ConfigParse {
                file: file_name.clone(),
                reason: format!("row {row}: {e}"),
            })?;
            signals.push(signal);
        }
        Ok(signals)
    }
}
