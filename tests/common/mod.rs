#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub use riskbench::domain::bar::Bar;
pub use riskbench::domain::signal::{Signal, SignalDirection};
use riskbench::domain::engine::{SimulationConfig, SimulationEngine};
use riskbench::domain::error::RiskbenchError;
use riskbench::domain::position::TradeSide;
use riskbench::ports::data_port::DataPort;
use riskbench::ports::risk_zone_port::{RiskLevels, RiskZonePort};

pub fn ts(day_offset: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
        + chrono::Duration::days(day_offset)
}

/// A bar with no intrabar range; close == open == high == low.
pub fn flat_bar(day_offset: i64, close: f64) -> Bar {
    Bar {
        timestamp: ts(day_offset),
        open: close,
        high: close,
        low: close,
        close,
        volume: 10_000,
    }
}

pub fn ranged_bar(day_offset: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts(day_offset),
        open,
        high,
        low,
        close,
        volume: 10_000,
    }
}

/// Flat-bar series from a close sequence, one bar per day.
pub fn series(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_bar(i as i64, c))
        .collect()
}

pub fn hold_signals(len: usize) -> Vec<Signal> {
    (0..len)
        .map(|i| Signal {
            timestamp: ts(i as i64),
            direction: SignalDirection::Hold,
            strength: 0.0,
        })
        .collect()
}

pub fn set_signal(signals: &mut [Signal], index: usize, direction: SignalDirection) {
    signals[index].direction = direction;
    signals[index].strength = 80.0;
}

pub fn default_engine(position_fraction: f64) -> SimulationEngine {
    SimulationEngine::new(SimulationConfig {
        position_fraction,
        ..SimulationConfig::default()
    })
}

/// Risk zone returning the same levels for every entry.
pub struct FixedLevels(pub RiskLevels);

impl FixedLevels {
    pub fn none() -> Self {
        FixedLevels(RiskLevels::none())
    }
}

impl RiskZonePort for FixedLevels {
    fn levels(&self, _history: &[Bar], _entry_price: f64, _side: TradeSide) -> RiskLevels {
        self.0
    }
}

pub struct MockDataPort {
    pub bars: HashMap<String, Vec<Bar>>,
    pub signals: HashMap<String, Vec<Signal>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            signals: HashMap::new(),
        }
    }

    pub fn with_series(mut self, instrument: &str, bars: Vec<Bar>, signals: Vec<Signal>) -> Self {
        self.bars.insert(instrument.to_string(), bars);
        self.signals.insert(instrument.to_string(), signals);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, RiskbenchError> {
        self.bars
            .get(instrument)
            .cloned()
            .ok_or_else(|| RiskbenchError::ConfigParse {
                file: format!("{instrument}_bars.csv"),
                reason: "no such instrument".to_string(),
            })
    }

    fn fetch_signals(&self, instrument: &str) -> Result<Vec<Signal>, RiskbenchError> {
        self.signals
            .get(instrument)
            .cloned()
            .ok_or_else(|| RiskbenchError::ConfigParse {
                file: format!("{instrument}_signals.csv"),
                reason: "no such instrument".to_string(),
            })
    }
}
