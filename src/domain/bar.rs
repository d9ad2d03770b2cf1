//! OHLCV bar representation and series validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::RiskbenchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// (high - low) / close; the per-bar proxy for the quoted spread.
    pub fn range_ratio(&self) -> f64 {
        if self.close > 0.0 {
            (self.high - self.low) / self.close
        } else {
            0.0
        }
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn well_formed(&self) -> Result<(), String> {
        if !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
        {
            return Err("non-finite price field".into());
        }
        if self.volume < 0 {
            return Err(format!("negative volume {}", self.volume));
        }
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        if self.high < body_high {
            return Err(format!(
                "high {} below max(open, close) {}",
                self.high, body_high
            ));
        }
        if self.low > body_low {
            return Err(format!(
                "low {} above min(open, close) {}",
                self.low, body_low
            ));
        }
        Ok(())
    }
}

/// Validate a bar series: every bar well-formed, timestamps strictly
/// increasing. A gap in the series is the caller's problem; out-of-order or
/// duplicate timestamps are not.
pub fn validate_series(bars: &[Bar]) -> Result<(), RiskbenchError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.well_formed()
            .map_err(|reason| RiskbenchError::MalformedBar { index, reason })?;
        if index > 0 && bars[index - 1].timestamp >= bar.timestamp {
            return Err(RiskbenchError::MalformedBar {
                index,
                reason: format!(
                    "timestamp {} not after previous {}",
                    bar.timestamp,
                    bars[index - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
