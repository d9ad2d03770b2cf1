//! Strategy signals, produced externally and consumed read-only.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::error::RiskbenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalDirection {
    LongEntry,
    LongExit,
    ShortEntry,
    ShortExit,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub direction: SignalDirection,
    /// Conviction in [0, 100]; carried through for reporting, not acted on.
    pub strength: f64,
}

/// Check 1:1 timestamp alignment between a bar series and a signal series.
pub fn validate_alignment(bars: &[Bar], signals: &[Signal]) -> Result<(), RiskbenchError> {
    if bars.len() != signals.len() {
        return Err(RiskbenchError::SeriesMisaligned {
            bars: bars.len(),
            signals: signals.len(),
        });
    }
    for (index, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        if bar.timestamp != signal.timestamp {
            return Err(RiskbenchError::TimestampMismatch {
                index,
                bar_ts: bar.timestamp,
                signal_ts: signal.timestamp,
            });
        }
    }
    Ok(())
}
