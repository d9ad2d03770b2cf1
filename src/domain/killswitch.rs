//! Latched emergency-stop evaluation over streaming risk inputs.
//!
//! The monitor holds no market history; each `evaluate` call receives the
//! caller's accumulated state (current drawdown, current spread ratio, a
//! recent-volume window). The only state kept here is the Active/Tripped
//! latch: once tripped, every subsequent call reports the original
//! triggering reasons until an explicit `reset`, so a momentary recovery
//! cannot silently resume trading.

use serde::{Deserialize, Serialize};

use super::bar::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct KillSwitchThresholds {
    /// Trip when drawdown-from-peak <= -max_drawdown. Positive fraction.
    pub max_drawdown: f64,
    /// Trip when the current spread ratio reaches this multiple of normal.
    pub spread_multiple: f64,
    /// Bars of the volume window that must sum to zero to trip.
    pub volume_lookback: usize,
}

impl Default for KillSwitchThresholds {
    fn default() -> Self {
        KillSwitchThresholds {
            max_drawdown: 0.20,
            spread_multiple: 3.0,
            volume_lookback: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripReason {
    DrawdownLimit,
    SpreadWidening,
    VolumeCollapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Active,
    Tripped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripDecision {
    pub tripped: bool,
    /// All conditions that fired, in evaluation order, not just the first.
    pub reasons: Vec<TripReason>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillSwitchMonitor {
    thresholds: KillSwitchThresholds,
    state: MonitorState,
    reasons: Vec<TripReason>,
}

impl KillSwitchMonitor {
    pub fn new(thresholds: KillSwitchThresholds) -> Self {
        KillSwitchMonitor {
            thresholds,
            state: MonitorState::Active,
            reasons: Vec::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Evaluate the three trip conditions. All are checked on every call and
    /// every firing reason is reported. Once tripped the decision latches:
    /// later calls return the original reasons regardless of input.
    pub fn evaluate(
        &mut self,
        current_drawdown: f64,
        current_spread_ratio: f64,
        recent_volume: &[i64],
    ) -> TripDecision {
        if self.state == MonitorState::Tripped {
            return TripDecision {
                tripped: true,
                reasons: self.reasons.clone(),
            };
        }

        let mut reasons = Vec::new();
        if current_drawdown <= -self.thresholds.max_drawdown {
            reasons.push(TripReason::DrawdownLimit);
        }
        if current_spread_ratio >= self.thresholds.spread_multiple {
            reasons.push(TripReason::SpreadWidening);
        }
        let window_start = recent_volume
            .len()
            .saturating_sub(self.thresholds.volume_lookback);
        let window = &recent_volume[window_start..];
        // An empty window is missing data, not a halted market.
        if !window.is_empty() && window.iter().sum::<i64>() == 0 {
            reasons.push(TripReason::VolumeCollapse);
        }

        if reasons.is_empty() {
            TripDecision {
                tripped: false,
                reasons,
            }
        } else {
            self.state = MonitorState::Tripped;
            self.reasons = reasons.clone();
            TripDecision {
                tripped: true,
                reasons,
            }
        }
    }

    /// Explicit external reset back to Active. Never called by the engine;
    /// resuming after a trip is a human decision.
    pub fn reset(&mut self) {
        self.state = MonitorState::Active;
        self.reasons.clear();
    }
}

/// Current spread ratio of a bar window: the last bar's (high-low)/close
/// range relative to the window average. 1.0 on degenerate input.
pub fn spread_ratio(bars: &[Bar]) -> f64 {
    let Some(last) = bars.last() else {
        return 1.0;
    };
    let avg = bars.iter().map(|b| b.range_ratio()).sum::<f64>() / bars.len() as f64;
    if avg > 0.0 { last.range_ratio() / avg } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monitor() -> KillSwitchMonitor {
        KillSwitchMonitor::new(KillSwitchThresholds::default())
    }

    const CALM: &[i64] = &[100, 100, 100, 100, 100];

    #[test]
    fn stays_active_on_benign_inputs() {
        let mut m = monitor();
        let d = m.evaluate(-0.05, 1.2, CALM);
        assert!(!d.tripped);
        assert!(d.reasons.is_empty());
        assert_eq!(m.state(), MonitorState::Active);
    }

    #[test]
    fn trips_on_drawdown_at_threshold() {
        let mut m = monitor();
        let d = m.evaluate(-0.20, 1.0, CALM);
        assert!(d.tripped);
        assert_eq!(d.reasons, vec![TripReason::DrawdownLimit]);
    }

    #[test]
    fn does_not_trip_just_above_drawdown_threshold() {
        let mut m = monitor();
        assert!(!m.evaluate(-0.1999, 1.0, CALM).tripped);
    }

    #[test]
    fn trips_on_spread_at_threshold() {
        let mut m = monitor();
        let d = m.evaluate(0.0, 3.0, CALM);
        assert!(d.tripped);
        assert_eq!(d.reasons, vec![TripReason::SpreadWidening]);
    }

    #[test]
    fn trips_on_zero_volume_window() {
        let mut m = monitor();
        let d = m.evaluate(0.0, 1.0, &[0, 0, 0, 0, 0]);
        assert!(d.tripped);
        assert_eq!(d.reasons, vec![TripReason::VolumeCollapse]);
    }

    #[test]
    fn only_lookback_tail_counts_for_volume() {
        // Older non-zero volume outside the 5-bar lookback must not mask a
        // halted tail.
        let mut m = monitor();
        let d = m.evaluate(0.0, 1.0, &[500, 500, 0, 0, 0, 0, 0]);
        assert!(d.tripped);
        assert_eq!(d.reasons, vec![TripReason::VolumeCollapse]);
    }

    #[test]
    fn empty_volume_window_does_not_trip() {
        let mut m = monitor();
        assert!(!m.evaluate(0.0, 1.0, &[]).tripped);
    }

    #[test]
    fn all_firing_reasons_reported_in_order() {
        let mut m = monitor();
        let d = m.evaluate(-0.30, 4.0, &[0, 0, 0, 0, 0]);
        assert!(d.tripped);
        assert_eq!(
            d.reasons,
            vec![
                TripReason::DrawdownLimit,
                TripReason::SpreadWidening,
                TripReason::VolumeCollapse
            ]
        );
    }

    #[test]
    fn latch_survives_recovered_inputs() {
        let mut m = monitor();
        let first = m.evaluate(-0.25, 1.0, CALM);
        assert!(first.tripped);

        // Inputs that would not trip on their own.
        let second = m.evaluate(0.0, 1.0, CALM);
        assert!(second.tripped);
        assert_eq!(second.reasons, vec![TripReason::DrawdownLimit]);
        assert_eq!(m.state(), MonitorState::Tripped);
    }

    #[test]
    fn latch_preserves_original_reasons() {
        let mut m = monitor();
        m.evaluate(-0.25, 1.0, CALM);
        // A later call with a different breach still reports the original.
        let d = m.evaluate(0.0, 5.0, CALM);
        assert_eq!(d.reasons, vec![TripReason::DrawdownLimit]);
    }

    #[test]
    fn reset_returns_to_active() {
        let mut m = monitor();
        m.evaluate(-0.25, 1.0, CALM);
        m.reset();
        assert_eq!(m.state(), MonitorState::Active);
        let d = m.evaluate(0.0, 1.0, CALM);
        assert!(!d.tripped);
        assert!(d.reasons.is_empty());
    }

    #[test]
    fn custom_thresholds_respected() {
        let mut m = KillSwitchMonitor::new(KillSwitchThresholds {
            max_drawdown: 0.10,
            spread_multiple: 2.0,
            volume_lookback: 3,
        });
        assert!(m.evaluate(-0.10, 0.0, CALM).tripped);
        m.reset();
        assert!(m.evaluate(0.0, 2.0, CALM).tripped);
        m.reset();
        // Lookback 3: the tail [100, 0, 0] is non-zero in sum.
        assert!(!m.evaluate(0.0, 1.0, &[0, 0, 100, 0, 0]).tripped);
    }

    #[test]
    fn spread_ratio_of_widening_bar() {
        let mut bars: Vec<Bar> = (0..10)
            .map(|i| Bar {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::minutes(i),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 100,
            })
            .collect();
        // Last bar's range triples.
        bars.last_mut().unwrap().high = 103.0;
        bars.last_mut().unwrap().low = 97.0;
        let ratio = spread_ratio(&bars);
        assert!(ratio > 2.0 && ratio < 3.0);
    }

    #[test]
    fn spread_ratio_degenerate_inputs() {
        assert_eq!(spread_ratio(&[]), 1.0);
    }
}
