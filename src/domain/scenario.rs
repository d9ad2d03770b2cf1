//! Deterministic stress transformations of a baseline bar series.
//!
//! Every variant regenerates a full bar series from the baseline plus its
//! numeric parameters; the only stochastic element (the gap-crash index when
//! none is given) draws from an explicit seed, so identical inputs always
//! produce identical output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::bar::Bar;
use super::error::RiskbenchError;

/// Returns are floored here when a shock factor would push a close to or
/// below zero.
const MIN_BAR_RETURN: f64 = -0.99;

#[derive(Debug, Clone, PartialEq)]
pub enum StressScenario {
    /// Identity transform; the control case.
    Baseline,
    /// Multiply every per-bar return by `factor`, preserving sign sequence.
    VolatilityShock { factor: f64 },
    /// One discontinuous downward jump of `magnitude` (fraction of price) at
    /// `index`, or at a seeded index when `None`; the original trajectory
    /// resumes from the new level.
    GapCrash { magnitude: f64, index: Option<usize> },
    /// Clamp per-bar returns to ±`max_return`. Clipped magnitude is
    /// discarded; the series re-anchors to the clamped level.
    LimitMove { max_return: f64 },
    /// Scale volume linearly toward zero over the final `window` bars.
    /// Prices are untouched.
    LiquidityDryUp { window: usize },
    /// Blend each series' returns toward the cross-series mean with weight
    /// `target`, driving pairwise correlation toward 1 as `target` → 1.
    /// Multi-series only.
    CorrelationBreakdown { target: f64 },
}

impl StressScenario {
    pub fn name(&self) -> &'static str {
        match self {
            StressScenario::Baseline => "baseline",
            StressScenario::VolatilityShock { .. } => "volatility-shock",
            StressScenario::GapCrash { .. } => "gap-crash",
            StressScenario::LimitMove { .. } => "limit-move",
            StressScenario::LiquidityDryUp { .. } => "liquidity-dry-up",
            StressScenario::CorrelationBreakdown { .. } => "correlation-breakdown",
        }
    }

    /// The single-instrument variants, in a fixed order for suite runs.
    pub fn single_series_suite() -> Vec<StressScenario> {
        vec![
            StressScenario::Baseline,
            StressScenario::VolatilityShock { factor: 2.0 },
            StressScenario::GapCrash {
                magnitude: 0.10,
                index: None,
            },
            StressScenario::LimitMove { max_return: 0.10 },
            StressScenario::LiquidityDryUp { window: 20 },
        ]
    }
}

fn close_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            if w[0].close > 0.0 {
                (w[1].close - w[0].close) / w[0].close
            } else {
                0.0
            }
        })
        .collect()
}

/// Rebuild a series from the first baseline bar and a replacement return
/// sequence. Each bar's open/high/low scale with its close so bar shape (and
/// the high/low containment invariant) survives.
fn rebuild(bars: &[Bar], new_returns: &[f64]) -> Vec<Bar> {
    debug_assert_eq!(new_returns.len() + 1, bars.len());
    let mut out = Vec::with_capacity(bars.len());
    out.push(bars[0].clone());
    let mut close = bars[0].close;
    for (bar, r) in bars[1..].iter().zip(new_returns) {
        close *= 1.0 + r.max(MIN_BAR_RETURN);
        let ratio = if bar.close > 0.0 { close / bar.close } else { 1.0 };
        out.push(Bar {
            timestamp: bar.timestamp,
            open: bar.open * ratio,
            high: bar.high * ratio,
            low: bar.low * ratio,
            close: bar.close * ratio,
            volume: bar.volume,
        });
    }
    out
}

/// Generate the stressed variant of a single series. Deterministic given
/// `seed`. `CorrelationBreakdown` needs multiple series and fails here;
/// use [`generate_multi`].
pub fn generate(
    baseline: &[Bar],
    scenario: &StressScenario,
    seed: u64,
) -> Result<Vec<Bar>, RiskbenchError> {
    if baseline.is_empty() {
        return Ok(Vec::new());
    }
    match scenario {
        StressScenario::Baseline => Ok(baseline.to_vec()),

        StressScenario::VolatilityShock { factor } => {
            let shocked: Vec<f64> = close_returns(baseline).iter().map(|r| r * factor).collect();
            Ok(rebuild(baseline, &shocked))
        }

        StressScenario::GapCrash { magnitude, index } => {
            let gap_index = match index {
                Some(i) => *i,
                None => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    rng.gen_range(1..baseline.len().max(2))
                }
            };
            if gap_index == 0 || gap_index >= baseline.len() {
                return Err(RiskbenchError::UnsupportedScenario {
                    scenario: scenario.name().to_string(),
                    reason: format!(
                        "gap index {} outside 1..{}",
                        gap_index,
                        baseline.len()
                    ),
                });
            }
            let scale = 1.0 - magnitude;
            let mut out = baseline.to_vec();
            for bar in &mut out[gap_index..] {
                bar.open *= scale;
                bar.high *= scale;
                bar.low *= scale;
                bar.close *= scale;
            }
            Ok(out)
        }

        StressScenario::LimitMove { max_return } => {
            let clamped: Vec<f64> = close_returns(baseline)
                .iter()
                .map(|r| r.clamp(-max_return, *max_return))
                .collect();
            Ok(rebuild(baseline, &clamped))
        }

        StressScenario::LiquidityDryUp { window } => {
            let mut out = baseline.to_vec();
            let window = (*window).min(out.len()).max(1);
            let start = out.len() - window;
            for (j, bar) in out[start..].iter_mut().enumerate() {
                let remaining = 1.0 - (j + 1) as f64 / window as f64;
                bar.volume = (bar.volume as f64 * remaining).round() as i64;
            }
            Ok(out)
        }

        StressScenario::CorrelationBreakdown { .. } => Err(RiskbenchError::UnsupportedScenario {
            scenario: scenario.name().to_string(),
            reason: "requires multiple series; use generate_multi".to_string(),
        }),
    }
}

/// Multi-series generation. Non-correlation variants apply independently to
/// each series with the same seed; `CorrelationBreakdown` blends each
/// series' returns toward the cross-series mean.
pub fn generate_multi(
    series: &[Vec<Bar>],
    scenario: &StressScenario,
    seed: u64,
) -> Result<Vec<Vec<Bar>>, RiskbenchError> {
    match scenario {
        StressScenario::CorrelationBreakdown { target } => {
            if series.len() < 2 {
                return Err(RiskbenchError::UnsupportedScenario {
                    scenario: scenario.name().to_string(),
                    reason: format!("need at least 2 series, got {}", series.len()),
                });
            }
            let len = series[0].len();
            if series.iter().any(|s| s.len() != len) {
                return Err(RiskbenchError::UnsupportedScenario {
                    scenario: scenario.name().to_string(),
                    reason: "series lengths differ".to_string(),
                });
            }
            if len == 0 {
                return Ok(series.to_vec());
            }
            let per_series: Vec<Vec<f64>> = series.iter().map(|s| close_returns(s)).collect();
            let steps = len - 1;
            let common: Vec<f64> = (0..steps)
                .map(|i| per_series.iter().map(|r| r[i]).sum::<f64>() / series.len() as f64)
                .collect();
            Ok(series
                .iter()
                .zip(&per_series)
                .map(|(bars, rets)| {
                    let blended: Vec<f64> = rets
                        .iter()
                        .zip(&common)
                        .map(|(own, c)| target * c + (1.0 - target) * own)
                        .collect();
                    rebuild(bars, &blended)
                })
                .collect())
        }
        _ => series.iter().map(|s| generate(s, scenario, seed)).collect(),
    }
}
