//! Risk and performance statistics over a finished equity curve and trade
//! log. Everything here is a pure function; degenerate denominators yield
//! documented sentinels instead of panics or silent NaN.

use chrono::NaiveDateTime;

use super::error::RiskbenchError;
use super::ledger::EquityPoint;
use super::position::Trade;

/// Minimum sample count for the empirical VaR/CVaR quantiles.
pub const DEFAULT_MIN_SAMPLES: usize = 20;

/// Per-bar simple returns of the equity curve.
pub fn returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| {
            let prev = w[0].total_equity;
            let curr = w[1].total_equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect()
}

/// Empirical quantile with linear interpolation between order statistics.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Value-at-Risk at `confidence` (e.g. 0.95): the (1 - confidence) quantile
/// of the empirical return distribution. Usually negative. Fails rather
/// than extrapolating from fewer than `min_samples` returns.
pub fn value_at_risk(
    returns: &[f64],
    confidence: f64,
    min_samples: usize,
) -> Result<f64, RiskbenchError> {
    if returns.is_empty() || returns.len() < min_samples {
        return Err(RiskbenchError::InsufficientData {
            statistic: "value-at-risk",
            samples: returns.len(),
            minimum: min_samples.max(1),
        });
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(percentile(&sorted, 1.0 - confidence))
}

/// Conditional VaR (expected shortfall): mean of the returns at or below
/// the VaR threshold.
pub fn conditional_value_at_risk(
    returns: &[f64],
    confidence: f64,
    min_samples: usize,
) -> Result<f64, RiskbenchError> {
    let var = value_at_risk(returns, confidence, min_samples)?;
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
    if tail.is_empty() {
        return Ok(var);
    }
    Ok(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Sentinel policy for ratio statistics with a degenerate denominator:
/// +inf when the numerator is positive, -inf when negative, 0.0 when both
/// numerator and denominator vanish.
fn ratio_or_sentinel(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else if numerator > 0.0 {
        f64::INFINITY
    } else if numerator < 0.0 {
        f64::NEG_INFINITY
    } else {
        0.0
    }
}

/// Annualized Sharpe ratio. `bars_per_year` supplies the annualization
/// factor (252 for daily bars, 252*390 for minute bars, ...). Zero
/// volatility yields the sentinel, never NaN.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, bars_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let rf_per_bar = risk_free_rate / bars_per_year;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let excess = mean - rf_per_bar;
    ratio_or_sentinel(excess, variance.sqrt()) * annualizer(variance.sqrt(), bars_per_year)
}

// The sqrt(bars_per_year) factor only applies to the finite case; the
// sentinel infinities must pass through unscaled.
fn annualizer(stddev: f64, bars_per_year: f64) -> f64 {
    if stddev > 0.0 { bars_per_year.sqrt() } else { 1.0 }
}

/// Annualized Sortino ratio: excess return over downside deviation.
/// No downside observations yields the sentinel.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, bars_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let rf_per_bar = risk_free_rate / bars_per_year;
    let mean = returns.iter().sum::<f64>() / n;
    let excess = mean - rf_per_bar;
    let downside_sq: f64 = returns
        .iter()
        .filter(|r| **r < rf_per_bar)
        .map(|r| (r - rf_per_bar).powi(2))
        .sum();
    let downside_dev = (downside_sq / n).sqrt();
    ratio_or_sentinel(excess, downside_dev) * annualizer(downside_dev, bars_per_year)
}

/// Total simple return over the curve.
pub fn total_return(curve: &[EquityPoint]) -> f64 {
    match (curve.first(), curve.last()) {
        (Some(first), Some(last)) if first.total_equity > 0.0 => {
            (last.total_equity - first.total_equity) / first.total_equity
        }
        _ => 0.0,
    }
}

/// Geometric annualized return derived from the curve length.
pub fn annualized_return(curve: &[EquityPoint], bars_per_year: f64) -> f64 {
    let total = total_return(curve);
    let years = curve.len() as f64 / bars_per_year;
    if years > 0.0 && total > -1.0 {
        (1.0 + total).powf(1.0 / years) - 1.0
    } else {
        0.0
    }
}

/// Deepest peak-to-trough decline, as a positive fraction.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for point in curve {
        peak = peak.max(point.total_equity);
        if peak > 0.0 {
            let dd = (peak - point.total_equity) / peak;
            max_dd = max_dd.max(dd);
        }
    }
    max_dd
}

/// Calmar ratio: annualized return over max drawdown, with the zero-
/// drawdown sentinel.
pub fn calmar_ratio(curve: &[EquityPoint], bars_per_year: f64) -> f64 {
    ratio_or_sentinel(annualized_return(curve, bars_per_year), max_drawdown(curve))
}

/// One peak-to-recovery episode. `recovery` is `None` when the series ends
/// before equity regains the prior peak; `depth` is negative, matching the
/// drawdown-from-peak convention.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownPeriod {
    pub start: NaiveDateTime,
    pub trough: NaiveDateTime,
    pub recovery: Option<NaiveDateTime>,
    pub depth: f64,
}

/// Decompose the curve into drawdown periods. A period opens when equity
/// first falls below the running peak and closes at recovery to that peak
/// (or never, for the final unrecovered stretch).
pub fn drawdown_periods(curve: &[EquityPoint]) -> Vec<DrawdownPeriod> {
    let mut periods = Vec::new();
    let mut peak = match curve.first() {
        Some(p) => p.total_equity,
        None => return periods,
    };
    let mut open: Option<DrawdownPeriod> = None;
    let mut trough_equity = 0.0;

    for point in curve {
        if point.total_equity >= peak {
            if let Some(mut period) = open.take() {
                period.recovery = Some(point.timestamp);
                periods.push(period);
            }
            peak = point.total_equity;
            continue;
        }
        let depth = (point.total_equity - peak) / peak;
        match open.as_mut() {
            None => {
                open = Some(DrawdownPeriod {
                    start: point.timestamp,
                    trough: point.timestamp,
                    recovery: None,
                    depth,
                });
                trough_equity = point.total_equity;
            }
            Some(period) => {
                if point.total_equity < trough_equity {
                    trough_equity = point.total_equity;
                    period.trough = point.timestamp;
                    period.depth = depth;
                }
            }
        }
    }
    if let Some(period) = open {
        periods.push(period);
    }
    periods
}

/// Closed-trade statistics, computed from the trade log only (never from
/// the equity curve). Open trades are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

pub fn trade_stats(trades: &[Trade]) -> TradeStats {
    let mut won = 0usize;
    let mut lost = 0usize;
    let mut breakeven = 0usize;
    let mut total_wins = 0.0_f64;
    let mut total_losses = 0.0_f64;

    for trade in trades {
        let Some(pnl) = trade.realized_pnl else {
            continue;
        };
        if pnl > 0.0 {
            won += 1;
            total_wins += pnl;
        } else if pnl < 0.0 {
            lost += 1;
            total_losses += pnl.abs();
        } else {
            breakeven += 1;
        }
    }

    let total = won + lost + breakeven;
    let win_rate = if total > 0 {
        won as f64 / total as f64
    } else {
        0.0
    };

    TradeStats {
        total,
        won,
        lost,
        breakeven,
        win_rate,
        profit_factor: ratio_or_sentinel(total_wins, total_losses),
        avg_win: if won > 0 { total_wins / won as f64 } else { 0.0 },
        avg_loss: if lost > 0 {
            total_losses / lost as f64
        } else {
            0.0
        },
    }
}

/// Everything a report needs in one pass. VaR/CVaR are `None` when the
/// sample is too small; the other statistics always compute.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub var_95: Option<f64>,
    pub cvar_95: Option<f64>,
    pub trade_stats: TradeStats,
}

impl RiskReport {
    pub fn compute(
        curve: &[EquityPoint],
        trades: &[Trade],
        risk_free_rate: f64,
        bars_per_year: f64,
    ) -> Self {
        let rets = returns(curve);
        RiskReport {
            total_return: total_return(curve),
            annualized_return: annualized_return(curve, bars_per_year),
            sharpe: sharpe_ratio(&rets, risk_free_rate, bars_per_year),
            sortino: sortino_ratio(&rets, risk_free_rate, bars_per_year),
            calmar: calmar_ratio(curve, bars_per_year),
            max_drawdown: max_drawdown(curve),
            var_95: value_at_risk(&rets, 0.95, DEFAULT_MIN_SAMPLES).ok(),
            cvar_95: conditional_value_at_risk(&rets, 0.95, DEFAULT_MIN_SAMPLES).ok(),
            trade_stats: trade_stats(trades),
        }
    }
}
