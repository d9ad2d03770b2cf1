//! Bar-by-bar simulation engine.
//!
//! Replays a price series against an externally produced signal series,
//! driving the portfolio ledger forward one bar at a time. The central
//! correctness rule is no look-ahead: a decision at bar T uses only
//! information at or before T's close, and intrabar stop/target fills never
//! execute at a price more favorable than the triggering level.

use log::warn;

use super::bar::{validate_series, Bar};
use super::error::RiskbenchError;
use super::killswitch::{spread_ratio, KillSwitchMonitor, KillSwitchThresholds};
use super::ledger::PortfolioLedger;
use super::position::{ExitReason, Trade};
use super::scenario::{self, StressScenario};
use super::signal::{validate_alignment, Signal, SignalDirection};
use super::stats::RiskReport;
use crate::ports::risk_zone_port::RiskZonePort;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Fraction of cash committed per entry, (0, 1].
    pub position_fraction: f64,
    /// Force-close and terminate when drawdown-from-peak breaches this
    /// positive fraction.
    pub max_drawdown_limit: f64,
    /// Per-side commission as a fraction of traded notional.
    pub commission_rate: f64,
    /// Adverse slippage fraction on close-price executions. Stop/target
    /// fills use the policy price as-is.
    pub slippage_rate: f64,
    pub allow_shorting: bool,
    pub risk_free_rate: f64,
    /// Annualization factor for the bar interval (252 for daily bars).
    pub bars_per_year: f64,
    /// When set, a kill-switch monitor runs inside the simulation and is
    /// checked before any other exit each bar.
    pub kill_switch: Option<KillSwitchThresholds>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 100_000.0,
            position_fraction: 0.10,
            max_drawdown_limit: 0.20,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            allow_shorting: false,
            risk_free_rate: 0.0,
            bars_per_year: 252.0,
            kill_switch: None,
        }
    }
}

/// Whole shares only; truncates toward zero.
pub fn size_position(cash: f64, price: f64, fraction: f64) -> i64 {
    if price <= 0.0 {
        return 0;
    }
    ((cash * fraction) / price).floor() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    EndOfSeries,
    DrawdownLimitBreached,
    KillSwitchTripped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub trade_log: Vec<Trade>,
    pub equity_curve: Vec<super::ledger::EquityPoint>,
    pub termination: TerminationReason,
}

impl RunResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.total_equity)
            .unwrap_or(0.0)
    }
}

pub struct SimulationEngine {
    config: SimulationConfig,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        SimulationEngine { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run a full simulation. Fails before touching the ledger when the
    /// series are malformed or misaligned, or capital is non-positive.
    pub fn run(
        &self,
        bars: &[Bar],
        signals: &[Signal],
        risk_zone: &dyn RiskZonePort,
    ) -> Result<RunResult, RiskbenchError> {
        if self.config.initial_capital <= 0.0 {
            return Err(RiskbenchError::NonPositiveCapital {
                capital: self.config.initial_capital,
            });
        }
        validate_series(bars)?;
        validate_alignment(bars, signals)?;

        let cfg = &self.config;
        let mut ledger = PortfolioLedger::new(cfg.initial_capital);
        let mut monitor = cfg.kill_switch.clone().map(KillSwitchMonitor::new);
        let mut termination = TerminationReason::EndOfSeries;

        for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
            // Kill-switch first: it outranks stop-loss, take-profit and
            // signal exits. Inputs are what the caller knew at the previous
            // close plus this bar's own window.
            if let Some(monitor) = monitor.as_mut() {
                let drawdown = ledger
                    .equity_curve
                    .last()
                    .map(|p| p.drawdown_from_peak)
                    .unwrap_or(0.0);
                let window_start = i + 1 - cfg.kill_switch.as_ref().unwrap().volume_lookback.min(i + 1);
                let volumes: Vec<i64> =
                    bars[window_start..=i].iter().map(|b| b.volume).collect();
                let decision = monitor.evaluate(drawdown, spread_ratio(&bars[..=i]), &volumes);
                if decision.tripped {
                    warn!(
                        "kill-switch tripped at {}: {:?}",
                        bar.timestamp, decision.reasons
                    );
                    if !ledger.is_flat() {
                        let price = self.exit_price_at_close(&ledger, bar);
                        self.close(&mut ledger, price, bar, ExitReason::KillSwitch);
                    }
                    ledger.mark(bar.timestamp, bar.close);
                    termination = TerminationReason::KillSwitchTripped;
                    break;
                }
            }

            // Protective exits, stop-loss before take-profit when both are
            // breached within the same bar.
            if let Some(fill) = self.protective_fill(&ledger, bar) {
                let (price, reason) = fill;
                self.close(&mut ledger, price, bar, reason);
            }

            // Signal action at the close.
            match signal.direction {
                SignalDirection::LongEntry if ledger.is_flat() => {
                    self.enter(&mut ledger, bar, bars, i, risk_zone, false);
                }
                SignalDirection::ShortEntry if ledger.is_flat() => {
                    if cfg.allow_shorting {
                        self.enter(&mut ledger, bar, bars, i, risk_zone, true);
                    }
                }
                SignalDirection::LongExit => {
                    if ledger.position().is_some_and(|p| p.is_long()) {
                        let price = self.exit_price_at_close(&ledger, bar);
                        self.close(&mut ledger, price, bar, ExitReason::Signal);
                    }
                }
                SignalDirection::ShortExit => {
                    if ledger.position().is_some_and(|p| p.is_short()) {
                        let price = self.exit_price_at_close(&ledger, bar);
                        self.close(&mut ledger, price, bar, ExitReason::Signal);
                    }
                }
                _ => {}
            }

            let point = ledger.mark(bar.timestamp, bar.close);

            // Drawdown enforcement runs after the equity update; a breach
            // force-closes at the current close and ends the run.
            if point.drawdown_from_peak <= -cfg.max_drawdown_limit {
                if !ledger.is_flat() {
                    let price = self.exit_price_at_close(&ledger, bar);
                    self.close(&mut ledger, price, bar, ExitReason::KillSwitch);
                    // Re-mark so the final point reflects the forced exit.
                    ledger.equity_curve.pop();
                    ledger.mark(bar.timestamp, bar.close);
                }
                termination = TerminationReason::DrawdownLimitBreached;
                break;
            }
        }

        if termination == TerminationReason::EndOfSeries {
            if let Some(last) = bars.last() {
                if !ledger.is_flat() {
                    let price = self.exit_price_at_close(&ledger, last);
                    self.close(&mut ledger, price, last, ExitReason::EndOfRun);
                    ledger.equity_curve.pop();
                    ledger.mark(last.timestamp, last.close);
                }
            }
        }

        Ok(RunResult {
            trade_log: ledger.trades.clone(),
            equity_curve: ledger.equity_curve.clone(),
            termination,
        })
    }

    fn enter(
        &self,
        ledger: &mut PortfolioLedger,
        bar: &Bar,
        bars: &[Bar],
        index: usize,
        risk_zone: &dyn RiskZonePort,
        short: bool,
    ) {
        let cfg = &self.config;
        let price = if short {
            bar.close * (1.0 - cfg.slippage_rate)
        } else {
            bar.close * (1.0 + cfg.slippage_rate)
        };
        let quantity = size_position(ledger.cash, price, cfg.position_fraction);
        if quantity == 0 {
            warn!("entry at {} skipped: cash too small", bar.timestamp);
            return;
        }
        let notional = quantity as f64 * price;
        let commission = notional * cfg.commission_rate;
        if notional + commission > ledger.cash {
            warn!("entry at {} skipped: insufficient capital", bar.timestamp);
            return;
        }

        let side = if short {
            super::position::TradeSide::Short
        } else {
            super::position::TradeSide::Long
        };
        // History stops at the entry bar; the risk-zone collaborator never
        // sees the future.
        let levels = risk_zone.levels(&bars[..=index], price, side);
        let signed = if short { -quantity } else { quantity };
        ledger.open_position(
            signed,
            price,
            bar.timestamp,
            levels.stop_loss,
            levels.take_profit,
            commission,
        );
    }

    /// Intrabar protective-exit fill, if any. Stop-loss outranks
    /// take-profit. A bar that gaps past the stop fills at its open; the
    /// stop price itself was never available.
    fn protective_fill(&self, ledger: &PortfolioLedger, bar: &Bar) -> Option<(f64, ExitReason)> {
        let pos = ledger.position()?;
        if pos.is_long() {
            if pos.stop_loss > 0.0 && bar.low <= pos.stop_loss {
                return Some((pos.stop_loss.min(bar.open), ExitReason::StopLoss));
            }
            if pos.take_profit > 0.0 && bar.high >= pos.take_profit {
                return Some((pos.take_profit, ExitReason::TakeProfit));
            }
        } else {
            if pos.stop_loss > 0.0 && bar.high >= pos.stop_loss {
                return Some((pos.stop_loss.max(bar.open), ExitReason::StopLoss));
            }
            if pos.take_profit > 0.0 && bar.low <= pos.take_profit {
                return Some((pos.take_profit, ExitReason::TakeProfit));
            }
        }
        None
    }

    fn exit_price_at_close(&self, ledger: &PortfolioLedger, bar: &Bar) -> f64 {
        let long = ledger.position().is_some_and(|p| p.is_long());
        if long {
            bar.close * (1.0 - self.config.slippage_rate)
        } else {
            bar.close * (1.0 + self.config.slippage_rate)
        }
    }

    fn close(&self, ledger: &mut PortfolioLedger, price: f64, bar: &Bar, reason: ExitReason) {
        let qty = ledger
            .position()
            .map(|p| p.quantity.unsigned_abs())
            .unwrap_or(0);
        let commission = qty as f64 * price * self.config.commission_rate;
        ledger.close_position(price, bar.timestamp, reason, commission);
    }
}

/// One scenario's outcome inside a stress suite.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub result: RunResult,
    pub report: RiskReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressSuiteResult {
    pub outcomes: Vec<ScenarioOutcome>,
    pub most_resilient: String,
    pub most_vulnerable: String,
}

/// Run the same signal series against each scenario variant. Each run owns
/// its own ledger; scenarios rank by Sharpe ratio. Signal regeneration for
/// the stressed series is the caller's concern; timestamps are preserved
/// by every generator, so the baseline signals stay aligned.
pub fn run_stress_suite(
    engine: &SimulationEngine,
    baseline: &[Bar],
    signals: &[Signal],
    risk_zone: &dyn RiskZonePort,
    scenarios: &[StressScenario],
    seed: u64,
) -> Result<StressSuiteResult, RiskbenchError> {
    let mut outcomes = Vec::with_capacity(scenarios.len());
    for stress in scenarios {
        let stressed = scenario::generate(baseline, stress, seed)?;
        let result = engine.run(&stressed, signals, risk_zone)?;
        let report = RiskReport::compute(
            &result.equity_curve,
            &result.trade_log,
            engine.config.risk_free_rate,
            engine.config.bars_per_year,
        );
        outcomes.push(ScenarioOutcome {
            scenario: stress.name().to_string(),
            result,
            report,
        });
    }

    let by_sharpe = |o: &ScenarioOutcome| o.report.sharpe;
    let most_resilient = outcomes
        .iter()
        .max_by(|a, b| by_sharpe(a).total_cmp(&by_sharpe(b)))
        .map(|o| o.scenario.clone())
        .unwrap_or_default();
    let most_vulnerable = outcomes
        .iter()
        .min_by(|a, b| by_sharpe(a).total_cmp(&by_sharpe(b)))
        .map(|o| o.scenario.clone())
        .unwrap_or_default();

    Ok(StressSuiteResult {
        outcomes,
        most_resilient,
        most_vulnerable,
    })
}
