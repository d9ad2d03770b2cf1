//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::risk_zones::{AtrRiskZone, PercentRiskZone};
use crate::domain::config_validation::load_simulation_config;
use crate::domain::engine::{run_stress_suite, RunResult, SimulationEngine, TerminationReason};
use crate::domain::error::RiskbenchError;
use crate::domain::scenario::StressScenario;
use crate::domain::stats::RiskReport;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::risk_zone_port::RiskZonePort;

#[derive(Parser, Debug)]
#[command(name = "riskbench", about = "Strategy backtest and risk-monitoring bench")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay an instrument's bars against its signal series
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: String,
        /// Directory holding <instrument>_bars.csv and <instrument>_signals.csv;
        /// overrides [data] base_path
        #[arg(long)]
        data: Option<PathBuf>,
        /// Trade-log CSV destination (equity and summary files land beside it)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the stress-scenario suite against an instrument
    Stress {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        data: Option<PathBuf>,
        /// Seed for the scenarios' stochastic parameters
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            instrument,
            data,
            output,
        } => run_backtest(&config, &instrument, data.as_ref(), output.as_ref()),
        Command::Stress {
            config,
            instrument,
            data,
            seed,
        } => run_stress(&config, &instrument, data.as_ref(), seed),
        Command::Validate { config } => run_validate(&config),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, RiskbenchError> {
    FileConfigAdapter::from_file(path).map_err(|e| RiskbenchError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn resolve_data_path(
    adapter: &dyn ConfigPort,
    data_override: Option<&PathBuf>,
) -> Result<PathBuf, RiskbenchError> {
    match data_override {
        Some(path) => Ok(path.clone()),
        None => adapter
            .get_string("data", "base_path")
            .map(PathBuf::from)
            .ok_or_else(|| RiskbenchError::ConfigMissing {
                section: "data".to_string(),
                key: "base_path".to_string(),
            }),
    }
}

fn build_risk_zone(adapter: &dyn ConfigPort) -> Result<Box<dyn RiskZonePort>, RiskbenchError> {
    let method = adapter
        .get_string("riskzone", "method")
        .unwrap_or_else(|| "none".to_string());
    match method.as_str() {
        "none" => Ok(Box::new(PercentRiskZone::disabled())),
        "percent" => Ok(Box::new(PercentRiskZone {
            stop_loss_pct: adapter.get_double("riskzone", "stop_loss_pct", 0.0),
            take_profit_pct: adapter.get_double("riskzone", "take_profit_pct", 0.0),
        })),
        "atr" => {
            let defaults = AtrRiskZone::default();
            Ok(Box::new(AtrRiskZone {
                period: adapter.get_int("riskzone", "period", defaults.period as i64) as usize,
                stop_multiple: adapter.get_double(
                    "riskzone",
                    "stop_multiple",
                    defaults.stop_multiple,
                ),
                take_multiple: adapter.get_double(
                    "riskzone",
                    "take_multiple",
                    defaults.take_multiple,
                ),
            }))
        }
        other => Err(RiskbenchError::ConfigInvalid {
            section: "riskzone".to_string(),
            key: "method".to_string(),
            reason: format!("unknown method {other:?} (expected none, percent or atr)"),
        }),
    }
}

fn termination_label(termination: TerminationReason) -> &'static str {
    match termination {
        TerminationReason::EndOfSeries => "end of series",
        TerminationReason::DrawdownLimitBreached => "drawdown limit breached",
        TerminationReason::KillSwitchTripped => "kill-switch tripped",
    }
}

fn print_summary(result: &RunResult, report: &RiskReport) {
    let fmt_opt = |v: Option<f64>| match v {
        Some(x) => format!("{:.4}", x),
        None => "n/a (insufficient data)".to_string(),
    };
    println!("termination:       {}", termination_label(result.termination));
    println!("final equity:      {:.2}", result.final_equity());
    println!("total return:      {:.2}%", report.total_return * 100.0);
    println!("annualized return: {:.2}%", report.annualized_return * 100.0);
    println!("max drawdown:      {:.2}%", report.max_drawdown * 100.0);
    println!("sharpe:            {:.3}", report.sharpe);
    println!("sortino:           {:.3}", report.sortino);
    println!("calmar:            {:.3}", report.calmar);
    println!("VaR(95):           {}", fmt_opt(report.var_95));
    println!("CVaR(95):          {}", fmt_opt(report.cvar_95));
    println!(
        "trades:            {} ({} won / {} lost, win rate {:.1}%)",
        report.trade_stats.total,
        report.trade_stats.won,
        report.trade_stats.lost,
        report.trade_stats.win_rate * 100.0
    );
}

fn run_backtest(
    config_path: &PathBuf,
    instrument: &str,
    data_override: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    match backtest_inner(config_path, instrument, data_override, output_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn backtest_inner(
    config_path: &PathBuf,
    instrument: &str,
    data_override: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
) -> Result<(), RiskbenchError> {
    let adapter = load_config(config_path)?;
    let sim_config = load_simulation_config(&adapter)?;
    let risk_zone = build_risk_zone(&adapter)?;
    let data_path = resolve_data_path(&adapter, data_override)?;

    info!("loading {instrument} from {}", data_path.display());
    let data = CsvDataAdapter::new(data_path);
    let bars = data.fetch_bars(instrument)?;
    let signals = data.fetch_signals(instrument)?;
    info!("{} bars, {} signals", bars.len(), signals.len());

    let risk_free_rate = sim_config.risk_free_rate;
    let bars_per_year = sim_config.bars_per_year;
    let engine = SimulationEngine::new(sim_config);
    let result = engine.run(&bars, &signals, risk_zone.as_ref())?;
    let report = RiskReport::compute(
        &result.equity_curve,
        &result.trade_log,
        risk_free_rate,
        bars_per_year,
    );

    print_summary(&result, &report);

    if let Some(path) = output_path {
        let path_str = path.display().to_string();
        CsvReportAdapter.write(&result, &report, &path_str)?;
        info!("trade log written to {path_str}");
    }
    Ok(())
}

fn run_stress(
    config_path: &PathBuf,
    instrument: &str,
    data_override: Option<&PathBuf>,
    seed: u64,
) -> ExitCode {
    match stress_inner(config_path, instrument, data_override, seed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn stress_inner(
    config_path: &PathBuf,
    instrument: &str,
    data_override: Option<&PathBuf>,
    seed: u64,
) -> Result<(), RiskbenchError> {
    let adapter = load_config(config_path)?;
    let sim_config = load_simulation_config(&adapter)?;
    let risk_zone = build_risk_zone(&adapter)?;
    let data_path = resolve_data_path(&adapter, data_override)?;

    let data = CsvDataAdapter::new(data_path);
    let bars = data.fetch_bars(instrument)?;
    let signals = data.fetch_signals(instrument)?;

    let engine = SimulationEngine::new(sim_config);
    let scenarios = StressScenario::single_series_suite();
    info!("running {} scenarios with seed {seed}", scenarios.len());
    let suite = run_stress_suite(&engine, &bars, &signals, risk_zone.as_ref(), &scenarios, seed)?;

    println!(
        "{:<20} {:>10} {:>12} {:>10} {:>8}",
        "scenario", "return%", "max dd%", "sharpe", "trades"
    );
    for outcome in &suite.outcomes {
        println!(
            "{:<20} {:>10.2} {:>12.2} {:>10.3} {:>8}",
            outcome.scenario,
            outcome.report.total_return * 100.0,
            outcome.report.max_drawdown * 100.0,
            outcome.report.sharpe,
            outcome.report.trade_stats.total
        );
    }
    println!("most resilient:  {}", suite.most_resilient);
    println!("most vulnerable: {}", suite.most_vulnerable);
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    match load_simulation_config(&adapter).and_then(|_| build_risk_zone(&adapter).map(|_| ())) {
        Ok(()) => {
            println!("{} is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
