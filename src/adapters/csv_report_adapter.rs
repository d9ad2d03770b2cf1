//! CSV report adapter: the reference interchange encoding of a finished
//! run. One row per trade with the full trade-record columns, plus the
//! equity curve and a one-row summary alongside.

use std::path::Path;

use crate::domain::engine::RunResult;
use crate::domain::error::RiskbenchError;
use crate::domain::stats::RiskReport;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

fn sibling(path: &Path, suffix: &str) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{stem}_{suffix}.csv"))
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &RunResult,
        report: &RiskReport,
        output_path: &str,
    ) -> Result<(), RiskbenchError> {
        let path = Path::new(output_path);

        let mut trades = csv::Writer::from_path(path).map_err(|e| RiskbenchError::Report {
            reason: format!("{}: {e}", path.display()),
        })?;
        for trade in &result.trade_log {
            trades.serialize(trade).map_err(|e| RiskbenchError::Report {
                reason: e.to_string(),
            })?;
        }
        trades.flush().map_err(RiskbenchError::Io)?;

        let equity_path = sibling(path, "equity");
        let mut equity =
            csv::Writer::from_path(&equity_path).map_err(|e| RiskbenchError::Report {
                reason: format!("{}: {e}", equity_path.display()),
            })?;
        for point in &result.equity_curve {
            equity.serialize(point).map_err(|e| RiskbenchError::Report {
                reason: e.to_string(),
            })?;
        }
        equity.flush().map_err(RiskbenchError::Io)?;

        let summary_path = sibling(path, "summary");
        let mut summary =
            csv::Writer::from_path(&summary_path).map_err(|e| RiskbenchError::Report {
                reason: format!("{}: {e}", summary_path.display()),
            })?;
        summary
            .write_record([
                "total_return",
                "annualized_return",
                "sharpe",
                "sortino",
                "calmar",
                "max_drawdown",
                "var_95",
                "cvar_95",
                "trades",
                "win_rate",
                "profit_factor",
            ])
            .map_err(|e| RiskbenchError::Report {
                reason: e.to_string(),
            })?;
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        summary
            .write_record([
                report.total_return.to_string(),
                report.annualized_return.to_string(),
                report.sharpe.to_string(),
                report.sortino.to_string(),
                report.calmar.to_string(),
                report.max_drawdown.to_string(),
                opt(report.var_95),
                opt(report.cvar_95),
                report.trade_stats.total.to_string(),
                report.trade_stats.win_rate.to_string(),
                report.trade_stats.profit_factor.to_string(),
            ])
            .map_err(|e| RiskbenchError::Report {
                reason: e.to_string(),
            })?;
        summary.flush().map_err(RiskbenchError::Io)?;

        Ok(())
    }
}
