//! Report output port trait.

use crate::domain::engine::RunResult;
use crate::domain::error::RiskbenchError;
use crate::domain::stats::RiskReport;

/// Port for handing a finished run to a reporting collaborator.
pub trait ReportPort {
    fn write(
        &self,
        result: &RunResult,
        report: &RiskReport,
        output_path: &str,
    ) -> Result<(), RiskbenchError>;
}
