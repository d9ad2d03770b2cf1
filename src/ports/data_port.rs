//! Data access port trait.
//!
//! Bar and signal series arrive from an external acquisition collaborator;
//! the core never generates either.

use crate::domain::bar::Bar;
use crate::domain::error::RiskbenchError;
use crate::domain::signal::Signal;

pub trait DataPort {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, RiskbenchError>;

    fn fetch_signals(&self, instrument: &str) -> Result<Vec<Signal>, RiskbenchError>;
}
