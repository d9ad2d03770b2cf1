//! Stop-loss / take-profit level port.
//!
//! Levels are supplied once, at position-open time, from whatever bar
//! history exists at that moment; the engine never recomputes them later.

use crate::domain::bar::Bar;
use crate::domain::position::TradeSide;

/// Protective levels for a new position. Zero disables a level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLevels {
    pub fn none() -> Self {
        RiskLevels {
            stop_loss: 0.0,
            take_profit: 0.0,
        }
    }
}

pub trait RiskZonePort {
    /// `history` is every bar up to and including the entry bar; nothing
    /// later is ever passed in.
    fn levels(&self, history: &[Bar], entry_price: f64, side: TradeSide) -> RiskLevels;
}
