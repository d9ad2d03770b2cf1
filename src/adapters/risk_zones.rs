//! Stop-loss / take-profit level providers.
//!
//! Two implementations of the risk-zone port: fixed percentage offsets from
//! the entry price, and ATR-multiple offsets computed from the bar history
//! available at entry.

use crate::domain::bar::Bar;
use crate::domain::position::TradeSide;
use crate::ports::risk_zone_port::{RiskLevels, RiskZonePort};

/// Fixed percent offsets from entry. Zero disables a level.
pub struct PercentRiskZone {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl PercentRiskZone {
    pub fn disabled() -> Self {
        PercentRiskZone {
            stop_loss_pct: 0.0,
            take_profit_pct: 0.0,
        }
    }
}

impl RiskZonePort for PercentRiskZone {
    fn levels(&self, _history: &[Bar], entry_price: f64, side: TradeSide) -> RiskLevels {
        let (sl_sign, tp_sign) = match side {
            TradeSide::Long => (-1.0, 1.0),
            TradeSide::Short => (1.0, -1.0),
        };
        let stop_loss = if self.stop_loss_pct > 0.0 {
            entry_price * (1.0 + sl_sign * self.stop_loss_pct / 100.0)
        } else {
            0.0
        };
        let take_profit = if self.take_profit_pct > 0.0 {
            entry_price * (1.0 + tp_sign * self.take_profit_pct / 100.0)
        } else {
            0.0
        };
        RiskLevels {
            stop_loss,
            take_profit,
        }
    }
}

/// ATR-multiple offsets: stop at `stop_multiple` ATRs against the position,
/// target at `take_multiple` ATRs in favor. Falls back to disabled levels
/// until enough history exists for one ATR period.
pub struct AtrRiskZone {
    pub period: usize,
    pub stop_multiple: f64,
    pub take_multiple: f64,
}

impl Default for AtrRiskZone {
    fn default() -> Self {
        AtrRiskZone {
            period: 14,
            stop_multiple: 2.0,
            take_multiple: 1.5,
        }
    }
}

fn average_true_range(history: &[Bar], period: usize) -> Option<f64> {
    if history.len() < period + 1 {
        return None;
    }
    let tail = &history[history.len() - period - 1..];
    let sum: f64 = tail
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .sum();
    Some(sum / period as f64)
}

impl RiskZonePort for AtrRiskZone {
    fn levels(&self, history: &[Bar], entry_price: f64, side: TradeSide) -> RiskLevels {
        let Some(atr) = average_true_range(history, self.period) else {
            return RiskLevels::none();
        };
        let direction = match side {
            TradeSide::Long => 1.0,
            TradeSide::Short => -1.0,
        };
        RiskLevels {
            stop_loss: entry_price - direction * atr * self.stop_multiple,
            take_profit: entry_price + direction * atr * self.take_multiple,
        }
    }
}
