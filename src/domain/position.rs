//! Position state and the immutable closed-trade record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    KillSwitch,
    EndOfRun,
}

/// The ledger's open position. Quantity is signed: positive long, negative
/// short, zero flat. Stop/take-profit levels are fixed at entry by the
/// risk-zone collaborator; zero means disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub quantity: i64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn side(&self) -> TradeSide {
        if self.quantity < 0 {
            TradeSide::Short
        } else {
            TradeSide::Long
        }
    }

    /// Signed market value: what liquidating at `price` adds to cash on top
    /// of the escrowed entry notional.
    pub fn market_value(&self, price: f64) -> f64 {
        if self.is_long() {
            self.quantity as f64 * price
        } else {
            // Short: escrowed entry notional plus the unrealized move.
            let qty = self.quantity.unsigned_abs() as f64;
            qty * self.entry_price + self.unrealized_pnl(price)
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    pub fn stop_loss_hit(&self, price: f64) -> bool {
        if self.stop_loss == 0.0 {
            return false;
        }
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    pub fn take_profit_hit(&self, price: f64) -> bool {
        if self.take_profit == 0.0 {
            return false;
        }
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }
}

/// One round-trip. Exit fields are `None` while the trade is open; once the
/// ledger closes it the record is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub exit_time: Option<NaiveDateTime>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: i64,
    pub side: TradeSide,
    pub realized_pnl: Option<f64>,
    pub exit_reason: Option<ExitReason>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}
