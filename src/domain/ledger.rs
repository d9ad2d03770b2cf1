//! Portfolio ledger: cash, the open position, the trade log, and the equity
//! curve. Mutated only by the simulation engine; once a run finishes the
//! engine hands it out read-only inside the run result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::{ExitReason, Position, Trade, TradeSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub position_value: f64,
    pub total_equity: f64,
    /// (equity - running peak) / running peak; always <= 0.
    pub drawdown_from_peak: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLedger {
    pub cash: f64,
    pub initial_capital: f64,
    position: Option<Position>,
    open_trade: Option<Trade>,
    entry_commission: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    peak_equity: f64,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioLedger {
            cash: initial_capital,
            initial_capital,
            position: None,
            open_trade: None,
            entry_commission: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity: initial_capital,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Open a position. Longs pay the notional out of cash; shorts escrow
    /// the entry notional so the cash+position==equity invariant holds on
    /// both sides. Commission comes out of cash immediately but is charged
    /// to the trade's realized P&L at close.
    pub fn open_position(
        &mut self,
        quantity: i64,
        price: f64,
        time: NaiveDateTime,
        stop_loss: f64,
        take_profit: f64,
        commission: f64,
    ) {
        debug_assert!(self.position.is_none(), "ledger already holds a position");
        debug_assert!(quantity != 0);

        let notional = quantity.unsigned_abs() as f64 * price;
        self.cash -= notional + commission;
        self.entry_commission = commission;

        self.position = Some(Position {
            quantity,
            entry_price: price,
            entry_time: time,
            stop_loss,
            take_profit,
        });
        self.open_trade = Some(Trade {
            entry_time: time,
            exit_time: None,
            entry_price: price,
            exit_price: None,
            quantity,
            side: if quantity < 0 {
                TradeSide::Short
            } else {
                TradeSide::Long
            },
            realized_pnl: None,
            exit_reason: None,
        });
    }

    /// Close the open position at `price`, appending the finished trade to
    /// the log. Realized P&L nets out both the entry and exit commissions.
    pub fn close_position(
        &mut self,
        price: f64,
        time: NaiveDateTime,
        reason: ExitReason,
        commission: f64,
    ) -> Option<Trade> {
        let position = self.position.take()?;
        let mut trade = self.open_trade.take()?;

        let qty_abs = position.quantity.unsigned_abs() as f64;
        let exit_value = qty_abs * price;
        let price_pnl = position.quantity as f64 * (price - position.entry_price);
        let pnl = price_pnl - self.entry_commission - commission;

        if position.is_long() {
            self.cash += exit_value - commission;
        } else {
            // Return the escrowed entry notional and settle the move.
            let entry_notional = qty_abs * position.entry_price;
            self.cash += entry_notional + (entry_notional - exit_value) - commission;
        }
        self.entry_commission = 0.0;

        trade.exit_time = Some(time);
        trade.exit_price = Some(price);
        trade.realized_pnl = Some(pnl);
        trade.exit_reason = Some(reason);
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Mark the portfolio at a bar close and append an equity point.
    pub fn mark(&mut self, timestamp: NaiveDateTime, price: f64) -> EquityPoint {
        let position_value = self
            .position
            .as_ref()
            .map(|p| p.market_value(price))
            .unwrap_or(0.0);
        let total_equity = self.cash + position_value;

        if total_equity > self.peak_equity {
            self.peak_equity = total_equity;
        }
        let drawdown_from_peak = if self.peak_equity > 0.0 {
            (total_equity - self.peak_equity) / self.peak_equity
        } else {
            0.0
        };

        let point = EquityPoint {
            timestamp,
            cash: self.cash,
            position_value,
            total_equity,
            drawdown_from_peak,
        };
        self.equity_curve.push(point.clone());
        point
    }

    /// Recomputed from closed trades only, never estimated.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().filter_map(|t| t.realized_pnl).sum()
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_ledger_is_flat() {
        let ledger = PortfolioLedger::new(100_000.0);
        assert!(ledger.is_flat());
        assert!((ledger.cash - 100_000.0).abs() < f64::EPSILON);
        assert!(ledger.trades.is_empty());
        assert!(ledger.equity_curve.is_empty());
    }

    #[test]
    fn long_round_trip_restores_cash_at_flat_price() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 0.0, 0.0, 0.0);
        ledger.close_position(50.0, ts(2), ExitReason::Signal, 0.0);
        assert!((ledger.cash - 100_000.0).abs() < f64::EPSILON);
        assert!((ledger.realized_pnl() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_round_trip_restores_cash_at_flat_price() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(-100, 50.0, ts(1), 0.0, 0.0, 0.0);
        ledger.close_position(50.0, ts(2), ExitReason::Signal, 0.0);
        assert!((ledger.cash - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn long_profit_flows_to_cash_and_pnl() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 0.0, 0.0, 0.0);
        let trade = ledger
            .close_position(60.0, ts(2), ExitReason::Signal, 0.0)
            .unwrap();
        assert!((trade.realized_pnl.unwrap() - 1000.0).abs() < f64::EPSILON);
        assert!((ledger.cash - 101_000.0).abs() < f64::EPSILON);
        assert_eq!(trade.exit_reason, Some(ExitReason::Signal));
    }

    #[test]
    fn short_profit_on_price_drop() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(-100, 50.0, ts(1), 0.0, 0.0, 0.0);
        let trade = ledger
            .close_position(40.0, ts(2), ExitReason::Signal, 0.0)
            .unwrap();
        assert!((trade.realized_pnl.unwrap() - 1000.0).abs() < f64::EPSILON);
        assert!((ledger.cash - 101_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn commissions_charged_to_realized_pnl() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 0.0, 0.0, 10.0);
        let trade = ledger
            .close_position(60.0, ts(2), ExitReason::Signal, 10.0)
            .unwrap();
        assert!((trade.realized_pnl.unwrap() - 980.0).abs() < f64::EPSILON);
        assert!((ledger.cash - 100_980.0).abs() < f64::EPSILON);
    }

    #[test]
    fn equity_invariant_holds_while_long() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 0.0, 0.0, 0.0);
        for (day, price) in [(1u32, 50.0), (2, 55.0), (3, 45.0)] {
            let point = ledger.mark(ts(day), price);
            assert!(
                (point.cash + point.position_value - point.total_equity).abs() < 1e-9,
                "cash + position != equity at {price}"
            );
        }
    }

    #[test]
    fn equity_invariant_holds_while_short() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(-100, 50.0, ts(1), 0.0, 0.0, 0.0);
        let up = ledger.mark(ts(1), 60.0);
        assert!((up.cash + up.position_value - up.total_equity).abs() < 1e-9);
        // Short loses as price rises.
        assert!((up.total_equity - 99_000.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_never_positive_and_tracks_peak() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(1000, 100.0, ts(1), 0.0, 0.0, 0.0);
        let prices = [100.0, 110.0, 90.0, 95.0, 120.0, 80.0];
        let mut peak = 100_000.0_f64;
        for (i, price) in prices.iter().enumerate() {
            let point = ledger.mark(ts(i as u32 + 1), *price);
            peak = peak.max(point.total_equity);
            assert!(point.drawdown_from_peak <= 0.0);
            let expected = (point.total_equity - peak) / peak;
            assert!((point.drawdown_from_peak - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn drawdown_measured_from_initial_capital() {
        // An immediate loss counts as drawdown even before any new peak.
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(1000, 100.0, ts(1), 0.0, 0.0, 0.0);
        let point = ledger.mark(ts(1), 90.0);
        assert!((point.drawdown_from_peak - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn realized_pnl_sums_closed_trades_only() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 0.0, 0.0, 0.0);
        ledger.close_position(55.0, ts(2), ExitReason::Signal, 0.0);
        ledger.open_position(100, 55.0, ts(3), 0.0, 0.0, 0.0);
        ledger.close_position(50.0, ts(4), ExitReason::StopLoss, 0.0);
        // Open a third and leave it open; it must not count.
        ledger.open_position(100, 50.0, ts(5), 0.0, 0.0, 0.0);
        assert!((ledger.realized_pnl() - 0.0).abs() < f64::EPSILON);
        assert_eq!(ledger.trades.len(), 2);
    }

    #[test]
    fn close_when_flat_returns_none() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        assert!(ledger
            .close_position(50.0, ts(1), ExitReason::Signal, 0.0)
            .is_none());
    }

    #[test]
    fn closed_trade_records_exit_fields() {
        let mut ledger = PortfolioLedger::new(100_000.0);
        ledger.open_position(100, 50.0, ts(1), 45.0, 60.0, 0.0);
        let trade = ledger
            .close_position(45.0, ts(3), ExitReason::StopLoss, 0.0)
            .unwrap();
        assert_eq!(trade.exit_time, Some(ts(3)));
        assert_eq!(trade.exit_price, Some(45.0));
        assert_eq!(trade.exit_reason, Some(ExitReason::StopLoss));
        assert_eq!(trade.side, TradeSide::Long);
    }
}
