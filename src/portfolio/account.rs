use crate::engine::execution::{Fill, Order, OrderError};
use crate::portfolio::position::{Position, PositionState};
use crate::portfolio::trade::{ExitReason, Trade};
use chrono::{DateTime, Utc};

//single-position trading account
#[derive(Debug, Clone)]
pub struct Account {
    //initial account balance
    pub initial_balance: f64,

    //current cash (includes realized pnl, subtracts commissions)
    pub cash: f64,

    //current total equity (cash + unrealized pnl)
    pub equity: f64,

    //open position, none when flat
    position: Option<Position>,

    //closed trades in exit order
    pub trade_log: Vec<Trade>,

    //commission as a fraction of notional, charged per fill
    pub commission_rate: f64,
}

impl Account {
    //creates a new account with initial balance
    pub fn new(initial_balance: f64, commission_rate: f64) -> Self {
        Account {
            initial_balance,
            cash: initial_balance,
            equity: initial_balance,
            position: None,
            trade_log: Vec::new(),
            commission_rate,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn state(&self) -> PositionState {
        self.position
            .as_ref()
            .map(|p| PositionState::from(p.direction))
            .unwrap_or(PositionState::Flat)
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    //commission charged on a fill of the given notional
    pub fn commission(&self, notional: f64) -> f64 {
        notional.abs() * self.commission_rate
    }

    //opens a position from an entry fill
    pub fn open_position(&mut self, order: &Order, fill: &Fill) -> Result<(), OrderError> {
        if self.position.is_some() {
            return Err(OrderError::PositionOpen);
        }

        let fees = self.commission(fill.notional_value());
        self.cash -= fees;

        self.position = Some(Position {
            direction: fill.side.direction(),
            size: fill.size,
            entry_price: fill.fill_price,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            entry_bar: fill.bar_index,
            entry_time: fill.timestamp,
            entry_commission: fees,
        });
        self.equity = self.cash;
        Ok(())
    }

    //closes the open position and returns the completed trade
    pub fn close_position(
        &mut self,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
    ) -> Option<Trade> {
        let position = self.position.take()?;

        let gross = position.unrealized_pnl(price);
        let exit_fees = self.commission(position.notional_value(price));
        self.cash += gross - exit_fees;
        self.equity = self.cash;

        let commission = position.entry_commission + exit_fees;
        let pnl = gross - commission;
        let entry_notional = position.notional_value(position.entry_price);
        let return_pct = if entry_notional > 0.0 {
            pnl / entry_notional * 100.0
        } else {
            0.0
        };

        let trade = Trade {
            direction: position.direction,
            size: position.size,
            entry_bar: position.entry_bar,
            exit_bar: bar_index,
            entry_time: position.entry_time,
            exit_time: timestamp,
            entry_price: position.entry_price,
            exit_price: price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            commission,
            pnl,
            return_pct,
            exit_reason: reason,
        };
        self.trade_log.push(trade.clone());
        Some(trade)
    }

    //marks equity to the given price
    pub fn update_equity(&mut self, price: f64) {
        let unrealized = self
            .position
            .as_ref()
            .map(|p| p.unrealized_pnl(price))
            .unwrap_or(0.0);
        self.equity = self.cash + unrealized;
    }
}
