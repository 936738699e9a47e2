pub mod rsi_threshold;

use crate::data::{Bar, PriceSeries};
use crate::engine::execution::{ExecutionEngine, OrderError, OrderSide};
use crate::portfolio::{Account, Direction};
use std::fmt::Display;

//strategy interface driven bar-by-bar by a simulator
pub trait Strategy: Send {
    //called once before the first bar with the full series
    fn on_start(&mut self, series: &PriceSeries);

    //called on each bar that did not close a position
    fn on_bar(&mut self, context: &mut StrategyContext<'_>);

    //returns the strategy name
    fn name(&self) -> &str;
}

//view of the current bar and account, plus order submission
pub struct StrategyContext<'a> {
    index: usize,
    bar: &'a Bar,
    account: &'a Account,
    execution: &'a mut ExecutionEngine,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        index: usize,
        bar: &'a Bar,
        account: &'a Account,
        execution: &'a mut ExecutionEngine,
    ) -> Self {
        StrategyContext {
            index,
            bar,
            account,
            execution,
        }
    }

    //position of the current bar in the series
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bar(&self) -> &Bar {
        self.bar
    }

    //returns the current equity, marked to this bar's close
    pub fn equity(&self) -> f64 {
        self.account.equity
    }

    pub fn is_flat(&self) -> bool {
        self.account.is_flat()
    }

    //submits an entry filled at this bar's close with protective levels attached
    pub fn enter(
        &mut self,
        direction: Direction,
        size: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<u64, OrderError> {
        if !self.account.is_flat() {
            return Err(OrderError::PositionOpen);
        }
        self.execution.submit_order(
            self.index,
            self.bar.timestamp,
            OrderSide::opening(direction),
            size,
            stop_loss,
            take_profit,
        )
    }

    //records an entry signal that was not acted on
    pub fn skip_entry(&mut self, reason: impl Display) {
        self.execution
            .skip_entry(self.index, self.bar.timestamp, reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::PositionState;
    use chrono::{TimeZone, Utc};

    #[test]
    fn orders_are_refused_while_in_a_position() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bar = Bar::new(ts, 100.0, 101.0, 99.0, 100.0, 1.0).unwrap();
        let mut account = Account::new(1_000.0, 0.0);
        let mut execution = ExecutionEngine::new();

        {
            let mut ctx = StrategyContext::new(0, &bar, &account, &mut execution);
            assert!(ctx.is_flat());
            ctx.enter(Direction::Long, 1.0, 95.0, 110.0).unwrap();
        }
        for (order, fill) in execution.fill_pending(0, &bar) {
            account.open_position(&order, &fill).unwrap();
        }

        assert_eq!(account.state(), PositionState::Long);
        let mut ctx = StrategyContext::new(1, &bar, &account, &mut execution);
        assert!(!ctx.is_flat());
        assert_eq!(
            ctx.enter(Direction::Short, 1.0, 105.0, 90.0),
            Err(OrderError::PositionOpen)
        );
        ctx.skip_entry("already long");
        assert_eq!(execution.skipped_entries().len(), 1);
    }
}
