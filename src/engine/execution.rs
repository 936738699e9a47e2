use crate::data::Bar;
use crate::portfolio::{Direction, ExitReason, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    //side of the entry that opens a position in the given direction
    pub fn opening(direction: Direction) -> Self {
        match direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            OrderSide::Buy => Direction::Long,
            OrderSide::Sell => Direction::Short,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("order size must be positive and finite, got {0}")]
    InvalidSize(f64),
    #[error("stop-loss {stop_loss} and take-profit {take_profit} do not bracket fill price {price}")]
    InvalidBracket {
        price: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    #[error("a position is already open")]
    PositionOpen,
}

//entry order filled at the close of the bar it was submitted on,
//carrying the stop-loss and take-profit of the resulting position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Order {
    //checks that the protective levels sit on either side of the fill price
    pub fn validate_bracket(&self, price: f64) -> Result<(), OrderError> {
        let ordered = match self.side {
            OrderSide::Buy => self.stop_loss < price && price < self.take_profit,
            OrderSide::Sell => self.take_profit < price && price < self.stop_loss,
        };
        if ordered {
            Ok(())
        } else {
            Err(OrderError::InvalidBracket {
                price,
                stop_loss: self.stop_loss,
                take_profit: self.take_profit,
            })
        }
    }
}

//represents a filled order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub order_id: u64,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub size: f64,
    pub fill_price: f64,
}

impl Fill {
    //returns the notional value of the fill
    pub fn notional_value(&self) -> f64 {
        self.fill_price * self.size
    }
}

//an entry signal that did not turn into a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

//level at which an open position leaves the market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub reason: ExitReason,
}

//simulates order execution
#[derive(Debug)]
pub struct ExecutionEngine {
    next_order_id: u64,
    next_fill_id: u64,
    pending_orders: Vec<Order>,
    skipped: Vec<SkippedEntry>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        ExecutionEngine {
            next_order_id: 1,
            next_fill_id: 1,
            pending_orders: Vec::new(),
            skipped: Vec::new(),
        }
    }

    //queues a bracketed entry order and returns its id
    pub fn submit_order(
        &mut self,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        side: OrderSide,
        size: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<u64, OrderError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(OrderError::InvalidSize(size));
        }

        let id = self.next_order_id;
        self.next_order_id += 1;
        self.pending_orders.push(Order {
            id,
            bar_index,
            timestamp,
            side,
            size,
            stop_loss,
            take_profit,
        });
        Ok(id)
    }

    //records an entry that was abandoned before or at order time
    pub fn skip_entry(&mut self, bar_index: usize, timestamp: DateTime<Utc>, reason: String) {
        self.skipped.push(SkippedEntry {
            bar_index,
            timestamp,
            reason,
        });
    }

    //fills pending orders at the bar close
    //orders whose bracket does not straddle the close are skipped
    pub fn fill_pending(&mut self, bar_index: usize, bar: &Bar) -> Vec<(Order, Fill)> {
        let mut fills = Vec::new();

        for order in std::mem::take(&mut self.pending_orders) {
            if let Err(err) = order.validate_bracket(bar.close) {
                self.skip_entry(bar_index, bar.timestamp, err.to_string());
                continue;
            }

            let fill = Fill {
                id: self.next_fill_id,
                order_id: order.id,
                bar_index,
                timestamp: bar.timestamp,
                side: order.side,
                size: order.size,
                fill_price: bar.close,
            };
            self.next_fill_id += 1;
            fills.push((order, fill));
        }

        fills
    }

    //checks the position's stop-loss and take-profit against a bar
    //a gap through a level fills at the open; if both levels are inside
    //the bar the stop is assumed to have been hit first
    pub fn check_exit(&self, position: &Position, bar: &Bar) -> Option<ExitFill> {
        match position.direction {
            Direction::Long => {
                if bar.low <= position.stop_loss {
                    Some(ExitFill {
                        price: bar.open.min(position.stop_loss),
                        reason: ExitReason::StopLoss,
                    })
                } else if bar.high >= position.take_profit {
                    Some(ExitFill {
                        price: bar.open.max(position.take_profit),
                        reason: ExitReason::TakeProfit,
                    })
                } else {
                    None
                }
            }
            Direction::Short => {
                if bar.high >= position.stop_loss {
                    Some(ExitFill {
                        price: bar.open.max(position.stop_loss),
                        reason: ExitReason::StopLoss,
                    })
                } else if bar.low <= position.take_profit {
                    Some(ExitFill {
                        price: bar.open.min(position.take_profit),
                        reason: ExitReason::TakeProfit,
                    })
                } else {
                    None
                }
            }
        }
    }

    pub fn skipped_entries(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn into_skipped_entries(self) -> Vec<SkippedEntry> {
        self.skipped
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts(), open, high, low, close, 1.0).unwrap()
    }

    fn long_position() -> Position {
        Position {
            direction: Direction::Long,
            size: 1.0,
            entry_price: 100.0,
            stop_loss: 95.0,
            take_profit: 110.0,
            entry_bar: 0,
            entry_time: ts(),
            entry_commission: 0.0,
        }
    }

    fn short_position() -> Position {
        Position {
            direction: Direction::Short,
            stop_loss: 105.0,
            take_profit: 90.0,
            ..long_position()
        }
    }

    #[test]
    fn rejects_non_positive_size() {
        let mut engine = ExecutionEngine::new();
        let err = engine
            .submit_order(0, ts(), OrderSide::Buy, 0.0, 95.0, 110.0)
            .unwrap_err();
        assert_eq!(err, OrderError::InvalidSize(0.0));
        let err = engine
            .submit_order(0, ts(), OrderSide::Buy, f64::INFINITY, 95.0, 110.0)
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidSize(_)));
        assert!(engine.fill_pending(0, &bar(99.0, 101.0, 98.0, 100.0)).is_empty());
    }

    #[test]
    fn fills_at_close() {
        let mut engine = ExecutionEngine::new();
        engine
            .submit_order(4, ts(), OrderSide::Buy, 2.0, 95.0, 110.0)
            .unwrap();
        let fills = engine.fill_pending(4, &bar(99.0, 101.0, 98.0, 100.0));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].1.fill_price, 100.0);
        assert_eq!(fills[0].1.notional_value(), 200.0);
        assert!(engine.fill_pending(5, &bar(99.0, 101.0, 98.0, 100.0)).is_empty());
    }

    #[test]
    fn bad_bracket_is_skipped_not_filled() {
        let mut engine = ExecutionEngine::new();
        engine
            .submit_order(1, ts(), OrderSide::Sell, 1.0, 95.0, 90.0)
            .unwrap();
        let fills = engine.fill_pending(1, &bar(99.0, 101.0, 98.0, 100.0));
        assert!(fills.is_empty());
        assert_eq!(engine.skipped_entries().len(), 1);
    }

    #[test]
    fn long_stop_and_target() {
        let engine = ExecutionEngine::new();
        let pos = long_position();
        assert_eq!(engine.check_exit(&pos, &bar(100.0, 105.0, 97.0, 101.0)), None);

        let stop = engine.check_exit(&pos, &bar(97.0, 98.0, 94.0, 96.0)).unwrap();
        assert_eq!(stop.reason, ExitReason::StopLoss);
        assert_eq!(stop.price, 95.0);

        let target = engine.check_exit(&pos, &bar(105.0, 111.0, 104.0, 108.0)).unwrap();
        assert_eq!(target.reason, ExitReason::TakeProfit);
        assert_eq!(target.price, 110.0);
    }

    #[test]
    fn gaps_fill_at_open() {
        let engine = ExecutionEngine::new();
        let pos = long_position();
        let stop = engine.check_exit(&pos, &bar(92.0, 93.0, 91.0, 92.0)).unwrap();
        assert_eq!(stop.price, 92.0);
        let target = engine.check_exit(&pos, &bar(115.0, 116.0, 114.0, 115.0)).unwrap();
        assert_eq!(target.price, 115.0);
    }

    #[test]
    fn stop_wins_when_both_levels_touched() {
        let engine = ExecutionEngine::new();
        let exit = engine
            .check_exit(&long_position(), &bar(100.0, 112.0, 94.0, 100.0))
            .unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);

        let exit = engine
            .check_exit(&short_position(), &bar(100.0, 106.0, 89.0, 100.0))
            .unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.price, 105.0);
    }

    #[test]
    fn short_target() {
        let engine = ExecutionEngine::new();
        let exit = engine
            .check_exit(&short_position(), &bar(95.0, 96.0, 89.0, 91.0))
            .unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert_eq!(exit.price, 90.0);
    }
}
