use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//direction of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    //+1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

//exposure of the account at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl From<Direction> for PositionState {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => PositionState::Long,
            Direction::Short => PositionState::Short,
        }
    }
}

//an open position with its protective levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,

    //units held, always positive
    pub size: f64,

    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,

    //bar index and time of the entry fill
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,

    //commission paid on the entry fill
    pub entry_commission: f64,
}

impl Position {
    //calculates unrealized pnl at a given price
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.direction.sign() * self.size * (current_price - self.entry_price)
    }

    //returns the notional value of the position
    pub fn notional_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }
}
