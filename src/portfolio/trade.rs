use crate::portfolio::position::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfData,
}

//a closed round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub size: f64,
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,

    //commission on both fills
    pub commission: f64,

    //realized pnl net of commission
    pub pnl: f64,

    //pnl as a percentage of entry notional
    pub return_pct: f64,

    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    //bars between entry and exit fills
    pub fn duration_bars(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}
