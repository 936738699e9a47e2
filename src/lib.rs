//rsi threshold-crossing strategy backtester with grid-search optimization

pub mod config;
pub mod data;
pub mod engine;
pub mod indicator;
pub mod metrics;
pub mod optimize;
pub mod portfolio;
pub mod report;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BacktestConfiguration, RangeSpec, RsiParams, SweepConfig};
    pub use crate::data::{load_csv, Bar, PriceSeries};
    pub use crate::engine::{
        BacktestConfig, BacktestEngine, BacktestResult, ExecutionEngine, Fill, Order, OrderSide,
        Simulator, SkippedEntry,
    };
    pub use crate::indicator::{crossed_above, crossed_below, rsi};
    pub use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
    pub use crate::optimize::{GridPoint, Metric, Optimizer, ParamGrid, SweepError, SweepResult};
    pub use crate::portfolio::{
        Account, Direction, ExitReason, Position, PositionState, Trade,
    };
    pub use crate::strategy::{rsi_threshold::RsiThresholdStrategy, Strategy, StrategyContext};
}
