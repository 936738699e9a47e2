pub mod backtest;
pub mod execution;

pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, Simulator};
pub use execution::{ExecutionEngine, Fill, Order, OrderError, OrderSide, SkippedEntry};
