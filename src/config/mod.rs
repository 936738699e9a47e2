pub mod backtest_config;

pub use backtest_config::{BacktestConfiguration, ParamsError, RangeSpec, RsiParams, SweepConfig};
