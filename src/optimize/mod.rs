pub mod grid;
pub mod metric;
pub mod sweep;

pub use grid::ParamGrid;
pub use metric::Metric;
pub use sweep::{select_best, GridPoint, Optimizer, SweepError, SweepResult};
