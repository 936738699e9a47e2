pub mod account;
pub mod position;
pub mod trade;

pub use account::Account;
pub use position::{Direction, Position, PositionState};
pub use trade::{ExitReason, Trade};
