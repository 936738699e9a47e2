pub mod rsi;

pub use rsi::{rsi, DEFAULT_PERIOD};

//true when the series moves from at-or-below the level to strictly above it
pub fn crossed_above(prev: Option<f64>, current: Option<f64>, level: f64) -> bool {
    matches!((prev, current), (Some(p), Some(c)) if p <= level && c > level)
}

//true when the series moves from at-or-above the level to strictly below it
pub fn crossed_below(prev: Option<f64>, current: Option<f64>, level: f64) -> bool {
    matches!((prev, current), (Some(p), Some(c)) if p >= level && c < level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_above() {
        assert!(crossed_above(Some(29.0), Some(31.0), 30.0));
        assert!(crossed_above(Some(30.0), Some(30.5), 30.0));
        assert!(!crossed_above(Some(31.0), Some(35.0), 30.0));
        assert!(!crossed_above(Some(29.0), Some(30.0), 30.0));
        assert!(!crossed_above(None, Some(35.0), 30.0));
    }

    #[test]
    fn crossing_below() {
        assert!(crossed_below(Some(71.0), Some(69.0), 70.0));
        assert!(crossed_below(Some(70.0), Some(69.9), 70.0));
        assert!(!crossed_below(Some(69.0), Some(60.0), 70.0));
        assert!(!crossed_below(Some(71.0), None, 70.0));
    }
}
