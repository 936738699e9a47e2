use crate::portfolio::PositionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

//fallback when bar spacing cannot be inferred (trading days)
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,

    //fractional distance below the running peak
    pub drawdown: f64,

    //fractional change from the previous point
    pub returns: f64,

    //exposure after this bar was processed
    pub state: PositionState,
}

//builds the equity curve with drawdowns and per-bar returns
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    equity_values: &[f64],
    states: &[PositionState],
    initial_balance: f64,
) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(timestamps.len());
    let mut peak = initial_balance;
    let mut prev_equity = initial_balance;

    for ((&timestamp, &equity), &state) in timestamps.iter().zip(equity_values).zip(states) {
        if equity > peak {
            peak = equity;
        }

        let drawdown = if peak > 0.0 {
            (peak - equity) / peak
        } else {
            0.0
        };

        let returns = if prev_equity != 0.0 {
            (equity - prev_equity) / prev_equity
        } else {
            0.0
        };

        curve.push(EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
            state,
        });
        prev_equity = equity;
    }

    curve
}

//calculates maximum drawdown from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::max)
}

//peak depth of each drawdown episode
pub fn drawdown_episodes(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut episodes = Vec::new();
    let mut depth = 0.0f64;

    for point in equity_curve {
        if point.drawdown > 0.0 {
            depth = depth.max(point.drawdown);
        } else if depth > 0.0 {
            episodes.push(depth);
            depth = 0.0;
        }
    }
    if depth > 0.0 {
        episodes.push(depth);
    }
    episodes
}

//longest run of consecutive bars spent below a prior peak
pub fn max_drawdown_duration(equity_curve: &[EquityPoint]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for point in equity_curve {
        if point.drawdown > 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

//calculates returns from equity values
pub fn calculate_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

//bars per year implied by the median spacing of the timestamps
pub fn periods_per_year(timestamps: &[DateTime<Utc>]) -> f64 {
    let mut gaps: Vec<i64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .filter(|&s| s > 0)
        .collect();
    if gaps.is_empty() {
        return DEFAULT_PERIODS_PER_YEAR;
    }
    gaps.sort_unstable();
    let median = gaps[gaps.len() / 2] as f64;

    //daily or coarser data is assumed to skip weekends
    if median >= 86_400.0 {
        return DEFAULT_PERIODS_PER_YEAR * 86_400.0 / median;
    }
    SECONDS_PER_YEAR / median
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn stamps(n: usize, step: Duration) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + step * i as i32).collect()
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let ts = stamps(values.len(), Duration::days(1));
        let states = vec![PositionState::Flat; values.len()];
        calculate_equity_curve(&ts, values, &states, values[0])
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let c = curve(&[100.0, 110.0, 99.0, 121.0, 110.0]);
        assert_relative_eq!(c[2].drawdown, 0.1, epsilon = 1e-12);
        assert_eq!(c[3].drawdown, 0.0);
        assert_relative_eq!(c[1].returns, 0.1, epsilon = 1e-12);
        assert_relative_eq!(max_drawdown(&c), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn episodes_and_duration() {
        let c = curve(&[100.0, 90.0, 95.0, 100.0, 100.0, 80.0, 85.0]);
        let episodes = drawdown_episodes(&c);
        assert_eq!(episodes.len(), 2);
        assert_relative_eq!(episodes[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(episodes[1], 0.2, epsilon = 1e-12);
        assert_eq!(max_drawdown_duration(&c), 2);
    }

    #[test]
    fn returns_between_points() {
        let r = calculate_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[1], -0.1, epsilon = 1e-12);
        assert!(calculate_returns(&[100.0]).is_empty());
    }

    #[test]
    fn annualization_from_spacing() {
        assert_relative_eq!(periods_per_year(&stamps(10, Duration::days(1))), 252.0);
        assert_relative_eq!(
            periods_per_year(&stamps(10, Duration::minutes(15))),
            SECONDS_PER_YEAR / 900.0
        );
        assert_eq!(periods_per_year(&stamps(1, Duration::days(1))), DEFAULT_PERIODS_PER_YEAR);
    }
}
