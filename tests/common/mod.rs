#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rsi_backtest::data::{Bar, PriceSeries};

pub fn ts(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(ts(i), open, high, low, close, 1_000.0).unwrap()
}

//constant bars at 100 with a one-point range either side
pub fn quiet_bars(n: usize) -> Vec<Bar> {
    (0..n).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect()
}

pub fn flat_series(n: usize, price: f64) -> PriceSeries {
    let bars = (0..n).map(|i| bar(i, price, price, price, price)).collect();
    PriceSeries::new(bars).unwrap()
}

//bars that open at the previous close and span half a point beyond open/close
pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            bar(i, open, open.max(close) + 0.5, open.min(close) - 0.5, close)
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

//oscillating closes with a slight upward drift
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 8.0 * (t / 5.0).sin() + 3.0 * (t / 13.0).cos() + 0.02 * t
        })
        .collect()
}

//oscillator readings that cross up through 30 at `long_at` and down through 70 at `short_at`
pub fn scripted_oscillator(n: usize, long_at: usize, short_at: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| {
            if i < 3 {
                None
            } else if i < long_at {
                Some(25.0)
            } else if i < short_at {
                Some(75.0)
            } else {
                Some(65.0)
            }
        })
        .collect()
}
