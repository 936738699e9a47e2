//relative strength index with wilder smoothing
//the first bar contributes a zero change; the first average is the simple mean
//of the first `period` changes, later ones use (prev * (period - 1) + x) / period
//undefined for the first `period - 1` bars

pub const DEFAULT_PERIOD: usize = 14;

pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return values;
    }

    let changes: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    let n = period as f64;
    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / n;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;
    values[period - 1] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in period..closes.len() {
        let change = changes[i];
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
        values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    //no losses in the window, including no movement at all
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_input() {
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn zero_period_is_undefined() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn shorter_than_period_is_undefined() {
        let values = rsi(&[1.0, 2.0, 3.0], 5);
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn warmup_has_period_minus_one_undefined() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let values = rsi(&closes, 14);
        assert_eq!(values.len(), 30);
        assert!(values[..13].iter().all(Option::is_none));
        assert!(values[13..].iter().all(Option::is_some));
    }

    #[test]
    fn all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&closes, 14);
        assert_relative_eq!(values[19].unwrap(), 100.0);
    }

    #[test]
    fn all_losses_is_0() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let values = rsi(&closes, 14);
        assert_relative_eq!(values[19].unwrap(), 0.0);
    }

    #[test]
    fn flat_prices_read_100() {
        let values = rsi(&[50.0; 20], 14);
        assert!(values[13..].iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn drop_after_flat_run_falls_from_100() {
        let mut closes = vec![100.0; 20];
        closes.extend((0..5).map(|i| 95.0 - i as f64));
        let values = rsi(&closes, 14);
        assert_eq!(values[19], Some(100.0));
        assert_relative_eq!(values[20].unwrap(), 0.0);
    }

    #[test]
    fn known_values_for_short_period() {
        //changes: 0, +1, -1, +1
        let values = rsi(&[1.0, 2.0, 1.0, 2.0], 2);
        assert_eq!(values[0], None);
        assert_relative_eq!(values[1].unwrap(), 100.0);
        //gain 0.25, loss 0.5
        assert_relative_eq!(values[2].unwrap(), 100.0 / 3.0, epsilon = 1e-9);
        //gain 0.625, loss 0.25
        assert_relative_eq!(values[3].unwrap(), 100.0 - 100.0 / 3.5, epsilon = 1e-9);
    }

    #[test]
    fn bounded_on_noisy_input() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0)
            .collect();
        for value in rsi(&closes, 7).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "out of range: {value}");
        }
    }
}
