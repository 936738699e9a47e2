use crate::indicator::DEFAULT_PERIOD;
use crate::optimize::{Metric, ParamGrid, SweepError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("invalid parameter {name} = {value}: {reason}")]
    Invalid {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

fn invalid(name: &'static str, value: f64, reason: &'static str) -> ParamsError {
    ParamsError::Invalid {
        name,
        value,
        reason,
    }
}

//rsi threshold strategy parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub lookback: usize,
    pub overbought: f64,
    pub oversold: f64,

    //fraction of equity risked per trade
    pub risk_per_trade: f64,

    //take-profit offset from the close as a multiple of stop_loss_pct
    pub risk_reward: f64,

    //stop offset from the trigger bar's low/high, as a fraction
    pub stop_loss_pct: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        RsiParams {
            lookback: DEFAULT_PERIOD,
            overbought: 70.0,
            oversold: 30.0,
            risk_per_trade: 0.01,
            risk_reward: 2.0,
            stop_loss_pct: 0.02,
        }
    }
}

impl RsiParams {
    //checks parameter domains; a zero stop is allowed and skips every entry
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lookback == 0 {
            return Err(invalid("lookback", 0.0, "must be at least 1"));
        }
        for (name, value) in [("overbought", self.overbought), ("oversold", self.oversold)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(name, value, "must be within [0, 100]"));
            }
        }
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(invalid("risk_per_trade", self.risk_per_trade, "must be within (0, 1]"));
        }
        if !(self.risk_reward > 0.0 && self.risk_reward.is_finite()) {
            return Err(invalid("risk_reward", self.risk_reward, "must be positive"));
        }
        if !(0.0..1.0).contains(&self.stop_loss_pct) {
            return Err(invalid("stop_loss_pct", self.stop_loss_pct, "must be within [0, 1)"));
        }
        Ok(())
    }
}

//python-style half-open integer range: start, start + step, ... < stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeSpec {
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        RangeSpec { start, stop, step }
    }

    //a range holding exactly one value
    pub fn single(value: i64) -> Self {
        RangeSpec::new(value, value.saturating_add(1), 1)
    }

    pub fn values(&self) -> Vec<i64> {
        if self.step <= 0 {
            return Vec::new();
        }
        let mut values = Vec::new();
        let mut current = self.start;
        while current < self.stop {
            values.push(current);
            match current.checked_add(self.step) {
                Some(next) => current = next,
                None => break,
            }
        }
        values
    }
}

//grid search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub lookback: RangeSpec,
    pub overbought: RangeSpec,
    pub oversold: RangeSpec,
    pub risk_reward: RangeSpec,
    pub maximize: Metric,

    //evaluate grid points on the rayon pool
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            lookback: RangeSpec::new(10, 20, 2),
            overbought: RangeSpec::new(65, 75, 2),
            oversold: RangeSpec::new(25, 35, 2),
            risk_reward: RangeSpec::new(1, 4, 1),
            maximize: Metric::ReturnPct,
            parallel: true,
        }
    }
}

impl SweepConfig {
    //expands the ranges into a parameter grid
    pub fn to_grid(&self) -> Result<ParamGrid, SweepError> {
        let lookbacks = self
            .lookback
            .values()
            .into_iter()
            .map(|v| {
                usize::try_from(v).map_err(|_| SweepError::InvalidParameterRange {
                    name: "lookback",
                    reason: format!("negative lookback {v}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let as_f64 = |range: &RangeSpec| -> Vec<f64> {
            range.values().into_iter().map(|v| v as f64).collect()
        };

        let grid = ParamGrid {
            lookbacks,
            overboughts: as_f64(&self.overbought),
            oversolds: as_f64(&self.oversold),
            risk_rewards: as_f64(&self.risk_reward),
        };
        grid.check()?;
        Ok(grid)
    }
}

//complete backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfiguration {
    //data
    pub data_path: PathBuf,

    //account settings
    pub initial_balance: f64,
    pub commission_rate: f64,

    //strategy
    pub strategy: RsiParams,

    //optimization
    pub sweep: SweepConfig,

    //optional output paths
    pub output_equity_csv: Option<PathBuf>,
    pub output_trades_csv: Option<PathBuf>,
    pub output_sweep_csv: Option<PathBuf>,
    pub output_summary_json: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("data.csv"),
            initial_balance: 1_000_000.0,
            commission_rate: 0.002,
            strategy: RsiParams::default(),
            sweep: SweepConfig::default(),
            output_equity_csv: None,
            output_trades_csv: None,
            output_sweep_csv: None,
            output_summary_json: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    //checks account settings and strategy parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.initial_balance > 0.0 && self.initial_balance.is_finite()) {
            anyhow::bail!("initial balance must be positive, got {}", self.initial_balance);
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            anyhow::bail!("commission rate must be within [0, 1), got {}", self.commission_rate);
        }
        self.strategy.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        RsiParams::default().validate().unwrap();
        BacktestConfiguration::default().validate().unwrap();
    }

    #[test]
    fn zero_stop_is_allowed() {
        let params = RsiParams {
            stop_loss_pct: 0.0,
            ..RsiParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn bad_params_are_rejected() {
        let cases = [
            RsiParams { lookback: 0, ..RsiParams::default() },
            RsiParams { overbought: 120.0, ..RsiParams::default() },
            RsiParams { oversold: -1.0, ..RsiParams::default() },
            RsiParams { risk_per_trade: 0.0, ..RsiParams::default() },
            RsiParams { risk_reward: 0.0, ..RsiParams::default() },
            RsiParams { stop_loss_pct: 1.0, ..RsiParams::default() },
        ];
        for params in cases {
            assert!(params.validate().is_err(), "{params:?} should be invalid");
        }
    }

    #[test]
    fn range_spec_is_half_open() {
        assert_eq!(RangeSpec::new(10, 20, 2).values(), vec![10, 12, 14, 16, 18]);
        assert_eq!(RangeSpec::new(1, 4, 1).values(), vec![1, 2, 3]);
        assert_eq!(RangeSpec::single(14).values(), vec![14]);
        assert!(RangeSpec::new(5, 5, 1).values().is_empty());
        assert!(RangeSpec::new(1, 10, 0).values().is_empty());
    }

    #[test]
    fn range_spec_stops_at_integer_limit() {
        assert_eq!(RangeSpec::new(i64::MAX - 1, i64::MAX, 5).values(), vec![i64::MAX - 1]);
        assert_eq!(
            RangeSpec::new(i64::MAX - 10, i64::MAX, 4).values(),
            vec![i64::MAX - 10, i64::MAX - 6, i64::MAX - 2]
        );
    }

    #[test]
    fn default_sweep_grid_size() {
        let grid = SweepConfig::default().to_grid().unwrap();
        assert_eq!(grid.size(), 5 * 5 * 5 * 3);
    }

    #[test]
    fn empty_range_is_invalid() {
        let sweep = SweepConfig {
            oversold: RangeSpec::new(30, 25, 1),
            ..SweepConfig::default()
        };
        assert!(matches!(
            sweep.to_grid(),
            Err(SweepError::InvalidParameterRange { name: "oversold", .. })
        ));
    }

    #[test]
    fn negative_lookback_is_invalid() {
        let sweep = SweepConfig {
            lookback: RangeSpec::new(-2, 2, 1),
            ..SweepConfig::default()
        };
        assert!(sweep.to_grid().is_err());
    }

    #[test]
    fn json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = BacktestConfiguration::default();
        config.to_json_file(&path).unwrap();
        let loaded = BacktestConfiguration::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: BacktestConfiguration =
            serde_json::from_str(r#"{"initial_balance": 5000.0, "strategy": {"lookback": 7}}"#)
                .unwrap();
        assert_eq!(config.initial_balance, 5000.0);
        assert_eq!(config.strategy.lookback, 7);
        assert_eq!(config.strategy.overbought, 70.0);
        assert_eq!(config.commission_rate, 0.002);
    }
}
