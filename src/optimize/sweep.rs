use crate::config::{ParamsError, RsiParams};
use crate::data::PriceSeries;
use crate::engine::{BacktestConfig, BacktestResult, Simulator};
use crate::optimize::{Metric, ParamGrid};
use crate::strategy::rsi_threshold::RsiThresholdStrategy;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    #[error("invalid range for {name}: {reason}")]
    InvalidParameterRange { name: &'static str, reason: String },
    #[error(transparent)]
    InvalidParams(#[from] ParamsError),
}

//one evaluated grid point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub params: RsiParams,
    pub value: f64,
    pub num_trades: usize,
}

//outcome of a grid search
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub metric: Metric,
    pub best_params: RsiParams,
    pub best_value: f64,
    pub best_result: BacktestResult,

    //every grid point in enumeration order
    pub evaluated: Vec<GridPoint>,
}

//index of the first strictly greatest value
//NaN never beats a number; all-NaN input selects the first point
pub fn select_best(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &value) in values.iter().enumerate() {
        best = match best {
            None => Some(i),
            Some(b) if values[b].is_nan() && !value.is_nan() => Some(i),
            Some(b) if value > values[b] => Some(i),
            keep => keep,
        };
    }
    best
}

//exhaustive grid search over rsi strategy parameters
pub struct Optimizer<S> {
    simulator: S,
    config: BacktestConfig,
    metric: Metric,
    parallel: bool,
}

impl<S: Simulator + Sync> Optimizer<S> {
    pub fn new(simulator: S, config: BacktestConfig) -> Self {
        Optimizer {
            simulator,
            config,
            metric: Metric::default(),
            parallel: true,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    //single backtest with the given parameters
    pub fn evaluate(&self, series: &PriceSeries, params: &RsiParams) -> BacktestResult {
        let mut strategy = RsiThresholdStrategy::new(*params);
        self.simulator.run_with_config(series, &mut strategy, &self.config)
    }

    //runs every combination of `grid`; parameters outside the grid come from `base`
    pub fn sweep(
        &self,
        series: &PriceSeries,
        base: &RsiParams,
        grid: &ParamGrid,
    ) -> Result<SweepResult, SweepError> {
        grid.check()?;
        let combos = grid.combinations(base);
        for params in &combos {
            params.validate()?;
        }

        info!(
            combinations = combos.len(),
            metric = %self.metric,
            parallel = self.parallel,
            "starting parameter sweep"
        );

        let score = |params: &RsiParams| {
            let result = self.evaluate(series, params);
            let value = self.metric.value(&result.summary);
            debug!(
                lookback = params.lookback,
                overbought = params.overbought,
                oversold = params.oversold,
                risk_reward = params.risk_reward,
                value,
                "grid point evaluated"
            );
            GridPoint {
                params: *params,
                value,
                num_trades: result.trades.len(),
            }
        };

        //collect keeps enumeration order in both modes
        let evaluated: Vec<GridPoint> = if self.parallel {
            combos.par_iter().map(score).collect()
        } else {
            combos.iter().map(score).collect()
        };

        let values: Vec<f64> = evaluated.iter().map(|point| point.value).collect();
        let best_index = select_best(&values).ok_or_else(|| SweepError::InvalidParameterRange {
            name: "grid",
            reason: "no combinations to evaluate".to_string(),
        })?;
        let best = evaluated[best_index];

        //the simulation is deterministic so the winner is replayed rather than kept in memory
        let best_result = self.evaluate(series, &best.params);

        info!(
            lookback = best.params.lookback,
            overbought = best.params.overbought,
            oversold = best.params.oversold,
            risk_reward = best.params.risk_reward,
            value = best.value,
            "best parameters found"
        );

        Ok(SweepResult {
            metric: self.metric,
            best_params: best.params,
            best_value: best.value,
            best_result,
            evaluated,
        })
    }
}
