use crate::config::RsiParams;
use crate::data::{Bar, PriceSeries};
use crate::indicator::{crossed_above, crossed_below, rsi};
use crate::portfolio::Direction;
use crate::strategy::{Strategy, StrategyContext};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    #[error("equity {0} is not positive")]
    NonPositiveEquity(f64),
    #[error("computed position size {0} is not positive")]
    NonPositiveSize(f64),
    #[error("stop-loss {stop_loss} leaves no room below/above entry {entry}")]
    InvalidStopDistance { entry: f64, stop_loss: f64 },
}

//fully specified entry derived from a signal bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryPlan {
    pub direction: Direction,
    pub size: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

//entry direction for a pair of consecutive oscillator readings
//an upward cross of oversold takes priority over a downward cross of overbought
pub fn entry_signal(
    prev: Option<f64>,
    current: Option<f64>,
    oversold: f64,
    overbought: f64,
) -> Option<Direction> {
    if crossed_above(prev, current, oversold) {
        Some(Direction::Long)
    } else if crossed_below(prev, current, overbought) {
        Some(Direction::Short)
    } else {
        None
    }
}

//sizes a position so that hitting the stop risks `risk_per_trade` of equity
pub fn plan_entry(
    direction: Direction,
    bar: &Bar,
    equity: f64,
    params: &RsiParams,
) -> Result<EntryPlan, SizingError> {
    if !(equity > 0.0) {
        return Err(SizingError::NonPositiveEquity(equity));
    }

    let entry_price = bar.close;
    let risk_amount = equity * params.risk_per_trade;
    let size = risk_amount / (entry_price * params.stop_loss_pct);
    if !size.is_finite() || size <= 0.0 {
        return Err(SizingError::NonPositiveSize(size));
    }

    let stop_loss = match direction {
        Direction::Long => bar.low * (1.0 - params.stop_loss_pct),
        Direction::Short => bar.high * (1.0 + params.stop_loss_pct),
    };

    //signed distance from entry to stop in the losing direction
    let stop_distance = direction.sign() * (entry_price - stop_loss);
    if !(stop_distance > 0.0) {
        return Err(SizingError::InvalidStopDistance {
            entry: entry_price,
            stop_loss,
        });
    }

    //target is measured from the close by the nominal stop percentage, not the bar-based stop
    let take_profit =
        entry_price * (1.0 + direction.sign() * params.stop_loss_pct * params.risk_reward);

    Ok(EntryPlan {
        direction,
        size,
        entry_price,
        stop_loss,
        take_profit,
    })
}

//rsi threshold-crossing strategy with risk-based sizing
//goes long when rsi crosses up through oversold
//goes short when rsi crosses down through overbought
#[derive(Debug, Clone)]
pub struct RsiThresholdStrategy {
    params: RsiParams,
    oscillator: Vec<Option<f64>>,

    //oscillator supplied up front instead of computed from closes
    preset: bool,
}

impl RsiThresholdStrategy {
    pub fn new(params: RsiParams) -> Self {
        RsiThresholdStrategy {
            params,
            oscillator: Vec::new(),
            preset: false,
        }
    }

    //drives the strategy from an externally computed oscillator
    pub fn with_oscillator(params: RsiParams, oscillator: Vec<Option<f64>>) -> Self {
        RsiThresholdStrategy {
            params,
            oscillator,
            preset: true,
        }
    }

    pub fn params(&self) -> &RsiParams {
        &self.params
    }

    pub fn oscillator(&self) -> &[Option<f64>] {
        &self.oscillator
    }

    fn reading(&self, index: usize) -> Option<f64> {
        self.oscillator.get(index).copied().flatten()
    }
}

impl Default for RsiThresholdStrategy {
    fn default() -> Self {
        Self::new(RsiParams::default())
    }
}

impl Strategy for RsiThresholdStrategy {
    fn on_start(&mut self, series: &PriceSeries) {
        if !self.preset {
            self.oscillator = rsi(&series.closes(), self.params.lookback);
        }
    }

    fn on_bar(&mut self, context: &mut StrategyContext<'_>) {
        //single position: signals are ignored while in the market
        if !context.is_flat() {
            return;
        }

        let index = context.index();
        if index == 0 {
            return;
        }

        let signal = entry_signal(
            self.reading(index - 1),
            self.reading(index),
            self.params.oversold,
            self.params.overbought,
        );
        let direction = match signal {
            Some(direction) => direction,
            None => return,
        };

        debug!(bar = index, rsi = ?self.reading(index), ?direction, "entry signal");

        let plan = match plan_entry(direction, context.bar(), context.equity(), &self.params) {
            Ok(plan) => plan,
            Err(err) => {
                debug!(bar = index, error = %err, "entry skipped");
                context.skip_entry(err);
                return;
            }
        };

        if let Err(err) = context.enter(plan.direction, plan.size, plan.stop_loss, plan.take_profit)
        {
            context.skip_entry(err);
        }
    }

    fn name(&self) -> &str {
        "RSI Threshold"
    }
}
