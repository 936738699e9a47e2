use crate::data::PriceSeries;
use crate::engine::execution::{ExecutionEngine, SkippedEntry};
use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
use crate::portfolio::{Account, ExitReason, Trade};
use crate::strategy::{Strategy, StrategyContext};
use serde::Serialize;
use tracing::debug;

//result of a backtest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub summary: SummaryMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub skipped_entries: Vec<SkippedEntry>,
}

//account settings for a backtest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,

    //fraction of notional charged on every fill
    pub commission_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 1_000_000.0,
            commission_rate: 0.002,
        }
    }
}

//replays a strategy over a price series
pub trait Simulator {
    fn run(
        &self,
        series: &PriceSeries,
        strategy: &mut dyn Strategy,
        cash: f64,
        commission: f64,
    ) -> BacktestResult;

    fn run_with_config(
        &self,
        series: &PriceSeries,
        strategy: &mut dyn Strategy,
        config: &BacktestConfig,
    ) -> BacktestResult {
        self.run(series, strategy, config.initial_balance, config.commission_rate)
    }
}

//bar-by-bar simulator with market-on-close entries and bracket exits
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestEngine;

impl BacktestEngine {
    pub fn new() -> Self {
        BacktestEngine
    }
}

impl Simulator for BacktestEngine {
    fn run(
        &self,
        series: &PriceSeries,
        strategy: &mut dyn Strategy,
        cash: f64,
        commission: f64,
    ) -> BacktestResult {
        let mut account = Account::new(cash, commission);
        let mut execution = ExecutionEngine::new();

        let mut timestamps = Vec::with_capacity(series.len());
        let mut equity_values = Vec::with_capacity(series.len());
        let mut states = Vec::with_capacity(series.len());

        strategy.on_start(series);

        //main backtest loop
        for (index, bar) in series.iter().enumerate() {
            //protective levels only apply from the bar after entry
            let exit = account
                .position()
                .filter(|p| p.entry_bar < index)
                .and_then(|p| execution.check_exit(p, bar));

            if let Some(exit) = exit {
                if let Some(trade) =
                    account.close_position(index, bar.timestamp, exit.price, exit.reason)
                {
                    debug!(
                        bar = index,
                        direction = ?trade.direction,
                        reason = ?trade.exit_reason,
                        price = trade.exit_price,
                        pnl = trade.pnl,
                        "position closed"
                    );
                }
            }

            account.update_equity(bar.close);

            //no signal evaluation on a bar that closed a position
            if exit.is_none() {
                let mut context = StrategyContext::new(index, bar, &account, &mut execution);
                strategy.on_bar(&mut context);
            }

            for (order, fill) in execution.fill_pending(index, bar) {
                match account.open_position(&order, &fill) {
                    Ok(()) => debug!(
                        bar = index,
                        side = ?fill.side,
                        size = fill.size,
                        price = fill.fill_price,
                        stop_loss = order.stop_loss,
                        take_profit = order.take_profit,
                        "position opened"
                    ),
                    Err(err) => execution.skip_entry(index, bar.timestamp, err.to_string()),
                }
            }

            account.update_equity(bar.close);

            timestamps.push(bar.timestamp);
            equity_values.push(account.equity);
            states.push(account.state());
        }

        //close whatever is still open at the final close
        if let Some(last_bar) = series.last() {
            let last_index = series.len() - 1;
            if account
                .close_position(
                    last_index,
                    last_bar.timestamp,
                    last_bar.close,
                    ExitReason::EndOfData,
                )
                .is_some()
            {
                debug!(bar = last_index, "position closed at end of data");
            }
            if let Some(equity) = equity_values.last_mut() {
                *equity = account.equity;
            }
            if let Some(state) = states.last_mut() {
                *state = account.state();
            }
        }

        let equity_curve = calculate_equity_curve(&timestamps, &equity_values, &states, cash);
        let trades = account.trade_log;
        let summary = SummaryMetrics::from_backtest(series, &equity_curve, &trades, cash);

        debug!(
            strategy = strategy.name(),
            trades = trades.len(),
            return_pct = summary.return_pct,
            "backtest finished"
        );

        BacktestResult {
            summary,
            equity_curve,
            trades,
            skipped_entries: execution.into_skipped_entries(),
        }
    }
}
