use crate::data::PriceSeries;
use crate::metrics::timeseries::{
    calculate_returns, drawdown_episodes, max_drawdown, max_drawdown_duration, periods_per_year,
    EquityPoint,
};
use crate::portfolio::{PositionState, Trade};
use chrono::{DateTime, Utc};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//summary metrics for a backtest; *_pct fields are percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_days: f64,
    pub exposure_pct: f64,
    pub initial_balance: f64,
    pub equity_final: f64,
    pub equity_peak: f64,
    pub return_pct: f64,
    pub buy_hold_return_pct: f64,
    pub cagr_pct: f64,
    pub volatility_ann_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown_pct: f64,
    pub avg_drawdown_pct: f64,
    pub max_drawdown_duration_bars: usize,
    pub num_trades: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub avg_trade_pct: f64,
    pub avg_trade_duration_bars: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub expectancy_pct: f64,
    pub sqn: f64,
}

impl SummaryMetrics {
    //calculate summary metrics from the equity curve and closed trades
    pub fn from_backtest(
        series: &PriceSeries,
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_balance: f64,
    ) -> Self {
        let equity_final = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);
        let equity_peak = equity_curve
            .iter()
            .map(|p| p.equity)
            .fold(initial_balance, f64::max);
        let return_pct = (equity_final - initial_balance) / initial_balance * 100.0;

        let start = series.first().map(|b| b.timestamp);
        let end = series.last().map(|b| b.timestamp);
        let duration_days = match (start, end) {
            (Some(s), Some(e)) => (e - s).num_seconds() as f64 / 86_400.0,
            _ => 0.0,
        };

        let buy_hold_return_pct = match (series.first(), series.last()) {
            (Some(first), Some(last)) if first.close > 0.0 => {
                (last.close - first.close) / first.close * 100.0
            }
            _ => 0.0,
        };

        let years = duration_days / 365.25;
        let cagr_pct = if years > 0.0 && equity_final > 0.0 {
            ((equity_final / initial_balance).powf(1.0 / years) - 1.0) * 100.0
        } else {
            0.0
        };

        let max_dd = max_drawdown(equity_curve);
        let episodes = drawdown_episodes(equity_curve);
        let avg_drawdown_pct = if episodes.is_empty() {
            0.0
        } else {
            episodes.iter().sum::<f64>() / episodes.len() as f64 * 100.0
        };

        let equity_values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let returns = calculate_returns(&equity_values);
        let periods = periods_per_year(&series.timestamps());

        let volatility_ann_pct = if returns.len() >= 2 {
            returns.iter().std_dev() * periods.sqrt() * 100.0
        } else {
            0.0
        };

        let calmar_ratio = if max_dd > 0.0 {
            cagr_pct / (max_dd * 100.0)
        } else {
            0.0
        };

        let exposure_pct = if equity_curve.is_empty() {
            0.0
        } else {
            let in_market = equity_curve
                .iter()
                .filter(|p| p.state != PositionState::Flat)
                .count();
            in_market as f64 / equity_curve.len() as f64 * 100.0
        };

        let trade_stats = calculate_trade_statistics(trades);

        SummaryMetrics {
            start,
            end,
            duration_days,
            exposure_pct,
            initial_balance,
            equity_final,
            equity_peak,
            return_pct,
            buy_hold_return_pct,
            cagr_pct,
            volatility_ann_pct,
            sharpe_ratio: calculate_sharpe_ratio(&returns, periods),
            sortino_ratio: calculate_sortino_ratio(&returns, periods),
            calmar_ratio,
            max_drawdown_pct: max_dd * 100.0,
            avg_drawdown_pct,
            max_drawdown_duration_bars: max_drawdown_duration(equity_curve),
            num_trades: trade_stats.num_trades,
            num_winning_trades: trade_stats.num_winning_trades,
            num_losing_trades: trade_stats.num_losing_trades,
            win_rate_pct: trade_stats.win_rate * 100.0,
            best_trade_pct: trade_stats.best_trade_pct,
            worst_trade_pct: trade_stats.worst_trade_pct,
            avg_trade_pct: trade_stats.avg_trade_pct,
            avg_trade_duration_bars: trade_stats.avg_duration_bars,
            avg_win: trade_stats.avg_win,
            avg_loss: trade_stats.avg_loss,
            largest_win: trade_stats.largest_win,
            largest_loss: trade_stats.largest_loss,
            profit_factor: trade_stats.profit_factor,
            expectancy_pct: trade_stats.expectancy_pct,
            sqn: trade_stats.sqn,
        }
    }

    //metric/value rows in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let time = |t: Option<DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        vec![
            ("Start", time(self.start)),
            ("End", time(self.end)),
            ("Duration", format!("{:.1} days", self.duration_days)),
            ("Exposure Time", format!("{:.2}%", self.exposure_pct)),
            ("Initial Balance", format!("${:.2}", self.initial_balance)),
            ("Equity Final", format!("${:.2}", self.equity_final)),
            ("Equity Peak", format!("${:.2}", self.equity_peak)),
            ("Return", format!("{:.2}%", self.return_pct)),
            ("Buy & Hold Return", format!("{:.2}%", self.buy_hold_return_pct)),
            ("CAGR", format!("{:.2}%", self.cagr_pct)),
            ("Volatility (Ann.)", format!("{:.2}%", self.volatility_ann_pct)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Calmar Ratio", format!("{:.3}", self.calmar_ratio)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown_pct)),
            ("Avg Drawdown", format!("{:.2}%", self.avg_drawdown_pct)),
            (
                "Max Drawdown Duration",
                format!("{} bars", self.max_drawdown_duration_bars),
            ),
            ("Number of Trades", format!("{}", self.num_trades)),
            ("Win Rate", format!("{:.2}%", self.win_rate_pct)),
            ("Best Trade", format!("{:.2}%", self.best_trade_pct)),
            ("Worst Trade", format!("{:.2}%", self.worst_trade_pct)),
            ("Avg Trade", format!("{:.2}%", self.avg_trade_pct)),
            (
                "Avg Trade Duration",
                format!("{:.1} bars", self.avg_trade_duration_bars),
            ),
            ("Avg Win", format!("${:.2}", self.avg_win)),
            ("Avg Loss", format!("${:.2}", self.avg_loss)),
            ("Largest Win", format!("${:.2}", self.largest_win)),
            ("Largest Loss", format!("${:.2}", self.largest_loss)),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
            ("Expectancy", format!("{:.2}%", self.expectancy_pct)),
            ("SQN", format!("{:.2}", self.sqn)),
        ]
    }

    //metrics as a two-column table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));
        for (name, value) in self.rows() {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }
        table
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

struct TradeStats {
    num_trades: usize,
    num_winning_trades: usize,
    num_losing_trades: usize,
    win_rate: f64,
    best_trade_pct: f64,
    worst_trade_pct: f64,
    avg_trade_pct: f64,
    avg_duration_bars: f64,
    avg_win: f64,
    avg_loss: f64,
    largest_win: f64,
    largest_loss: f64,
    profit_factor: f64,
    expectancy_pct: f64,
    sqn: f64,
}

impl TradeStats {
    fn empty() -> Self {
        TradeStats {
            num_trades: 0,
            num_winning_trades: 0,
            num_losing_trades: 0,
            win_rate: 0.0,
            best_trade_pct: 0.0,
            worst_trade_pct: 0.0,
            avg_trade_pct: 0.0,
            avg_duration_bars: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_factor: 0.0,
            expectancy_pct: 0.0,
            sqn: 0.0,
        }
    }
}

fn calculate_trade_statistics(trades: &[Trade]) -> TradeStats {
    if trades.is_empty() {
        return TradeStats::empty();
    }

    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let pcts: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();

    let winning_trades: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
    let losing_trades: Vec<f64> = pnls.iter().filter(|&&p| p < 0.0).copied().collect();

    let num_winning = winning_trades.len();
    let num_losing = losing_trades.len();
    let total = trades.len();

    let avg_win = if num_winning > 0 {
        winning_trades.iter().sum::<f64>() / num_winning as f64
    } else {
        0.0
    };

    let avg_loss = if num_losing > 0 {
        losing_trades.iter().sum::<f64>() / num_losing as f64
    } else {
        0.0
    };

    let total_wins: f64 = winning_trades.iter().sum();
    let total_losses: f64 = losing_trades.iter().sum::<f64>().abs();

    let profit_factor = if total_losses > 0.0 {
        total_wins / total_losses
    } else if total_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    //geometric mean of per-trade returns
    let growth: f64 = pcts.iter().map(|p| 1.0 + p / 100.0).product();
    let avg_trade_pct = if growth > 0.0 {
        (growth.powf(1.0 / total as f64) - 1.0) * 100.0
    } else {
        -100.0
    };

    let sqn = if total >= 2 {
        let std = pnls.iter().std_dev();
        if std > 0.0 {
            (total as f64).sqrt() * pnls.iter().mean() / std
        } else {
            0.0
        }
    } else {
        0.0
    };

    TradeStats {
        num_trades: total,
        num_winning_trades: num_winning,
        num_losing_trades: num_losing,
        win_rate: num_winning as f64 / total as f64,
        best_trade_pct: pcts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        worst_trade_pct: pcts.iter().copied().fold(f64::INFINITY, f64::min),
        avg_trade_pct,
        avg_duration_bars: trades.iter().map(|t| t.duration_bars() as f64).sum::<f64>()
            / total as f64,
        avg_win,
        avg_loss,
        largest_win: winning_trades.iter().fold(0.0f64, |a, &b| a.max(b)),
        largest_loss: losing_trades.iter().fold(0.0f64, |a, &b| a.min(b)),
        profit_factor,
        expectancy_pct: pcts.iter().sum::<f64>() / total as f64,
        sqn,
    }
}

fn calculate_sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().mean();
    let std_dev = returns.iter().std_dev();

    if std_dev == 0.0 || !std_dev.is_finite() {
        return 0.0;
    }

    (mean / std_dev) * periods_per_year.sqrt()
}

fn calculate_sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().mean();

    //downside deviation over negative returns only
    let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();

    if negative_returns.is_empty() {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }

    let downside_dev = (negative_returns.iter().map(|r| r * r).sum::<f64>()
        / negative_returns.len() as f64)
        .sqrt();

    if downside_dev == 0.0 {
        return 0.0;
    }

    (mean / downside_dev) * periods_per_year.sqrt()
}
