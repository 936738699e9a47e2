use crate::config::RsiParams;
use crate::metrics::{EquityPoint, SummaryMetrics};
use crate::optimize::GridPoint;
use crate::portfolio::Trade;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

//flat csv record for one grid point
#[derive(Debug, Serialize)]
struct SweepRow {
    lookback: usize,
    overbought: f64,
    oversold: f64,
    risk_reward: f64,
    risk_per_trade: f64,
    stop_loss_pct: f64,
    value: f64,
    num_trades: usize,
}

impl From<&GridPoint> for SweepRow {
    fn from(point: &GridPoint) -> Self {
        SweepRow {
            lookback: point.params.lookback,
            overbought: point.params.overbought,
            oversold: point.params.oversold,
            risk_reward: point.params.risk_reward,
            risk_per_trade: point.params.risk_per_trade,
            stop_loss_pct: point.params.stop_loss_pct,
            value: point.value,
            num_trades: point.num_trades,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryExport<'a> {
    params: &'a RsiParams,
    summary: &'a SummaryMetrics,
}

fn write_records<T, I>(records: I, path: &Path) -> Result<(), ReportError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|e| io_error(path, e))?;
    Ok(())
}

//one row per bar: timestamp, equity, drawdown, returns, state
pub fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<(), ReportError> {
    write_records(equity_curve, path)
}

//one row per closed trade
pub fn save_trades_csv(trades: &[Trade], path: &Path) -> Result<(), ReportError> {
    write_records(trades, path)
}

//one row per evaluated grid point in enumeration order
pub fn save_sweep_csv(points: &[GridPoint], path: &Path) -> Result<(), ReportError> {
    write_records(points.iter().map(SweepRow::from), path)
}

pub fn save_summary_json(
    params: &RsiParams,
    summary: &SummaryMetrics,
    path: &Path,
) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(&SummaryExport { params, summary })?;
    std::fs::write(path, json).map_err(|e| io_error(path, e))?;
    Ok(())
}

//strategy parameters as a two-column table
pub fn params_table(params: &RsiParams) -> Table {
    let rows = [
        ("Lookback", params.lookback.to_string()),
        ("Overbought", format!("{:.1}", params.overbought)),
        ("Oversold", format!("{:.1}", params.oversold)),
        ("Risk per Trade", format!("{:.2}%", params.risk_per_trade * 100.0)),
        ("Risk/Reward", format!("{:.2}", params.risk_reward)),
        ("Stop Loss", format!("{:.2}%", params.stop_loss_pct * 100.0)),
    ];
    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Parameter"), Cell::new("Value")]));
    for (name, value) in rows {
        table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
    }
    table
}

//side-by-side metrics of the initial and optimized runs
pub fn comparison_table(initial: &SummaryMetrics, optimized: &SummaryMetrics) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Metric"),
        Cell::new("Initial"),
        Cell::new("Optimized"),
    ]));
    for ((name, before), (_, after)) in initial.rows().into_iter().zip(optimized.rows()) {
        table.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&before),
            Cell::new(&after),
        ]));
    }
    table
}

//top grid points by score, best first; NaN scores sort last
pub fn top_points(points: &[GridPoint], n: usize) -> Vec<GridPoint> {
    let mut ranked = points.to_vec();
    ranked.sort_by(|a, b| match (a.value.is_nan(), b.value.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.value.total_cmp(&a.value),
    });
    ranked.truncate(n);
    ranked
}

pub fn sweep_table(points: &[GridPoint], metric_name: &str) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Lookback"),
        Cell::new("Overbought"),
        Cell::new("Oversold"),
        Cell::new("Risk/Reward"),
        Cell::new("Trades"),
        Cell::new(metric_name),
    ]));
    for point in points {
        table.add_row(Row::new(vec![
            Cell::new(&point.params.lookback.to_string()),
            Cell::new(&format!("{:.1}", point.params.overbought)),
            Cell::new(&format!("{:.1}", point.params.oversold)),
            Cell::new(&format!("{:.2}", point.params.risk_reward)),
            Cell::new(&point.num_trades.to_string()),
            Cell::new(&format!("{:.4}", point.value)),
        ]));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{Direction, ExitReason, PositionState};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn point(lookback: usize, value: f64) -> GridPoint {
        GridPoint {
            params: RsiParams {
                lookback,
                ..RsiParams::default()
            },
            value,
            num_trades: 3,
        }
    }

    #[test]
    fn ranks_points_best_first() {
        let points = vec![point(10, 1.0), point(12, f64::NAN), point(14, 5.0), point(16, -2.0)];
        let top = top_points(&points, 3);
        let lookbacks: Vec<usize> = top.iter().map(|p| p.params.lookback).collect();
        assert_eq!(lookbacks, vec![14, 10, 16]);
    }

    #[test]
    fn writes_sweep_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweep.csv");
        save_sweep_csv(&[point(10, 1.5), point(12, -0.5)], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("lookback,overbought,oversold,risk_reward,risk_per_trade,stop_loss_pct,value,num_trades")
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn writes_equity_and_trades_csv() {
        let dir = tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let curve = vec![
            EquityPoint {
                timestamp: t0,
                equity: 1_000.0,
                drawdown: 0.0,
                returns: 0.0,
                state: PositionState::Flat,
            },
            EquityPoint {
                timestamp: t0 + Duration::days(1),
                equity: 990.0,
                drawdown: 0.01,
                returns: -0.01,
                state: PositionState::Long,
            },
        ];
        let trade = Trade {
            direction: Direction::Long,
            size: 2.0,
            entry_bar: 1,
            exit_bar: 1,
            entry_time: t0 + Duration::days(1),
            exit_time: t0 + Duration::days(1),
            entry_price: 100.0,
            exit_price: 99.0,
            stop_loss: 98.0,
            take_profit: 104.0,
            commission: 0.0,
            pnl: -2.0,
            return_pct: -1.0,
            exit_reason: ExitReason::EndOfData,
        };

        let equity_path = dir.path().join("equity.csv");
        let trades_path = dir.path().join("trades.csv");
        save_equity_csv(&curve, &equity_path).unwrap();
        save_trades_csv(&[trade], &trades_path).unwrap();

        let equity = std::fs::read_to_string(&equity_path).unwrap();
        assert!(equity.starts_with("timestamp,equity,drawdown,returns,state"));
        assert!(equity.contains("Long"));
        assert_eq!(equity.lines().count(), 3);

        let trades = std::fs::read_to_string(&trades_path).unwrap();
        assert!(trades.contains("EndOfData"));
        assert_eq!(trades.lines().count(), 2);
    }

    #[test]
    fn comparison_table_has_row_per_metric() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bar = crate::data::Bar::new(t0, 10.0, 11.0, 9.0, 10.5, 1.0).unwrap();
        let series = crate::data::PriceSeries::new(vec![bar]).unwrap();
        let summary = SummaryMetrics::from_backtest(&series, &[], &[], 1_000.0);
        let table = comparison_table(&summary, &summary);
        assert_eq!(table.len(), summary.rows().len() + 1);
    }
}
