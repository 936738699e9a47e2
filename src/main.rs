use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rsi_backtest::prelude::*;
use rsi_backtest::report;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rsi-backtest")]
#[command(about = "RSI threshold strategy backtester with parameter optimization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    //log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    //run a single backtest
    Run {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    //run the configured parameters, grid-search the sweep ranges, then rerun the best
    Optimize {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        output: OutputArgs,

        //statistic to maximize (eg return_pct, sharpe_ratio)
        #[arg(long)]
        maximize: Option<Metric>,

        //evaluate grid points on a single thread
        #[arg(long)]
        sequential: bool,

        //number of best grid points to print
        #[arg(long, default_value = "10")]
        top: usize,

        //output path for the full sweep grid csv
        #[arg(long)]
        output_sweep_csv: Option<PathBuf>,
    },

    //write a default configuration file
    InitConfig {
        //destination json path
        path: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    //path to csv data file (overrides the config file)
    #[arg(long)]
    data: Option<PathBuf>,

    //path to json configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    //initial account balance
    #[arg(long)]
    initial_balance: Option<f64>,

    //commission as a fraction of traded notional
    #[arg(long)]
    commission: Option<f64>,
}

#[derive(Args)]
struct StrategyArgs {
    //rsi lookback period
    #[arg(long)]
    lookback: Option<usize>,

    //rsi overbought level
    #[arg(long)]
    overbought: Option<f64>,

    //rsi oversold level
    #[arg(long)]
    oversold: Option<f64>,

    //fraction of equity risked per trade
    #[arg(long)]
    risk_per_trade: Option<f64>,

    //take-profit offset from the close as a multiple of the stop percentage
    #[arg(long)]
    risk_reward: Option<f64>,

    //stop offset from the signal bar's low/high as a fraction
    #[arg(long)]
    stop_loss_pct: Option<f64>,
}

#[derive(Args)]
struct OutputArgs {
    //output path for equity curve csv
    #[arg(long)]
    output_equity_csv: Option<PathBuf>,

    //output path for trades csv
    #[arg(long)]
    output_trades_csv: Option<PathBuf>,

    //output path for summary json
    #[arg(long)]
    output_summary_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    //setup logging
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => anyhow::bail!("Invalid log level: {}", other),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            common,
            strategy,
            output,
        } => {
            let config = resolve_config(&common, &strategy, &output)?;
            run_backtest(&config)?;
        }
        Commands::Optimize {
            common,
            strategy,
            output,
            maximize,
            sequential,
            top,
            output_sweep_csv,
        } => {
            let mut config = resolve_config(&common, &strategy, &output)?;
            if let Some(metric) = maximize {
                config.sweep.maximize = metric;
            }
            if sequential {
                config.sweep.parallel = false;
            }
            if output_sweep_csv.is_some() {
                config.output_sweep_csv = output_sweep_csv;
            }
            run_optimization(&config, top)?;
        }
        Commands::InitConfig { path } => {
            BacktestConfiguration::default().to_json_file(&path)?;
            println!("Default configuration written to {:?}", path);
        }
    }

    Ok(())
}

//config file (or defaults) with command-line overrides applied
fn resolve_config(
    common: &CommonArgs,
    strategy: &StrategyArgs,
    output: &OutputArgs,
) -> Result<BacktestConfiguration> {
    let mut config = match &common.config {
        Some(path) => BacktestConfiguration::from_json_file(path)?,
        None => BacktestConfiguration::default(),
    };

    if let Some(data) = &common.data {
        config.data_path = data.clone();
    }
    if let Some(balance) = common.initial_balance {
        config.initial_balance = balance;
    }
    if let Some(commission) = common.commission {
        config.commission_rate = commission;
    }

    let params = &mut config.strategy;
    if let Some(v) = strategy.lookback {
        params.lookback = v;
    }
    if let Some(v) = strategy.overbought {
        params.overbought = v;
    }
    if let Some(v) = strategy.oversold {
        params.oversold = v;
    }
    if let Some(v) = strategy.risk_per_trade {
        params.risk_per_trade = v;
    }
    if let Some(v) = strategy.risk_reward {
        params.risk_reward = v;
    }
    if let Some(v) = strategy.stop_loss_pct {
        params.stop_loss_pct = v;
    }

    if output.output_equity_csv.is_some() {
        config.output_equity_csv = output.output_equity_csv.clone();
    }
    if output.output_trades_csv.is_some() {
        config.output_trades_csv = output.output_trades_csv.clone();
    }
    if output.output_summary_json.is_some() {
        config.output_summary_json = output.output_summary_json.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_series(path: &Path) -> Result<PriceSeries> {
    info!(path = %path.display(), "loading data");
    let series = load_csv(path).with_context(|| format!("Failed to load data from {:?}", path))?;

    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("Loaded {} bars", series.len());
        println!("Date range: {} to {}\n", first.timestamp, last.timestamp);
    }
    Ok(series)
}

fn account_settings(config: &BacktestConfiguration) -> BacktestConfig {
    BacktestConfig {
        initial_balance: config.initial_balance,
        commission_rate: config.commission_rate,
    }
}

fn run_backtest(config: &BacktestConfiguration) -> Result<()> {
    println!("RSI Threshold Backtester");
    println!("========================\n");

    let series = load_series(&config.data_path)?;

    println!("Initial balance: ${:.2}", config.initial_balance);
    println!("Commission: {:.4}% of notional\n", config.commission_rate * 100.0);
    report::params_table(&config.strategy).printstd();

    println!("\nRunning backtest...\n");
    let mut strategy = RsiThresholdStrategy::new(config.strategy);
    let result = BacktestEngine::new().run_with_config(&series, &mut strategy, &account_settings(config));

    println!("Backtest Results");
    println!("================\n");
    result.summary.pretty_print_table();
    print_skipped(&result);

    save_outputs(config, &config.strategy, &result)?;
    Ok(())
}

fn run_optimization(config: &BacktestConfiguration, top: usize) -> Result<()> {
    println!("RSI Threshold Optimizer");
    println!("=======================\n");

    let series = load_series(&config.data_path)?;
    let grid = config.sweep.to_grid().context("Invalid sweep ranges")?;

    let optimizer = Optimizer::new(BacktestEngine::new(), account_settings(config))
        .with_metric(config.sweep.maximize)
        .with_parallelism(config.sweep.parallel);

    println!("Running initial backtest...\n");
    let initial = optimizer.evaluate(&series, &config.strategy);

    println!(
        "Sweeping {} combinations, maximizing {}...\n",
        grid.size(),
        optimizer.metric()
    );
    let sweep = optimizer
        .sweep(&series, &config.strategy, &grid)
        .context("Parameter sweep failed")?;

    println!("Top Parameter Sets");
    println!("==================\n");
    report::sweep_table(&report::top_points(&sweep.evaluated, top), sweep.metric.name()).printstd();

    println!("\nBest Parameters");
    println!("===============\n");
    report::params_table(&sweep.best_params).printstd();

    println!("\nInitial vs Optimized");
    println!("====================\n");
    report::comparison_table(&initial.summary, &sweep.best_result.summary).printstd();
    print_skipped(&sweep.best_result);

    if let Some(path) = &config.output_sweep_csv {
        report::save_sweep_csv(&sweep.evaluated, path)?;
        println!("Sweep grid saved to {:?}", path);
    }

    save_outputs(config, &sweep.best_params, &sweep.best_result)?;
    Ok(())
}

fn print_skipped(result: &BacktestResult) {
    if !result.skipped_entries.is_empty() {
        println!("\n{} entry signal(s) skipped:", result.skipped_entries.len());
        for skipped in &result.skipped_entries {
            println!("  bar {} ({}): {}", skipped.bar_index, skipped.timestamp, skipped.reason);
        }
    }
}

//writes whichever exports the configuration asks for
fn save_outputs(
    config: &BacktestConfiguration,
    params: &RsiParams,
    result: &BacktestResult,
) -> Result<()> {
    if let Some(path) = &config.output_equity_csv {
        report::save_equity_csv(&result.equity_curve, path)?;
        println!("\nEquity curve saved to {:?}", path);
    }

    if let Some(path) = &config.output_trades_csv {
        report::save_trades_csv(&result.trades, path)?;
        println!("Trades saved to {:?}", path);
    }

    if let Some(path) = &config.output_summary_json {
        report::save_summary_json(params, &result.summary, path)?;
        println!("Summary saved to {:?}", path);
    }

    Ok(())
}
