//! # Screen a chain
//! condor-backtest screen --chain data/spy_chain.csv --spot 560 --as-of 2024-01-12
//!
//! # Backtest the top candidates over a price path
//! condor-backtest backtest --chain data/spy_chain.csv --prices data/spy_prices.csv \
//!     --spot 560 --as-of 2024-01-12 --earnings data/earnings.csv
//!
//! # Run the seeded synthetic earnings study
//! condor-backtest study --config config/default.toml --report EARNINGS_EDGE_REPORT.md

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use condor_backtest::analytics::realized_volatility;
use condor_backtest::backtest::{BacktestJob, CondorSimulator, SyntheticStudy};
use condor_backtest::data::{
    load_chain_file, load_earnings_calendar_file, load_iv_history_file, load_price_path_file,
    load_underlying_bars_file,
};
use condor_backtest::{
    AppConfig, ChainSnapshot, CondorScreener, EarningsEdgeAnalyzer, EdgeReport, MetricsCalculator,
    TradeOutcome,
};

#[derive(Parser)]
#[command(name = "condor-backtest")]
#[command(about = "Iron condor screening, backtesting and earnings-edge validation")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ChainArgs {
    /// Option chain CSV
    #[arg(long)]
    chain: PathBuf,

    /// Underlying price
    #[arg(long)]
    spot: f64,

    /// Screening date (YYYY-MM-DD)
    #[arg(long)]
    as_of: String,

    /// Historical IV CSV (column `iv`)
    #[arg(long)]
    iv_history: Option<PathBuf>,

    /// OHLC bars CSV for realized volatility
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Earnings calendar CSV (`symbol,earnings_date`)
    #[arg(long)]
    earnings: Option<PathBuf>,

    /// Keep this many top-ranked condors
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen and rank iron condors on one chain
    Screen {
        #[command(flatten)]
        chain: ChainArgs,

        /// Write ranked analytics as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Screen a chain, then simulate the top candidates over a price path
    Backtest {
        #[command(flatten)]
        chain: ChainArgs,

        /// Price path CSV (`date,price`)
        #[arg(long)]
        prices: PathBuf,

        /// Write trade outcomes as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the earnings edge report as markdown
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run the seeded synthetic earnings study
    Study {
        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured number of trades
        #[arg(long)]
        trades: Option<usize>,

        /// Write trade outcomes as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the earnings edge report as markdown
        #[arg(long, default_value = "EARNINGS_EDGE_REPORT.md")]
        report: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote JSON output");
    Ok(())
}

fn load_snapshot(args: &ChainArgs) -> Result<ChainSnapshot> {
    let as_of =
        NaiveDate::parse_from_str(&args.as_of, "%Y-%m-%d").context("Invalid as-of date format")?;

    let load = load_chain_file(&args.chain)
        .with_context(|| format!("Failed to load chain {}", args.chain.display()))?;

    let iv_history = match &args.iv_history {
        Some(path) => load_iv_history_file(path)
            .with_context(|| format!("Failed to load IV history {}", path.display()))?,
        None => Vec::new(),
    };

    let realized_vol = match &args.bars {
        Some(path) => {
            let bars = load_underlying_bars_file(path)
                .with_context(|| format!("Failed to load bars {}", path.display()))?;
            let closes: Vec<f64> = bars
                .iter()
                .map(|b| f64::try_from(b.close).unwrap_or(0.0))
                .collect();
            realized_volatility(&closes, &bars)
        }
        None => 0.0,
    };

    let ticker = load.contracts.first().map(|c| c.ticker.clone());
    let earnings_date = match (&args.earnings, ticker) {
        (Some(path), Some(ticker)) => load_earnings_calendar_file(path)
            .with_context(|| format!("Failed to load earnings calendar {}", path.display()))?
            .remove(&ticker),
        _ => None,
    };

    Ok(ChainSnapshot {
        contracts: load.contracts,
        spot: args.spot,
        as_of,
        iv_history,
        realized_vol,
        earnings_date,
    })
}

fn report_edge(config: &AppConfig, outcomes: &[TradeOutcome], report: Option<&Path>) -> Result<()> {
    let summary = MetricsCalculator::calculate(outcomes);
    println!("\n{}", summary.summary());

    let comparison = EarningsEdgeAnalyzer::new(config.significance).analyze(outcomes);
    println!("\n{}", comparison.recommendation_message());

    if let Some(path) = report {
        let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        EdgeReport::new(&comparison, outcomes, &config.exit, generated_at)
            .write_to(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

fn cmd_screen(config: &AppConfig, args: &ChainArgs, output: Option<&Path>) -> Result<()> {
    let snapshot = load_snapshot(args)?;
    let result = CondorScreener::from_config(config).screen(&snapshot, Some(args.top));

    println!("{}", result.summary());
    if result.ranked.is_empty() {
        println!("No iron condors passed screening.");
    }
    for (i, analytics) in result.ranked.iter().enumerate() {
        println!("{:>3}. {}", i + 1, analytics);
    }

    if let Some(path) = output {
        write_json(path, &result)?;
    }
    Ok(())
}

fn cmd_backtest(
    config: &AppConfig,
    args: &ChainArgs,
    prices: &Path,
    output: Option<&Path>,
    report: Option<&Path>,
) -> Result<()> {
    let snapshot = load_snapshot(args)?;
    let result = CondorScreener::from_config(config).screen(&snapshot, Some(args.top));
    println!("{}", result.summary());

    let price_path = Arc::new(
        load_price_path_file(prices)
            .with_context(|| format!("Failed to load prices {}", prices.display()))?,
    );

    let jobs: Vec<BacktestJob> = result
        .ranked
        .into_iter()
        .map(|analytics| BacktestJob {
            condor: analytics.condor,
            entry_date: snapshot.as_of,
            price_path: Arc::clone(&price_path),
            earnings_date: snapshot.earnings_date.clone(),
        })
        .collect();

    let simulator = CondorSimulator::new(config.exit, config.valuation);
    let mut outcomes = Vec::with_capacity(jobs.len());
    for outcome in simulator.simulate_batch(&jobs) {
        match outcome {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "Skipping candidate"),
        }
    }

    if outcomes.is_empty() {
        println!("No trades simulated.");
    }
    for outcome in &outcomes {
        println!(
            "{} {} -> {} {} pnl={:.2} ({:+.1}%)",
            outcome.condor,
            outcome.entry_date,
            outcome.exit_date,
            outcome.exit_reason,
            outcome.realized_pnl,
            outcome.return_pct
        );
    }

    if let Some(path) = output {
        write_json(path, &outcomes)?;
    }
    report_edge(config, &outcomes, report)
}

fn cmd_study(
    mut config: AppConfig,
    seed: Option<u64>,
    trades: Option<usize>,
    output: Option<&Path>,
    report: &Path,
) -> Result<()> {
    if let Some(seed) = seed {
        config.study.seed = seed;
    }
    if let Some(trades) = trades {
        config.study.num_trades = trades;
    }

    let simulator = CondorSimulator::new(config.exit, config.valuation);
    let outcomes = SyntheticStudy::new(config.study.clone())?
        .run(&simulator)
        .context("Synthetic study failed")?;

    println!(
        "Simulated {} synthetic trades ({} held through earnings)",
        outcomes.len(),
        outcomes.iter().filter(|o| o.had_earnings).count()
    );

    if let Some(path) = output {
        write_json(path, &outcomes)?;
    }
    report_edge(&config, &outcomes, Some(report))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("condor_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    config.scoring.check_weights();

    match cli.command {
        Commands::Screen { chain, output } => {
            cmd_screen(&config, &chain, output.as_deref())?;
        }
        Commands::Backtest {
            chain,
            prices,
            output,
            report,
        } => {
            cmd_backtest(&config, &chain, &prices, output.as_deref(), report.as_deref())?;
        }
        Commands::Study {
            seed,
            trades,
            output,
            report,
        } => {
            cmd_study(config, seed, trades, output.as_deref(), &report)?;
        }
    }

    Ok(())
}
