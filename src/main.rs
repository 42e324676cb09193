use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swinghigh::backtest::{
    filter_range, load_prices, BacktestRunner, MarketScenario, SyntheticDataGenerator,
};
use swinghigh::config::Settings;
use swinghigh::execution::PaperBroker;
use swinghigh::trader::{run_paper, PaperOptions, SyntheticFeed};
use swinghigh::{PricePoint, Strategy, SwingHigh};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swinghigh")]
#[command(about = "RSI + Bollinger Band swing trading bot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (default: ./swinghigh.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a price history through the strategy
    Backtest {
        /// JSON file of {timestamp, price} points
        #[arg(long, conflicts_with = "scenario")]
        prices: Option<PathBuf>,

        /// Synthetic scenario (uptrend, downtrend, sideways, volatile, dip_and_recovery)
        #[arg(long)]
        scenario: Option<MarketScenario>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Starting cash in USD
        #[arg(long)]
        budget: Option<f64>,

        /// Seed for synthetic data
        #[arg(long)]
        seed: Option<u64>,

        /// Print metrics as JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Trade a synthetic price feed with a paper broker
    Paper {
        /// Stop after this many iterations
        #[arg(long)]
        iterations: Option<usize>,

        /// Seconds between iterations (default: strategy sleeptime, clock-aligned)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    setup_logging(&settings.log_filter.0);

    match cli.command {
        Commands::Backtest {
            prices,
            scenario,
            start,
            end,
            budget,
            seed,
            json,
        } => {
            if let Some(start) = start {
                settings.backtest.start = Some(start);
            }
            if let Some(end) = end {
                settings.backtest.end = Some(end);
            }
            if let Some(budget) = budget {
                settings.backtest.budget = budget;
            }
            if let Some(seed) = seed {
                settings.backtest.seed = seed;
            }
            settings.validate()?;

            run_backtest(&settings, prices, scenario, json)
        }
        Commands::Paper {
            iterations,
            interval_secs,
        } => run_paper_session(&settings, iterations, interval_secs).await,
    }
}

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_backtest(
    settings: &Settings,
    prices: Option<PathBuf>,
    scenario: Option<MarketScenario>,
    json: bool,
) -> Result<()> {
    let mut strategy = SwingHigh::new(settings.strategy.clone());
    let backtest = &settings.backtest;

    let (points, name) = match prices {
        Some(path) => {
            let all = load_prices(&path)
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("Failed to load prices from {}", path.display()))?;
            let points = filter_range(&all, backtest.start, backtest.end);
            if points.is_empty() {
                bail!(
                    "No prices in {} between {:?} and {:?} ({} outside the range)",
                    path.display(),
                    backtest.start,
                    backtest.end,
                    all.len()
                );
            }
            (points, path.display().to_string())
        }
        None => {
            let scenario = scenario.unwrap_or(MarketScenario::DipAndRecovery);
            (synthetic_points(settings, scenario, &strategy), scenario.to_string())
        }
    };

    let runner = BacktestRunner::new(backtest.budget).with_fill_policy(backtest.fill_policy);
    let symbol = settings.strategy.symbol.clone();

    if json {
        let metrics = runner
            .run(&mut strategy, &points, &symbol)
            .map_err(|e| anyhow!(e))?;
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        runner
            .run_and_report(&mut strategy, &points, &symbol, &name)
            .map_err(|e| anyhow!(e))?;
    }

    Ok(())
}

/// One synthetic price per sleeptime across the configured date range
fn synthetic_points(
    settings: &Settings,
    scenario: MarketScenario,
    strategy: &SwingHigh,
) -> Vec<PricePoint> {
    let backtest = &settings.backtest;
    let interval_minutes = strategy.sleeptime().num_minutes().max(1);

    let start_day = backtest.start.unwrap_or_else(|| Utc::now().date_naive());
    let end_day = backtest.end.unwrap_or(start_day);
    let days = (end_day - start_day).num_days() + 1;
    let num_points = (days * 24 * 60 / interval_minutes).max(1) as usize;

    let start = Utc.from_utc_datetime(&start_day.and_time(chrono::NaiveTime::default()));

    SyntheticDataGenerator::new(backtest.seed).generate_from(
        start,
        scenario,
        num_points,
        interval_minutes,
    )
}

async fn run_paper_session(
    settings: &Settings,
    iterations: Option<usize>,
    interval_secs: Option<u64>,
) -> Result<()> {
    let mut strategy = SwingHigh::new(settings.strategy.clone());
    let mut broker = PaperBroker::new(settings.paper.budget);
    let mut feed = SyntheticFeed::new(
        settings.paper.seed,
        settings.paper.start_price,
        settings.paper.volatility,
    );

    let interval = match interval_secs {
        Some(0) => bail!("--interval-secs must be positive"),
        Some(secs) => std::time::Duration::from_secs(secs),
        None => strategy
            .sleeptime()
            .to_std()
            .context("Strategy sleeptime must be positive")?,
    };

    let options = PaperOptions {
        symbol: settings.strategy.symbol.clone(),
        interval,
        align_to_clock: interval_secs.is_none(),
        max_iterations: iterations,
    };

    tracing::info!("🚀 {} paper trading starting", strategy.name());
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Symbol: {}", options.symbol);
    tracing::info!("  Budget: ${:.2}", settings.paper.budget);
    tracing::info!("  Interval: {:?}", options.interval);
    tracing::info!(
        "  RSI({}) < {} | BB({}, {}σ) | min cash ${:.2}",
        settings.strategy.rsi_period,
        settings.strategy.rsi_oversold,
        settings.strategy.bb_period,
        settings.strategy.bb_num_std,
        settings.strategy.min_cash
    );
    tracing::info!("\nPress Ctrl+C to stop...\n");

    let summary = run_paper(&mut strategy, &mut broker, &mut feed, &options)
        .await
        .map_err(|e| anyhow!(e))?;

    tracing::info!(
        "👋 Stopped after {} iterations: {} orders submitted, portfolio ${:.2}",
        summary.outcomes.iterations,
        summary.outcomes.submitted,
        summary.final_portfolio_value
    );

    if let Some(last) = strategy.last_indicators() {
        tracing::info!(
            "📊 Last tick: ${:.2} | RSI {:?} | lower band {:?}",
            last.price,
            last.rsi,
            last.bands.map(|b| b.lower)
        );
    }

    Ok(())
}
