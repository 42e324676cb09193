use chrono::{TimeZone, Utc};
use swinghigh::backtest::{BacktestMetrics, BacktestRunner, MarketScenario, SyntheticDataGenerator};
use swinghigh::{Result, SwingHigh, SwingHighConfig};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("swinghigh=warn")
        .init();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║          SWINGHIGH BACKTESTING SUITE                  ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    // Configuration
    let initial_portfolio_value = 100.0;
    let config = SwingHighConfig::default();
    let runner = BacktestRunner::new(initial_portfolio_value);

    // Jan 2 - Feb 28, one price per 30 minutes
    let start = Utc
        .with_ymd_and_hms(2025, 1, 2, 0, 0, 0)
        .single()
        .ok_or("invalid start date")?;
    let num_points = 58 * 48;

    let scenarios = vec![
        (MarketScenario::Uptrend, "📈 Uptrend (+2% daily)"),
        (MarketScenario::Downtrend, "📉 Downtrend (-2% daily)"),
        (MarketScenario::Sideways, "↔️  Sideways (mean-reverting)"),
        (MarketScenario::Volatile, "⚡ Volatile (±3% swings)"),
        (MarketScenario::DipAndRecovery, "🎢 Dip & Recovery"),
    ];

    let mut all_metrics = Vec::new();

    for (scenario, name) in scenarios {
        // Generate synthetic data
        let mut generator = SyntheticDataGenerator::new(42);
        let points = generator.generate_from(start, scenario, num_points, 30);

        // Fresh strategy state per scenario
        let mut strategy = SwingHigh::new(config.clone());

        match runner.run_and_report(&mut strategy, &points, &config.symbol, name) {
            Ok(metrics) => {
                all_metrics.push((name.to_string(), metrics));
            }
            Err(e) => {
                eprintln!("❌ Backtest failed for {}: {}", name, e);
            }
        }
    }

    // Summary comparison
    print_summary_comparison(&all_metrics);

    Ok(())
}

fn print_summary_comparison(results: &[(String, BacktestMetrics)]) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║              SCENARIO COMPARISON                      ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!(
        "{:<30} {:>9} {:>9} {:>9} {:>7} {:>7}",
        "Scenario", "Return%", "B&H%", "MaxDD%", "Orders", "Filled"
    );
    println!("{}", "─".repeat(76));

    for (name, metrics) in results {
        println!(
            "{:<30} {:>9.2} {:>9.2} {:>9.2} {:>7} {:>7}",
            name,
            metrics.total_return_pct,
            metrics.benchmark_return_pct,
            metrics.max_drawdown_pct,
            metrics.orders_submitted,
            metrics.orders_filled
        );
    }

    println!("\n");

    // Find best/worst relative to buy & hold
    if let Some((best_name, best_metrics)) = results
        .iter()
        .max_by(|a, b| a.1.excess_return_pct().total_cmp(&b.1.excess_return_pct()))
    {
        println!(
            "🏆 Best vs Buy & Hold: {} ({:+.2} pts)",
            best_name,
            best_metrics.excess_return_pct()
        );
    }

    if let Some((worst_name, worst_metrics)) = results
        .iter()
        .min_by(|a, b| a.1.excess_return_pct().total_cmp(&b.1.excess_return_pct()))
    {
        println!(
            "⚠️  Worst vs Buy & Hold: {} ({:+.2} pts)",
            worst_name,
            worst_metrics.excess_return_pct()
        );
    }

    // Overall statistics
    let total_orders: usize = results.iter().map(|(_, m)| m.orders_submitted).sum();
    let total_cooldown: usize = results.iter().map(|(_, m)| m.outcomes.skipped_cooldown).sum();

    println!("\n📊 Overall Statistics:");
    println!("   Orders Across All Scenarios: {}", total_orders);
    println!("   Signals Blocked by Cooldown: {}", total_cooldown);

    println!("\n═══════════════════════════════════════════════════════\n");
}
