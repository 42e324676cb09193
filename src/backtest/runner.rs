use crate::backtest::data::sample_every;
use crate::backtest::metrics::{BacktestMetrics, OutcomeCounts};
use crate::execution::{FillPolicy, PaperBroker};
use crate::models::PricePoint;
use crate::strategy::Strategy;
use crate::Result;

/// Backtest runner that replays a price history through a strategy
pub struct BacktestRunner {
    initial_portfolio_value: f64,
    fill_policy: FillPolicy,
}

impl BacktestRunner {
    /// Create a new backtest runner
    pub fn new(initial_portfolio_value: f64) -> Self {
        Self {
            initial_portfolio_value,
            fill_policy: FillPolicy::default(),
        }
    }

    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }

    /// Run a backtest with given strategy and price history
    ///
    /// # Arguments
    /// * `strategy` - The trading strategy to test (its state carries over between calls)
    /// * `points` - Time-ordered prices; thinned to one per strategy sleeptime
    /// * `symbol` - Symbol the prices belong to
    ///
    /// # Returns
    /// BacktestMetrics with performance data
    pub fn run<S: Strategy + ?Sized>(
        &self,
        strategy: &mut S,
        points: &[PricePoint],
        symbol: &str,
    ) -> Result<BacktestMetrics> {
        if points.is_empty() {
            return Err("No prices to backtest".into());
        }

        let schedule = sample_every(points, strategy.sleeptime());

        tracing::info!(
            "Starting backtest: {} prices, {} iterations every {} min ({} → {})",
            points.len(),
            schedule.len(),
            strategy.sleeptime().num_minutes(),
            points[0].timestamp.format("%Y-%m-%d %H:%M"),
            points[points.len() - 1].timestamp.format("%Y-%m-%d %H:%M")
        );

        let mut broker =
            PaperBroker::new(self.initial_portfolio_value).with_fill_policy(self.fill_policy);
        let mut outcomes = OutcomeCounts::default();
        let mut equity_curve = Vec::with_capacity(schedule.len());

        // Simulate main trading loop
        for point in &schedule {
            broker.update_price(symbol, point.price, point.timestamp);

            let outcome = strategy.on_trading_iteration(&mut broker, point.timestamp);
            tracing::debug!("{} @ ${:.2}: {:?}", point.timestamp, point.price, outcome);
            outcomes.record(&outcome);

            equity_curve.push(broker.portfolio_value());
        }

        let prices: Vec<f64> = schedule.iter().map(|p| p.price).collect();
        let metrics = BacktestMetrics::from_orders(
            broker.orders(),
            &equity_curve,
            self.initial_portfolio_value,
            BacktestMetrics::benchmark_return(&prices),
            outcomes,
        );

        tracing::info!(
            "Backtest complete: {} orders ({} filled), P&L: ${:.2} ({:.2}%), buy & hold {:.2}%",
            metrics.orders_submitted,
            metrics.orders_filled,
            metrics.total_pnl,
            metrics.total_return_pct,
            metrics.benchmark_return_pct
        );

        Ok(metrics)
    }

    /// Run backtest and print report
    pub fn run_and_report<S: Strategy + ?Sized>(
        &self,
        strategy: &mut S,
        points: &[PricePoint],
        symbol: &str,
        scenario_name: &str,
    ) -> Result<BacktestMetrics> {
        println!("\n🔬 Running backtest: {}", scenario_name);
        println!("   Strategy: {}", strategy.name());
        println!("   Prices: {}", points.len());
        println!("   Initial Portfolio: ${:.2}", self.initial_portfolio_value);

        let metrics = self.run(strategy, points, symbol)?;
        metrics.print_report();

        Ok(metrics)
    }
}
