use crate::models::{Order, OrderStatus};
use crate::strategy::{IterationOutcome, SkipReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a single filled buy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub submitted_at: DateTime<Utc>,
    pub filled_at: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    pub cost: f64,
}

impl FillRecord {
    pub fn from_order(order: &Order) -> Option<Self> {
        match (order.status, order.filled_at) {
            (OrderStatus::Filled { price }, Some(filled_at)) => Some(Self {
                submitted_at: order.submitted_at,
                filled_at,
                price,
                quantity: order.request.quantity,
                cost: price * order.request.quantity,
            }),
            _ => None,
        }
    }
}

/// How each iteration of a run ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub iterations: usize,
    pub collecting_data: usize,
    pub no_signal: usize,
    pub pending: usize,
    pub submitted: usize,
    pub cancelled: usize,
    pub skipped_low_cash: usize,
    pub skipped_cooldown: usize,
    pub skipped_other: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &IterationOutcome) {
        self.iterations += 1;
        match outcome {
            IterationOutcome::CollectingData { .. } => self.collecting_data += 1,
            IterationOutcome::NoSignal => self.no_signal += 1,
            IterationOutcome::PendingOrder { .. } => self.pending += 1,
            IterationOutcome::OrderSubmitted { .. } => self.submitted += 1,
            IterationOutcome::OrderCancelled { .. } => self.cancelled += 1,
            IterationOutcome::Skipped(SkipReason::LowCash { .. }) => self.skipped_low_cash += 1,
            IterationOutcome::Skipped(SkipReason::Cooldown(_)) => self.skipped_cooldown += 1,
            IterationOutcome::Skipped(_) => self.skipped_other += 1,
        }
    }
}

/// Complete backtest performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // P&L Metrics
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub initial_portfolio_value: f64,
    pub final_portfolio_value: f64,

    /// Return of buying the whole budget at the first price and holding
    pub benchmark_return_pct: f64,

    // Order Statistics
    pub orders_submitted: usize,
    pub orders_filled: usize,
    pub orders_cancelled: usize,
    pub orders_rejected: usize,

    // Position
    pub position_quantity: f64,
    pub avg_fill_price: Option<f64>,
    pub total_invested: f64,

    // Risk Metrics
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    pub outcomes: OutcomeCounts,

    pub fills: Vec<FillRecord>,
}

impl BacktestMetrics {
    /// Calculate metrics from the broker's order book and the equity curve
    ///
    /// # Arguments
    /// * `orders` - Every order submitted during the run
    /// * `equity_curve` - Portfolio value after each iteration
    /// * `initial_portfolio_value` - Starting cash
    /// * `benchmark_return_pct` - Buy-and-hold return over the same prices
    /// * `outcomes` - Per-iteration outcome tallies
    pub fn from_orders(
        orders: &[Order],
        equity_curve: &[f64],
        initial_portfolio_value: f64,
        benchmark_return_pct: f64,
        outcomes: OutcomeCounts,
    ) -> Self {
        let fills: Vec<FillRecord> = orders.iter().filter_map(FillRecord::from_order).collect();

        let final_portfolio_value = equity_curve
            .last()
            .copied()
            .unwrap_or(initial_portfolio_value);
        let total_pnl = final_portfolio_value - initial_portfolio_value;
        let total_return_pct = if initial_portfolio_value > 0.0 {
            (total_pnl / initial_portfolio_value) * 100.0
        } else {
            0.0
        };

        let position_quantity: f64 = fills.iter().map(|f| f.quantity).sum();
        let total_invested: f64 = fills.iter().map(|f| f.cost).sum();
        let avg_fill_price = if position_quantity > 0.0 {
            Some(total_invested / position_quantity)
        } else {
            None
        };

        let count = |wanted: fn(&OrderStatus) -> bool| {
            orders.iter().filter(|o| wanted(&o.status)).count()
        };

        let (max_drawdown, max_drawdown_pct) =
            Self::calculate_drawdown(equity_curve, initial_portfolio_value);

        Self {
            total_pnl,
            total_return_pct,
            initial_portfolio_value,
            final_portfolio_value,
            benchmark_return_pct,
            orders_submitted: orders.len(),
            orders_filled: fills.len(),
            orders_cancelled: count(|s| *s == OrderStatus::Cancelled),
            orders_rejected: count(|s| *s == OrderStatus::Rejected),
            position_quantity,
            avg_fill_price,
            total_invested,
            max_drawdown,
            max_drawdown_pct,
            outcomes,
            fills,
        }
    }

    /// Buy-and-hold return in percent between the first and last price
    pub fn benchmark_return(prices: &[f64]) -> f64 {
        match (prices.first(), prices.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => ((last - first) / first) * 100.0,
            _ => 0.0,
        }
    }

    /// Maximum peak-to-trough decline of the equity curve
    fn calculate_drawdown(equity_curve: &[f64], initial_value: f64) -> (f64, f64) {
        let mut peak = initial_value;
        let mut max_dd = 0.0;
        let mut max_dd_pct = 0.0;

        for &value in equity_curve {
            if value > peak {
                peak = value;
            }

            let drawdown = peak - value;
            if drawdown > max_dd {
                max_dd = drawdown;
                max_dd_pct = if peak > 0.0 { (drawdown / peak) * 100.0 } else { 0.0 };
            }
        }

        (max_dd, max_dd_pct)
    }

    /// Strategy return minus buy-and-hold return, in percentage points
    pub fn excess_return_pct(&self) -> f64 {
        self.total_return_pct - self.benchmark_return_pct
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║              BACKTEST PERFORMANCE REPORT              ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        println!("📊 P&L SUMMARY");
        println!(
            "  Initial Portfolio:     ${:.2}",
            self.initial_portfolio_value
        );
        println!(
            "  Final Portfolio:       ${:.2}",
            self.final_portfolio_value
        );
        println!(
            "  P&L:                   ${:.2} ({:+.2}%)",
            self.total_pnl, self.total_return_pct
        );
        println!(
            "  Buy & Hold:            {:+.2}% (excess {:+.2} pts)",
            self.benchmark_return_pct,
            self.excess_return_pct()
        );

        println!("\n📈 ORDERS");
        println!("  Submitted:             {}", self.orders_submitted);
        println!("  Filled:                {}", self.orders_filled);
        println!("  Cancelled (timeout):   {}", self.orders_cancelled);
        if self.orders_rejected > 0 {
            println!("  Rejected:              {}", self.orders_rejected);
        }

        if let Some(avg) = self.avg_fill_price {
            println!("\n💰 POSITION");
            println!("  Quantity:              {:.8}", self.position_quantity);
            println!("  Invested:              ${:.2}", self.total_invested);
            println!("  Average Fill:          ${:.2}", avg);
        }

        println!("\n⚠️  RISK METRICS");
        println!(
            "  Max Drawdown:          ${:.2} ({:.2}%)",
            self.max_drawdown, self.max_drawdown_pct
        );

        println!("\n⏱️  ITERATIONS");
        println!("  Total:                 {}", self.outcomes.iterations);
        println!("  Collecting Data:       {}", self.outcomes.collecting_data);
        println!("  No Signal:             {}", self.outcomes.no_signal);
        println!("  Pending Order:         {}", self.outcomes.pending);
        println!("  Skipped (low cash):    {}", self.outcomes.skipped_low_cash);
        println!("  Skipped (cooldown):    {}", self.outcomes.skipped_cooldown);
        println!("  Skipped (other):       {}", self.outcomes.skipped_other);

        println!("\n═══════════════════════════════════════════════════════\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderRequest;
    use crate::strategy::CooldownBlock;
    use chrono::NaiveDate;

    fn order(status: OrderStatus, quantity: f64, limit: f64) -> Order {
        let submitted_at = Utc::now();
        Order {
            id: uuid::Uuid::new_v4(),
            request: OrderRequest::limit_buy("X:BTCUSD", quantity, limit),
            status,
            submitted_at,
            filled_at: match status {
                OrderStatus::Filled { .. } => Some(submitted_at),
                _ => None,
            },
        }
    }

    #[test]
    fn test_metrics_from_orders() {
        let orders = vec![
            order(OrderStatus::Filled { price: 100.0 }, 1.0, 100.0),
            order(OrderStatus::Cancelled, 1.0, 95.0),
            order(OrderStatus::Filled { price: 80.0 }, 0.5, 80.0),
        ];
        let equity = vec![1000.0, 1010.0, 990.0, 1030.0];

        let metrics =
            BacktestMetrics::from_orders(&orders, &equity, 1000.0, 5.0, OutcomeCounts::default());

        assert_eq!(metrics.orders_submitted, 3);
        assert_eq!(metrics.orders_filled, 2);
        assert_eq!(metrics.orders_cancelled, 1);
        assert!((metrics.position_quantity - 1.5).abs() < 1e-12);
        assert!((metrics.total_invested - 140.0).abs() < 1e-9);
        // (100 + 40) / 1.5
        assert!((metrics.avg_fill_price.unwrap() - 93.3333).abs() < 1e-3);
        assert!((metrics.total_return_pct - 3.0).abs() < 1e-9);
        assert!((metrics.excess_return_pct() - -2.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_with_no_orders() {
        let metrics = BacktestMetrics::from_orders(&[], &[], 100.0, 0.0, OutcomeCounts::default());

        assert_eq!(metrics.orders_submitted, 0);
        assert_eq!(metrics.avg_fill_price, None);
        assert_eq!(metrics.final_portfolio_value, 100.0);
        assert_eq!(metrics.total_pnl, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn test_drawdown_calculation() {
        // Peak at 1100, trough at 880
        let equity = vec![1000.0, 1100.0, 990.0, 880.0, 1050.0];

        let (dd, dd_pct) = BacktestMetrics::calculate_drawdown(&equity, 1000.0);

        assert!((dd - 220.0).abs() < 1e-9);
        assert!((dd_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_benchmark_return() {
        assert!((BacktestMetrics::benchmark_return(&[100.0, 90.0, 110.0]) - 10.0).abs() < 1e-9);
        assert_eq!(BacktestMetrics::benchmark_return(&[]), 0.0);
    }

    #[test]
    fn test_outcome_counts() {
        let mut counts = OutcomeCounts::default();
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

        counts.record(&IterationOutcome::CollectingData { have: 1, need: 20 });
        counts.record(&IterationOutcome::NoSignal);
        counts.record(&IterationOutcome::Skipped(SkipReason::LowCash {
            cash: 5.0,
            min_cash: 10.0,
        }));
        counts.record(&IterationOutcome::Skipped(SkipReason::Cooldown(
            CooldownBlock::TradedToday(day),
        )));
        counts.record(&IterationOutcome::Skipped(SkipReason::NoPrice("down".into())));

        assert_eq!(counts.iterations, 5);
        assert_eq!(counts.collecting_data, 1);
        assert_eq!(counts.no_signal, 1);
        assert_eq!(counts.skipped_low_cash, 1);
        assert_eq!(counts.skipped_cooldown, 1);
        assert_eq!(counts.skipped_other, 1);
    }
}
