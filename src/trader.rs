use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::backtest::OutcomeCounts;
use crate::execution::{Broker, PaperBroker};
use crate::models::PricePoint;
use crate::strategy::{IterationOutcome, SkipReason, Strategy};
use crate::Result;

/// Source of the latest market price for the paper loop
pub trait PriceFeed: Send {
    fn next_price(&mut self, symbol: &str) -> impl Future<Output = Result<f64>> + Send;
}

/// Geometric random walk, for paper trading without a market data source
pub struct SyntheticFeed {
    rng: StdRng,
    price: f64,
    volatility: f64,
}

impl SyntheticFeed {
    /// # Arguments
    /// * `seed` - RNG seed for reproducibility
    /// * `start_price` - First price returned
    /// * `volatility` - Max relative move per tick (e.g. 0.01 = ±1%)
    pub fn new(seed: u64, start_price: f64, volatility: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            price: start_price,
            volatility,
        }
    }
}

impl PriceFeed for SyntheticFeed {
    async fn next_price(&mut self, _symbol: &str) -> Result<f64> {
        let current = self.price;
        let change = self.rng.gen_range(-self.volatility..=self.volatility);
        self.price = (self.price * (1.0 + change)).max(f64::MIN_POSITIVE);
        Ok(current)
    }
}

/// Plays back a recorded series, one price per tick
pub struct ReplayFeed {
    prices: std::vec::IntoIter<PricePoint>,
}

impl ReplayFeed {
    pub fn new(prices: Vec<PricePoint>) -> Self {
        Self {
            prices: prices.into_iter(),
        }
    }
}

impl PriceFeed for ReplayFeed {
    async fn next_price(&mut self, symbol: &str) -> Result<f64> {
        self.prices
            .next()
            .map(|p| p.price)
            .ok_or_else(|| format!("Replay feed for {} is exhausted", symbol).into())
    }
}

/// Next wall-clock instant that is a whole multiple of `every`
///
/// Returns `now` unchanged when it already sits on a boundary.
pub fn next_boundary(now: DateTime<Utc>, every: chrono::Duration) -> DateTime<Utc> {
    let secs = every.num_seconds();
    if secs <= 0 {
        return now;
    }

    let ts = now.timestamp();
    let rem = ts.rem_euclid(secs);
    if rem == 0 && now.timestamp_subsec_nanos() == 0 {
        return now;
    }

    DateTime::<Utc>::from_timestamp(ts - rem + secs, 0).unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct PaperOptions {
    pub symbol: String,
    /// Time between iterations
    pub interval: Duration,
    /// Start on the next wall-clock multiple of `interval`
    pub align_to_clock: bool,
    /// Stop after this many iterations (None = until Ctrl+C)
    pub max_iterations: Option<usize>,
}

/// What happened during a paper session
#[derive(Debug, Clone)]
pub struct PaperSummary {
    pub outcomes: OutcomeCounts,
    pub final_portfolio_value: f64,
}

/// Run the strategy against a paper broker until Ctrl+C or the iteration limit
pub async fn run_paper<S, F>(
    strategy: &mut S,
    broker: &mut PaperBroker,
    feed: &mut F,
    options: &PaperOptions,
) -> Result<PaperSummary>
where
    S: Strategy + ?Sized,
    F: PriceFeed,
{
    run_paper_until(strategy, broker, feed, options, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Same as `run_paper` with a caller-supplied shutdown signal
pub async fn run_paper_until<S, F, Sd>(
    strategy: &mut S,
    broker: &mut PaperBroker,
    feed: &mut F,
    options: &PaperOptions,
    shutdown: Sd,
) -> Result<PaperSummary>
where
    S: Strategy + ?Sized,
    F: PriceFeed,
    Sd: Future<Output = ()>,
{
    if options.interval.is_zero() {
        return Err("Paper loop interval must be positive".into());
    }

    let start = if options.align_to_clock {
        let every = chrono::Duration::from_std(options.interval)?;
        let now = Utc::now();
        let boundary = next_boundary(now, every);
        let delay = (boundary - now).to_std().unwrap_or_default();
        tracing::info!(
            "First iteration in {:?} at {}",
            delay,
            boundary.format("%H:%M:%S")
        );
        Instant::now() + delay
    } else {
        Instant::now()
    };

    let mut ticker = interval_at(start, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    let mut outcomes = OutcomeCounts::default();

    loop {
        if options
            .max_iterations
            .is_some_and(|max| outcomes.iterations >= max)
        {
            tracing::info!("Reached {} iterations, stopping", outcomes.iterations);
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                tracing::info!("⚠️  Received shutdown signal, stopping...");
                break;
            }
        }

        let now = Utc::now();
        tracing::info!("💹 [TRADING] Tick at {}", now.format("%H:%M:%S"));

        let outcome = match feed.next_price(&options.symbol).await {
            Ok(price) => {
                let filled = broker.update_price(&options.symbol, price, now);
                if !filled.is_empty() {
                    tracing::info!("  ✓ {} order(s) filled @ ${:.2}", filled.len(), price);
                }
                strategy.on_trading_iteration(broker, now)
            }
            Err(e) => {
                tracing::warn!("  ✗ Price fetch failed: {}", e);
                IterationOutcome::Skipped(SkipReason::NoPrice(e.to_string()))
            }
        };

        log_outcome(&outcome);
        outcomes.record(&outcome);

        tracing::info!(
            "  Portfolio: ${:.2} (cash ${:.2})",
            broker.portfolio_value(),
            broker.cash().unwrap_or_default()
        );
    }

    Ok(PaperSummary {
        final_portfolio_value: broker.portfolio_value(),
        outcomes,
    })
}

fn log_outcome(outcome: &IterationOutcome) {
    match outcome {
        IterationOutcome::CollectingData { have, need } => {
            tracing::info!("  → Collecting data ({}/{})", have, need)
        }
        IterationOutcome::NoSignal => tracing::info!("  → No signal"),
        IterationOutcome::PendingOrder { id } => tracing::info!("  → Waiting on order {}", id),
        IterationOutcome::OrderCancelled { id } => tracing::info!("  → Cancelled order {}", id),
        IterationOutcome::OrderSubmitted {
            id,
            quantity,
            limit_price,
        } => tracing::info!(
            "  → Submitted order {}: {:.8} @ ${:.2}",
            id,
            quantity,
            limit_price
        ),
        IterationOutcome::Skipped(reason) => tracing::info!("  → Skipped: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SwingHigh;
    use chrono::TimeZone;

    const SYMBOL: &str = "X:BTCUSD";

    fn options(max_iterations: Option<usize>) -> PaperOptions {
        PaperOptions {
            symbol: SYMBOL.to_string(),
            interval: Duration::from_millis(1),
            align_to_clock: false,
            max_iterations,
        }
    }

    fn replay(prices: &[f64]) -> ReplayFeed {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        ReplayFeed::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PricePoint::new(start + chrono::Duration::minutes(30 * i as i64), p))
                .collect(),
        )
    }

    #[test]
    fn test_next_boundary() {
        let every = chrono::Duration::minutes(30);

        let now = Utc.with_ymd_and_hms(2025, 1, 6, 10, 7, 42).unwrap();
        assert_eq!(
            next_boundary(now, every),
            Utc.with_ymd_and_hms(2025, 1, 6, 10, 30, 0).unwrap()
        );

        let late = Utc.with_ymd_and_hms(2025, 1, 6, 23, 45, 0).unwrap();
        assert_eq!(
            next_boundary(late, every),
            Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap()
        );

        let on_boundary = Utc.with_ymd_and_hms(2025, 1, 6, 11, 0, 0).unwrap();
        assert_eq!(next_boundary(on_boundary, every), on_boundary);

        let five = chrono::Duration::minutes(5);
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 10, 7, 42).unwrap();
        assert_eq!(
            next_boundary(now, five),
            Utc.with_ymd_and_hms(2025, 1, 6, 10, 10, 0).unwrap()
        );
    }

    #[test]
    fn test_synthetic_feed_walks() {
        let mut feed = SyntheticFeed::new(42, 100.0, 0.01);

        let first = tokio_test::block_on(feed.next_price(SYMBOL)).unwrap();
        let second = tokio_test::block_on(feed.next_price(SYMBOL)).unwrap();

        assert_eq!(first, 100.0);
        assert!(second > 0.0);
        assert!((second - first).abs() <= 1.0 + 1e-9);
    }

    #[tokio::test]
    async fn test_paper_loop_stops_after_iterations() {
        let mut strategy = SwingHigh::default();
        let mut broker = PaperBroker::new(1000.0);
        let mut feed = SyntheticFeed::new(7, 95_000.0, 0.002);

        let summary = run_paper_until(
            &mut strategy,
            &mut broker,
            &mut feed,
            &options(Some(5)),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcomes.iterations, 5);
        assert_eq!(summary.outcomes.collecting_data, 5);
        assert_eq!(strategy.prices().len(), 5);
    }

    #[tokio::test]
    async fn test_paper_loop_trades_replayed_dip() {
        let mut prices = vec![100.0; 25];
        prices.extend([90.0, 100.0]);

        let mut strategy = SwingHigh::default();
        let mut broker = PaperBroker::new(1000.0);
        let mut feed = replay(&prices);

        let summary = run_paper_until(
            &mut strategy,
            &mut broker,
            &mut feed,
            &options(Some(prices.len())),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcomes.submitted, 1);
        assert!(broker.position(SYMBOL).unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_feed_errors_skip_iteration() {
        let mut strategy = SwingHigh::default();
        let mut broker = PaperBroker::new(1000.0);
        let mut feed = replay(&[100.0, 101.0]);

        let summary = run_paper_until(
            &mut strategy,
            &mut broker,
            &mut feed,
            &options(Some(4)),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcomes.iterations, 4);
        assert_eq!(summary.outcomes.skipped_other, 2);
        // Stale marks are not fed to the indicators
        assert_eq!(strategy.prices().len(), 2);
    }

    #[tokio::test]
    async fn test_paper_loop_stops_on_shutdown() {
        let mut strategy = SwingHigh::default();
        let mut broker = PaperBroker::new(1000.0);
        let mut feed = SyntheticFeed::new(1, 100.0, 0.01);

        let summary = run_paper_until(
            &mut strategy,
            &mut broker,
            &mut feed,
            &options(None),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap();

        assert!(summary.outcomes.iterations >= 1);
        assert!(summary.final_portfolio_value > 0.0);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let mut strategy = SwingHigh::default();
        let mut broker = PaperBroker::new(1000.0);
        let mut feed = SyntheticFeed::new(1, 100.0, 0.01);
        let mut opts = options(Some(1));
        opts.interval = Duration::ZERO;

        let result =
            run_paper_until(&mut strategy, &mut broker, &mut feed, &opts, std::future::pending())
                .await;
        assert!(result.is_err());
    }
}
