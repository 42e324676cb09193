// Trading strategy module
pub mod cooldown;
pub mod sizing;
pub mod swing_high;

pub use cooldown::{Cooldown, CooldownBlock, PendingOrder};
pub use swing_high::{SwingHigh, SwingHighConfig};

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::execution::Broker;
use crate::models::OrderId;

/// Why an iteration ended without touching the market
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoPrice(String),
    LowCash { cash: f64, min_cash: f64 },
    Cooldown(CooldownBlock),
    InvalidSize(f64),
    Broker(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPrice(e) => write!(f, "no price: {}", e),
            SkipReason::LowCash { cash, min_cash } => write!(
                f,
                "Cash under {} USD (${:.2}), skipping trade.",
                min_cash, cash
            ),
            SkipReason::Cooldown(block) => write!(f, "cooldown: {}", block),
            SkipReason::InvalidSize(qty) => write!(f, "invalid order size {}", qty),
            SkipReason::Broker(e) => write!(f, "broker error: {}", e),
        }
    }
}

/// Result of one scheduled trading iteration
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    /// Indicators are not defined yet
    CollectingData { have: usize, need: usize },
    /// Indicators are defined but the entry rule did not fire
    NoSignal,
    /// A previously submitted order is still working
    PendingOrder { id: OrderId },
    /// A stale pending order was cancelled
    OrderCancelled { id: OrderId },
    OrderSubmitted {
        id: OrderId,
        quantity: f64,
        limit_price: f64,
    },
    Skipped(SkipReason),
}

/// A strategy driven once per scheduled tick
pub trait Strategy: Send {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Time between trading iterations
    fn sleeptime(&self) -> Duration;

    /// Run one trading iteration against the broker
    ///
    /// Failures are logged and reported as `IterationOutcome::Skipped`.
    fn on_trading_iteration(
        &mut self,
        broker: &mut dyn Broker,
        now: DateTime<Utc>,
    ) -> IterationOutcome;
}
