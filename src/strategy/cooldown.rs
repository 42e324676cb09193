use chrono::{DateTime, Datelike, Duration, IsoWeek, NaiveDate, Utc};
use std::fmt;

use crate::models::OrderId;

/// Why the cooldown rules refused a new order
#[derive(Debug, Clone, PartialEq)]
pub enum CooldownBlock {
    /// Already traded on this calendar day
    TradedToday(NaiveDate),
    /// Already traded this ISO week and price has not dropped far enough
    TradedThisWeek {
        last_fill_price: Option<f64>,
        required_price: Option<f64>,
    },
}

impl fmt::Display for CooldownBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CooldownBlock::TradedToday(date) => write!(f, "already traded on {}", date),
            CooldownBlock::TradedThisWeek {
                required_price: Some(required),
                ..
            } => write!(
                f,
                "already traded this week (needs price <= ${:.2} to re-enter)",
                required
            ),
            CooldownBlock::TradedThisWeek { .. } => {
                write!(f, "already traded this week (no fill price yet)")
            }
        }
    }
}

/// Order submitted but not yet resolved by the broker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOrder {
    pub id: OrderId,
    pub submitted_at: DateTime<Utc>,
}

impl PendingOrder {
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.submitted_at > timeout
    }
}

/// Trade frequency limits carried between iterations
///
/// - one order per calendar day (UTC)
/// - one order per ISO week, unless price fell `price_drop_pct` below the last fill
/// - at most one pending order at a time
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    pub last_trade_date: Option<NaiveDate>,
    pub last_trade_week: Option<IsoWeek>,
    /// Fill price of the most recent order, cleared when a new one is placed
    pub last_fill_price: Option<f64>,
    pub pending: Option<PendingOrder>,
}

impl Cooldown {
    /// Check whether a new order may be placed at `price`
    pub fn check(
        &self,
        now: DateTime<Utc>,
        price: f64,
        price_drop_pct: f64,
    ) -> Result<(), CooldownBlock> {
        let today = now.date_naive();
        if self.last_trade_date == Some(today) {
            return Err(CooldownBlock::TradedToday(today));
        }

        if self.last_trade_week == Some(now.iso_week()) {
            let required_price = self.last_fill_price.map(|p| p * (1.0 - price_drop_pct));
            let dropped_enough = required_price.is_some_and(|required| price <= required);

            if !dropped_enough {
                return Err(CooldownBlock::TradedThisWeek {
                    last_fill_price: self.last_fill_price,
                    required_price,
                });
            }

            tracing::info!(
                "Weekly cap relaxed: price ${:.2} is {:.1}%+ below last fill ${:.2}",
                price,
                price_drop_pct * 100.0,
                self.last_fill_price.unwrap_or_default()
            );
        }

        Ok(())
    }

    /// Record a submitted order
    pub fn record_order(&mut self, id: OrderId, now: DateTime<Utc>) {
        self.last_trade_date = Some(now.date_naive());
        self.last_trade_week = Some(now.iso_week());
        // Only this order's own fill may relax its week
        self.last_fill_price = None;
        self.pending = Some(PendingOrder {
            id,
            submitted_at: now,
        });
    }

    /// Record the fill of the pending order
    pub fn record_fill(&mut self, price: f64) {
        self.last_fill_price = Some(price);
        self.pending = None;
    }

    /// Forget the pending order (cancelled, rejected or timed out)
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}
