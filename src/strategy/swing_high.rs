use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::cooldown::Cooldown;
use super::sizing::position_size;
use super::{IterationOutcome, SkipReason, Strategy};
use crate::execution::{Broker, PriceBuffer};
use crate::indicators::{calculate_bollinger_bands, calculate_rsi, calculate_sma, BollingerBands};
use crate::models::{OrderRequest, OrderStatus};
use crate::Result;

/// RSI + Bollinger Band swing strategy
///
/// Buys the rebound after a sell-off. An entry needs, since the last order:
/// - RSI dipped below `rsi_oversold` and has recovered to it or above
/// - price dipped below the lower band and has recovered to it or above
///
/// Entries are limited to one per day and one per week (the weekly limit is
/// lifted once price is `price_drop_pct` below the last fill). Each entry is
/// a single limit buy sized from free cash and shrunk as band width grows.
/// The strategy never sells.
pub struct SwingHigh {
    config: SwingHighConfig,
    prices: PriceBuffer,
    rsi_dipped: bool,
    band_dipped: bool,
    cooldown: Cooldown,
    last_indicators: Option<IndicatorSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingHighConfig {
    /// Traded pair
    pub symbol: String,

    /// Number of prices kept in the rolling window
    pub history_len: usize,

    pub rsi_period: usize,

    /// RSI level that counts as a dip (and must be regained)
    pub rsi_oversold: f64,

    pub bb_period: usize,

    /// Band half-width in standard deviations
    pub bb_num_std: f64,

    pub sma_period: usize,

    /// No orders below this much free cash (USD)
    pub min_cash: f64,

    /// Fraction of buying power used per entry before volatility scaling
    pub base_position_pct: f64,

    /// Drop from last fill that lifts the weekly limit (e.g. 0.05 = 5%)
    pub price_drop_pct: f64,

    /// Pending orders older than this are cancelled
    pub order_timeout_minutes: i64,

    /// Minutes between trading iterations
    pub sleeptime_minutes: i64,
}

impl Default for SwingHighConfig {
    fn default() -> Self {
        Self {
            symbol: "X:BTCUSD".to_string(),
            history_len: 100,
            rsi_period: 14,
            rsi_oversold: 30.0,
            bb_period: 20,
            bb_num_std: 2.0,
            sma_period: 20,
            min_cash: 10.0,
            base_position_pct: 0.1,
            price_drop_pct: 0.05,
            order_timeout_minutes: 60, // Two iterations at the default sleeptime
            sleeptime_minutes: 30,
        }
    }
}

impl SwingHighConfig {
    /// Number of prices needed before every indicator is defined
    pub fn warmup_len(&self) -> usize {
        (self.rsi_period + 1).max(self.bb_period).max(self.sma_period)
    }

    pub fn sleeptime(&self) -> Duration {
        Duration::minutes(self.sleeptime_minutes)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::minutes(self.order_timeout_minutes)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".into());
        }
        if self.rsi_period == 0 || self.bb_period == 0 || self.sma_period == 0 {
            return Err("indicator periods must be positive".into());
        }
        if self.history_len < self.warmup_len() {
            return Err(format!(
                "history_len {} is shorter than the {} prices the indicators need",
                self.history_len,
                self.warmup_len()
            )
            .into());
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold) {
            return Err(format!("rsi_oversold must be within 0-100, got {}", self.rsi_oversold).into());
        }
        if self.bb_num_std <= 0.0 {
            return Err("bb_num_std must be positive".into());
        }
        if self.base_position_pct <= 0.0 || self.base_position_pct > 1.0 {
            return Err(format!(
                "base_position_pct must be in (0, 1], got {}",
                self.base_position_pct
            )
            .into());
        }
        if self.price_drop_pct <= 0.0 || self.price_drop_pct >= 1.0 {
            return Err(format!(
                "price_drop_pct must be in (0, 1), got {}",
                self.price_drop_pct
            )
            .into());
        }
        if self.min_cash < 0.0 {
            return Err("min_cash must not be negative".into());
        }
        if self.sleeptime_minutes <= 0 || self.order_timeout_minutes <= 0 {
            return Err("sleeptime and order timeout must be positive".into());
        }
        Ok(())
    }
}

/// Indicator values computed on one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub rsi: Option<f64>,
    pub bands: Option<BollingerBands>,
    pub sma: Option<f64>,
}

impl SwingHigh {
    pub fn new(config: SwingHighConfig) -> Self {
        Self {
            prices: PriceBuffer::new(config.history_len),
            config,
            rsi_dipped: false,
            band_dipped: false,
            cooldown: Cooldown::default(),
            last_indicators: None,
        }
    }

    pub fn config(&self) -> &SwingHighConfig {
        &self.config
    }

    pub fn prices(&self) -> &PriceBuffer {
        &self.prices
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Indicators from the most recent iteration
    pub fn last_indicators(&self) -> Option<&IndicatorSnapshot> {
        self.last_indicators.as_ref()
    }

    /// (rsi_dipped, band_dipped)
    pub fn dip_flags(&self) -> (bool, bool) {
        (self.rsi_dipped, self.band_dipped)
    }

    /// Append the price and recompute indicators over the rolling window
    fn update_indicators(&mut self, price: f64) -> IndicatorSnapshot {
        self.prices.push(price);
        let prices = self.prices.values();

        let snapshot = IndicatorSnapshot {
            price,
            rsi: calculate_rsi(prices, self.config.rsi_period),
            bands: calculate_bollinger_bands(prices, self.config.bb_period, self.config.bb_num_std),
            sma: calculate_sma(prices, self.config.sma_period),
        };

        tracing::info!("RSI: {:?}", snapshot.rsi);
        match snapshot.bands {
            Some(b) => tracing::info!(
                "Bollinger Bands - Upper: {:.2}, Middle: {:.2}, Lower: {:.2}",
                b.upper,
                b.middle,
                b.lower
            ),
            None => tracing::info!("Bollinger Bands - not enough data"),
        }
        tracing::info!("SMA: {:?}", snapshot.sma);

        self.last_indicators = Some(snapshot);
        snapshot
    }

    fn update_dip_flags(&mut self, snapshot: &IndicatorSnapshot) {
        if let Some(rsi) = snapshot.rsi {
            if rsi < self.config.rsi_oversold && !self.rsi_dipped {
                tracing::debug!("RSI dipped to {:.1}", rsi);
                self.rsi_dipped = true;
            }
        }
        if let Some(bands) = snapshot.bands {
            if snapshot.price < bands.lower && !self.band_dipped {
                tracing::debug!(
                    "Price ${:.2} dipped below lower band ${:.2}",
                    snapshot.price,
                    bands.lower
                );
                self.band_dipped = true;
            }
        }
    }

    /// Both dips seen and both thresholds regained
    fn entry_signal(&self, price: f64, rsi: f64, bands: &BollingerBands) -> bool {
        let conditions = [
            self.rsi_dipped,
            self.band_dipped,
            rsi >= self.config.rsi_oversold,
            price >= bands.lower,
        ];

        tracing::debug!(
            "Entry check: rsi_dipped={}, band_dipped={}, rsi_recovered={} ({:.1}), price_recovered={} (${:.2} vs ${:.2})",
            conditions[0],
            conditions[1],
            conditions[2],
            rsi,
            conditions[3],
            price,
            bands.lower
        );

        conditions.iter().all(|&x| x)
    }

    /// Resolve the pending order, if any
    ///
    /// Returns an outcome when the iteration must stop here.
    fn check_pending(
        &mut self,
        broker: &mut dyn Broker,
        now: DateTime<Utc>,
    ) -> Option<IterationOutcome> {
        let pending = self.cooldown.pending?;

        match broker.order_status(pending.id) {
            Ok(OrderStatus::Filled { price }) => {
                tracing::info!("✓ Order {} filled @ ${:.2}", pending.id, price);
                self.cooldown.record_fill(price);
                None
            }
            Ok(status @ (OrderStatus::Cancelled | OrderStatus::Rejected)) => {
                tracing::info!("Order {} closed without fill: {:?}", pending.id, status);
                self.cooldown.clear_pending();
                None
            }
            Ok(OrderStatus::Open) => {
                if !pending.is_expired(now, self.config.order_timeout()) {
                    tracing::info!(
                        "Order {} still open (since {})",
                        pending.id,
                        pending.submitted_at.format("%Y-%m-%d %H:%M")
                    );
                    return Some(IterationOutcome::PendingOrder { id: pending.id });
                }

                match broker.cancel_order(pending.id) {
                    Ok(()) => {
                        tracing::info!(
                            "⏱️  Cancelled order {} after {} min unfilled",
                            pending.id,
                            self.config.order_timeout_minutes
                        );
                        self.cooldown.clear_pending();
                        Some(IterationOutcome::OrderCancelled { id: pending.id })
                    }
                    Err(e) => {
                        // Pending is kept; its status is re-read next tick
                        tracing::warn!("Failed to cancel order {}: {}", pending.id, e);
                        Some(IterationOutcome::Skipped(SkipReason::Broker(e.to_string())))
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read status of order {}: {}", pending.id, e);
                Some(IterationOutcome::Skipped(SkipReason::Broker(e.to_string())))
            }
        }
    }
}

impl Default for SwingHigh {
    fn default() -> Self {
        Self::new(SwingHighConfig::default())
    }
}

impl Strategy for SwingHigh {
    fn name(&self) -> &str {
        "SwingHigh"
    }

    fn sleeptime(&self) -> Duration {
        self.config.sleeptime()
    }

    fn on_trading_iteration(
        &mut self,
        broker: &mut dyn Broker,
        now: DateTime<Utc>,
    ) -> IterationOutcome {
        let symbol = self.config.symbol.clone();

        let price = match broker.last_price(&symbol) {
            Ok(price) if price.is_finite() && price > 0.0 => price,
            Ok(price) => {
                tracing::warn!("Ignoring invalid price for {}: {}", symbol, price);
                return IterationOutcome::Skipped(SkipReason::NoPrice(format!(
                    "invalid price {}",
                    price
                )));
            }
            Err(e) => {
                tracing::warn!("No price for {}: {}", symbol, e);
                return IterationOutcome::Skipped(SkipReason::NoPrice(e.to_string()));
            }
        };

        match broker.position(&symbol) {
            Ok(quantity) => tracing::info!("Position: {:.8} {}", quantity, symbol),
            Err(e) => tracing::warn!("Position unavailable: {}", e),
        }

        let snapshot = self.update_indicators(price);
        self.update_dip_flags(&snapshot);

        if let Some(outcome) = self.check_pending(broker, now) {
            return outcome;
        }

        let cash = match broker.cash() {
            Ok(cash) => cash,
            Err(e) => {
                tracing::warn!("Cash unavailable: {}", e);
                return IterationOutcome::Skipped(SkipReason::Broker(e.to_string()));
            }
        };

        if cash < self.config.min_cash {
            let reason = SkipReason::LowCash {
                cash,
                min_cash: self.config.min_cash,
            };
            tracing::info!("{}", reason);
            return IterationOutcome::Skipped(reason);
        }

        let (rsi, bands) = match (snapshot.rsi, snapshot.bands) {
            (Some(rsi), Some(bands)) => (rsi, bands),
            _ => {
                tracing::info!(
                    "    → Collecting data... ({}/{} needed)",
                    self.prices.len(),
                    self.config.warmup_len()
                );
                return IterationOutcome::CollectingData {
                    have: self.prices.len(),
                    need: self.config.warmup_len(),
                };
            }
        };

        if !self.entry_signal(price, rsi, &bands) {
            return IterationOutcome::NoSignal;
        }

        if let Err(block) = self.cooldown.check(now, price, self.config.price_drop_pct) {
            tracing::info!("Entry signal ignored - {}", block);
            return IterationOutcome::Skipped(SkipReason::Cooldown(block));
        }

        let quantity = position_size(cash, price, self.config.base_position_pct, Some(&bands));
        if !(quantity > 0.0 && quantity.is_finite()) {
            tracing::warn!("Refusing order with size {}", quantity);
            return IterationOutcome::Skipped(SkipReason::InvalidSize(quantity));
        }

        match broker.submit_order(OrderRequest::limit_buy(symbol.clone(), quantity, price)) {
            Ok(id) => {
                tracing::info!(
                    "🎯 SWING BUY: {:.8} {} @ ${:.2} (RSI {:.1}, band width {:.3}, order {})",
                    quantity,
                    symbol,
                    price,
                    rsi,
                    bands.width(),
                    id
                );
                self.cooldown.record_order(id, now);
                self.rsi_dipped = false;
                self.band_dipped = false;

                IterationOutcome::OrderSubmitted {
                    id,
                    quantity,
                    limit_price: price,
                }
            }
            Err(e) => {
                tracing::warn!("  ✗ Failed to submit order: {}", e);
                IterationOutcome::Skipped(SkipReason::Broker(e.to_string()))
            }
        }
    }
}
