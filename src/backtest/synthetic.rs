use crate::models::PricePoint;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with noise (-2% daily average)
    Downtrend,
    /// Sideways/choppy market (±1% around mean)
    Sideways,
    /// High volatility (±3% swings)
    Volatile,
    /// Calm market broken by sharp sell-offs that rebound toward the mean
    DipAndRecovery,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 5] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
        MarketScenario::DipAndRecovery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MarketScenario::Uptrend => "uptrend",
            MarketScenario::Downtrend => "downtrend",
            MarketScenario::Sideways => "sideways",
            MarketScenario::Volatile => "volatile",
            MarketScenario::DipAndRecovery => "dip_and_recovery",
        }
    }
}

impl fmt::Display for MarketScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarketScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        MarketScenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = MarketScenario::ALL.iter().map(|s| s.name()).collect();
                format!("Unknown scenario '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

// DipAndRecovery shape, in iterations
const DIP_CYCLE_LEN: usize = 96;
const DIP_START: usize = 84;
const DIP_BARS: usize = 3;
const DIP_STEP: f64 = 0.04; // -4% per bar while selling off
const REBOUND_PULL: f64 = 0.3; // share of the gap to the mean closed per bar

/// Generates synthetic price data for backtesting
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 95_000.0,
        }
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Generate prices ending now
    ///
    /// # Arguments
    /// * `scenario` - The market scenario to simulate
    /// * `num_points` - Number of prices to generate
    /// * `interval_minutes` - Minutes between prices
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_points: usize,
        interval_minutes: i64,
    ) -> Vec<PricePoint> {
        let start_time = Utc::now() - Duration::minutes(num_points as i64 * interval_minutes);
        self.generate_from(start_time, scenario, num_points, interval_minutes)
    }

    /// Generate prices starting at `start_time`
    pub fn generate_from(
        &mut self,
        start_time: DateTime<Utc>,
        scenario: MarketScenario,
        num_points: usize,
        interval_minutes: i64,
    ) -> Vec<PricePoint> {
        let mut points = Vec::with_capacity(num_points);
        let mut current_price = self.base_price;
        let intervals_per_day = 24.0 * 60.0 / interval_minutes as f64;

        for i in 0..num_points {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);
            current_price = self.step(scenario, i, current_price, intervals_per_day);
            points.push(PricePoint::new(timestamp, current_price));
        }

        points
    }

    /// Next price for a scenario
    fn step(
        &mut self,
        scenario: MarketScenario,
        i: usize,
        current_price: f64,
        intervals_per_day: f64,
    ) -> f64 {
        let mean_price = self.base_price;

        let next = match scenario {
            MarketScenario::Uptrend => {
                let drift = current_price * 0.02 / intervals_per_day;
                let noise = current_price * self.rng.gen_range(-0.001..0.001);
                current_price + drift + noise
            }
            MarketScenario::Downtrend => {
                let drift = current_price * -0.02 / intervals_per_day;
                let noise = current_price * self.rng.gen_range(-0.001..0.001);
                current_price + drift + noise
            }
            MarketScenario::Sideways => {
                let reversion = (mean_price - current_price) * 0.1; // 10% pull to mean
                let noise = current_price * self.rng.gen_range(-0.01..0.01);
                current_price + reversion + noise
            }
            MarketScenario::Volatile => {
                current_price + current_price * self.rng.gen_range(-0.03..0.03)
            }
            MarketScenario::DipAndRecovery => {
                let phase = i % DIP_CYCLE_LEN;
                if phase < DIP_START {
                    let reversion = (mean_price - current_price) * 0.1;
                    let noise = current_price * self.rng.gen_range(-0.003..0.003);
                    current_price + reversion + noise
                } else if phase < DIP_START + DIP_BARS {
                    current_price * (1.0 - DIP_STEP)
                } else {
                    let pull = (mean_price - current_price) * REBOUND_PULL;
                    let noise = current_price * self.rng.gen_range(-0.002..0.002);
                    current_price + pull + noise
                }
            }
        };

        // Prevent price from going too low
        next.max(self.base_price * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uptrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let points = gen.generate(MarketScenario::Uptrend, 500, 30);

        assert_eq!(points.len(), 500);

        let first_price = points.first().unwrap().price;
        let last_price = points.last().unwrap().price;

        assert!(
            last_price > first_price,
            "Uptrend should end higher: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_downtrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let points = gen.generate(MarketScenario::Downtrend, 500, 30);

        let first_price = points.first().unwrap().price;
        let last_price = points.last().unwrap().price;

        assert!(
            last_price < first_price,
            "Downtrend should end lower: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_sideways() {
        let mut gen = SyntheticDataGenerator::new(42);
        let points = gen.generate(MarketScenario::Sideways, 500, 30);

        // Should stay roughly around base price (±10%)
        let base = gen.base_price();
        for point in &points {
            assert!(
                point.price > base * 0.9 && point.price < base * 1.1,
                "Sideways should stay near base: {} vs {}",
                point.price,
                base
            );
        }
    }

    #[test]
    fn test_dip_and_recovery_shape() {
        let mut gen = SyntheticDataGenerator::new(7);
        let points = gen.generate(MarketScenario::DipAndRecovery, DIP_CYCLE_LEN, 30);
        let base = gen.base_price();

        let calm_low = points[..DIP_START]
            .iter()
            .map(|p| p.price)
            .fold(f64::INFINITY, f64::min);
        let trough = points[DIP_START + DIP_BARS - 1].price;
        let last = points.last().unwrap().price;

        assert!(calm_low > base * 0.95, "calm phase drifted: {}", calm_low);
        assert!(trough < base * 0.9, "sell-off too shallow: {}", trough);
        assert!(last > trough * 1.05, "no rebound: {} -> {}", trough, last);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let start = Utc::now();
        let a = SyntheticDataGenerator::new(99).generate_from(start, MarketScenario::Volatile, 200, 30);
        let b = SyntheticDataGenerator::new(99).generate_from(start, MarketScenario::Volatile, 200, 30);
        let c = SyntheticDataGenerator::new(100).generate_from(start, MarketScenario::Volatile, 200, 30);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_timestamps_are_sequential() {
        let mut gen = SyntheticDataGenerator::new(42);
        let points = gen.generate(MarketScenario::Volatile, 100, 30);

        for pair in points.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(30));
        }
        assert!(points.iter().all(|p| p.price > 0.0));
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!("uptrend".parse::<MarketScenario>(), Ok(MarketScenario::Uptrend));
        assert_eq!(
            "Dip-And-Recovery".parse::<MarketScenario>(),
            Ok(MarketScenario::DipAndRecovery)
        );
        assert!("moon".parse::<MarketScenario>().is_err());
    }
}
