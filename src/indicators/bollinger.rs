use serde::{Deserialize, Serialize};

use super::moving_average::calculate_sma;

/// Bollinger Band envelope around the trailing SMA
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Relative band width: (upper - lower) / middle
    ///
    /// Used as a volatility proxy. Returns 0.0 when the middle band is zero.
    pub fn width(&self) -> f64 {
        if self.middle == 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle
    }
}

/// Calculate Bollinger Bands over the trailing `period` prices
///
/// Middle band is the SMA, half-width is `num_std` times the population
/// standard deviation of the same window.
pub fn calculate_bollinger_bands(
    prices: &[f64],
    period: usize,
    num_std: f64,
) -> Option<BollingerBands> {
    let middle = calculate_sma(prices, period)?;

    let window = &prices[prices.len() - period..];
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let half_width = num_std * variance.sqrt();

    Some(BollingerBands {
        upper: middle + half_width,
        middle,
        lower: middle - half_width,
    })
}
