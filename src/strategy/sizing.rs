use crate::indicators::BollingerBands;

/// Quantity to buy for a given cash balance and price
///
/// Starts from `base_pct` of what the cash could buy and scales it down as
/// the Bollinger Band width grows: `base_pct / (1 + width)`. Without bands
/// the base fraction is used unchanged.
pub fn position_size(
    cash: f64,
    price: f64,
    base_pct: f64,
    bands: Option<&BollingerBands>,
) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }

    let mut position_pct = base_pct;
    if let Some(bands) = bands {
        // Reduce position size as volatility increases
        position_pct *= 1.0 / (1.0 + bands.width());
    }

    (cash / price) * position_pct
}
