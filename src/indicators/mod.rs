// Technical indicators module
// Implements RSI, SMA and Bollinger Bands over a trailing price window

pub mod bollinger;
pub mod moving_average;
pub mod rsi;

pub use bollinger::{calculate_bollinger_bands, BollingerBands};
pub use moving_average::calculate_sma;
pub use rsi::calculate_rsi;
