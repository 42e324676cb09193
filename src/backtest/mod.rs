pub mod data;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use data::{filter_range, load_prices, sample_every};
pub use metrics::{BacktestMetrics, FillRecord, OutcomeCounts};
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
