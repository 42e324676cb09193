// Core modules
pub mod backtest;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;
pub mod trader;

// Re-export commonly used types
pub use models::*;
pub use strategy::{IterationOutcome, Strategy, SwingHigh, SwingHighConfig};

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
