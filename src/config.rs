use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::execution::FillPolicy;
use crate::strategy::SwingHighConfig;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "swinghigh.toml";

/// Prefix for environment overrides, e.g. `SWINGHIGH_STRATEGY__MIN_CASH=25`
pub const ENV_PREFIX: &str = "SWINGHIGH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub strategy: SwingHighConfig,
    pub backtest: BacktestSettings,
    pub paper: PaperSettings,
    pub log_filter: LogFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// Starting cash in USD
    pub budget: f64,
    /// First day replayed (inclusive)
    pub start: Option<NaiveDate>,
    /// Last day replayed (inclusive)
    pub end: Option<NaiveDate>,
    /// Seed for synthetic scenarios
    pub seed: u64,
    pub fill_policy: FillPolicy,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            budget: 100.0,
            start: NaiveDate::from_ymd_opt(2025, 1, 2),
            end: NaiveDate::from_ymd_opt(2025, 2, 28),
            seed: 42,
            fill_policy: FillPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    /// Starting cash in USD
    pub budget: f64,
    /// First price of the synthetic feed
    pub start_price: f64,
    /// Max relative move per tick of the synthetic feed
    pub volatility: f64,
    pub seed: u64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            budget: 100.0,
            start_price: 95_000.0,
            volatility: 0.003,
            seed: 7,
        }
    }
}

/// `tracing_subscriber::EnvFilter` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogFilter(pub String);

impl Default for LogFilter {
    fn default() -> Self {
        Self("swinghigh=info".to_string())
    }
}

impl Settings {
    /// Load settings: defaults, then the config file, then `SWINGHIGH_*` env vars
    ///
    /// An explicit `path` must exist; the default `swinghigh.toml` is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Settings::default())
            .context("Failed to serialize default settings")?;

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.strategy
            .validate()
            .map_err(|e| anyhow!("Invalid [strategy] settings: {}", e))?;

        if !(self.backtest.budget > 0.0) {
            return Err(anyhow!(
                "backtest.budget must be positive, got {}",
                self.backtest.budget
            ));
        }
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start > end {
                return Err(anyhow!("backtest.start {} is after backtest.end {}", start, end));
            }
        }
        if !(self.paper.budget > 0.0 && self.paper.start_price > 0.0) {
            return Err(anyhow!("paper.budget and paper.start_price must be positive"));
        }
        if !(0.0..1.0).contains(&self.paper.volatility) {
            return Err(anyhow!(
                "paper.volatility must be in [0, 1), got {}",
                self.paper.volatility
            ));
        }
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
