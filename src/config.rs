//! Runtime configuration
//!
//! Every setting is a clap argument with an environment fallback. The
//! `Default` impls carry the same values as the argument defaults so library
//! callers and tests see identical behavior.

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::ForecastError;

#[derive(Debug, Clone, Default, PartialEq, Args, Serialize)]
pub struct Config {
    #[command(flatten)]
    pub data: DataConfig,

    #[command(flatten)]
    pub analysis: AnalysisConfig,

    #[command(flatten)]
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
pub struct DataConfig {
    /// Directory holding the seven CSV datasets
    #[arg(long, env = "NEXGEN_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
pub struct AnalysisConfig {
    /// Cost-to-value ratio above which an order counts as high-cost
    #[arg(long, env = "NEXGEN_HIGH_COST_RATIO", default_value_t = 0.6)]
    pub high_cost_ratio: f64,

    /// Bins in the cost-to-value ratio histogram
    #[arg(long, default_value_t = 30)]
    pub ratio_histogram_bins: usize,

    /// Upper bound (days) of the minor delay bucket
    #[arg(long, default_value_t = 2.0)]
    pub minor_delay_max_days: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            high_cost_ratio: 0.6,
            ratio_histogram_bins: 30,
            minor_delay_max_days: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Args, Serialize)]
pub struct ForecastConfig {
    /// Regression model used for the cost forecast
    #[arg(long, value_enum, env = "NEXGEN_MODEL", default_value_t = ModelKind::RandomForest)]
    pub model: ModelKind,

    /// Trees in the random forest
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    /// Maximum depth of each tree
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 2)]
    pub min_samples_split: usize,

    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Seed for the train/test split and bootstrap sampling
    #[arg(long, env = "NEXGEN_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Fraction of modeling rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Months to extrapolate beyond the last observed month
    #[arg(long, default_value_t = 6)]
    pub horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::RandomForest,
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            test_fraction: 0.2,
            horizon: 6,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ForecastError::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 || self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(ForecastError::InvalidConfig(
                "max_depth and min_samples_leaf must be >= 1, min_samples_split >= 2".to_string(),
            ));
        }
        Ok(())
    }
}
