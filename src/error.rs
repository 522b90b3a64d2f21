use std::path::PathBuf;

use thiserror::Error;

use crate::models::Dataset;

/// Failure to turn one source file into typed rows.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{dataset}: cannot read {path}: {source}")]
    Io {
        dataset: Dataset,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{dataset}: missing required column '{column}'")]
    MissingColumn { dataset: Dataset, column: &'static str },

    #[error("{dataset}: bad record at line {line}: {source}")]
    InvalidRecord {
        dataset: Dataset,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{dataset}: bad value '{value}' in column '{column}' at line {line}")]
    InvalidValue {
        dataset: Dataset,
        line: u64,
        column: &'static str,
        value: String,
    },
}

impl LoadError {
    pub fn dataset(&self) -> Dataset {
        match self {
            Self::Io { dataset, .. }
            | Self::MissingColumn { dataset, .. }
            | Self::InvalidRecord { dataset, .. }
            | Self::InvalidValue { dataset, .. } => *dataset,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("insufficient data: {rows} training rows, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    #[error("invalid forecaster setting: {0}")]
    InvalidConfig(String),

    #[error("regression system is singular")]
    Singular,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("no usable input data: every dataset failed to load")]
    NoUsableData,

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
