//! Forecaster - cost prediction from route, vehicle and order features
//!
//! Rows with every feature and the target present are shuffled with a seeded
//! RNG, split into train and held-out subsets, and fed to a [`Regressor`].
//! The fitted [`Model`] is evaluated on the held-out rows and then run on
//! trend-extrapolated monthly feature vectors to project cost forward.

pub mod forest;
pub mod linear;

pub use forest::RandomForest;
pub use linear::LinearRegression;

use chrono::{Datelike, Months, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::{ForecastConfig, ModelKind};
use crate::error::ForecastError;
use crate::join::JoinedRow;
use crate::stats::{fit_line, mean};

pub const FEATURE_NAMES: [&str; 7] = [
    "distance_km",
    "toll_charges",
    "traffic_delay_min",
    "vehicle_age_years",
    "fuel_efficiency",
    "delay_days",
    "order_value",
];

/// Relative prediction error above which a held-out order counts as anomalous
pub const ANOMALY_TOLERANCE: f64 = 0.15;

/// A fitted regression model
pub trait Model: Send + Sync {
    fn predict(&self, features: &[f64]) -> f64;

    /// Normalised importance per feature, for models that track it
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// A regression algorithm that can be fitted to a feature matrix
pub trait Regressor {
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn Model>, ForecastError>;
}

/// Reject training sets that are empty, ragged or smaller than the feature
/// count. Returns the feature count.
pub(crate) fn check_training_set(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ForecastError> {
    let features = x.first().map_or(0, Vec::len);
    let required = features.max(1);
    if x.len() < required || x.len() != y.len() {
        return Err(ForecastError::InsufficientData {
            rows: x.len().min(y.len()),
            required,
        });
    }
    if x.iter().any(|row| row.len() != features) {
        return Err(ForecastError::InvalidConfig(
            "feature rows differ in length".to_string(),
        ));
    }
    Ok(features)
}

/// One modeling row
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub order_id: String,
    /// First day of the order's month
    pub month: NaiveDate,
    pub features: Vec<f64>,
    pub target: f64,
}

impl Sample {
    pub fn from_row(row: &JoinedRow) -> Option<Self> {
        let features = [
            row.route.distance_km,
            row.route.toll_charges,
            row.route.traffic_delay_min,
            row.vehicle.age_years,
            row.vehicle.fuel_efficiency,
            row.delay_days,
            row.order.order_value,
        ]
        .into_iter()
        .collect::<Option<Vec<f64>>>()?;
        let target = row.total_cost?;
        if !target.is_finite() || features.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            order_id: row.order.order_id.clone(),
            month: month_start(row.order.order_date),
            features,
            target,
        })
    }
}

pub fn samples(rows: &[JoinedRow]) -> Vec<Sample> {
    rows.iter().filter_map(Sample::from_row).collect()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_index(month: NaiveDate) -> f64 {
    f64::from(month.year()) * 12.0 + f64::from(month.month0())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub order_id: String,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
    /// Absent when the held-out target has zero variance
    pub r2: Option<f64>,
}

impl Metrics {
    pub fn evaluate(predictions: &[Prediction]) -> Option<Self> {
        if predictions.is_empty() {
            return None;
        }
        let n = predictions.len() as f64;
        let mae = predictions
            .iter()
            .map(|p| (p.actual - p.predicted).abs())
            .sum::<f64>()
            / n;
        let ss_res: f64 = predictions
            .iter()
            .map(|p| (p.actual - p.predicted).powi(2))
            .sum();
        let actual_mean = predictions.iter().map(|p| p.actual).sum::<f64>() / n;
        let ss_tot: f64 = predictions
            .iter()
            .map(|p| (p.actual - actual_mean).powi(2))
            .sum();

        Some(Self {
            mae,
            rmse: (ss_res / n).sqrt(),
            r2: (ss_tot > f64::EPSILON).then(|| 1.0 - ss_res / ss_tot),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: &'static str,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCost {
    pub month: NaiveDate,
    pub orders: usize,
    pub avg_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturePoint {
    pub month: NaiveDate,
    pub predicted_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub model: ModelKind,
    pub train_rows: usize,
    pub test_rows: usize,
    pub predictions: Vec<Prediction>,
    /// Absent when nothing was held out
    pub metrics: Option<Metrics>,
    pub feature_importances: Vec<FeatureImportance>,
    pub history: Vec<MonthlyCost>,
    pub extrapolation: Vec<FuturePoint>,
    /// Share of held-out orders whose cost is off the prediction by more than
    /// [`ANOMALY_TOLERANCE`]
    pub anomaly_share: Option<f64>,
}

/// Shuffle `0..n` and hold out the first `round(n * test_fraction)` indices.
pub fn split_indices(n: usize, test_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let n_test = ((n as f64 * test_fraction).round() as usize).min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

pub fn forecast(rows: &[JoinedRow], config: &ForecastConfig) -> Result<Forecast, ForecastError> {
    config.validate()?;
    let samples = samples(rows);
    debug!(
        "{} of {} joined rows usable for modeling",
        samples.len(),
        rows.len()
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train, test) = split_indices(samples.len(), config.test_fraction, &mut rng);
    if train.len() < FEATURE_NAMES.len() {
        return Err(ForecastError::InsufficientData {
            rows: train.len(),
            required: FEATURE_NAMES.len(),
        });
    }

    let x: Vec<Vec<f64>> = train.iter().map(|&i| samples[i].features.clone()).collect();
    let y: Vec<f64> = train.iter().map(|&i| samples[i].target).collect();

    let regressor: Box<dyn Regressor> = match config.model {
        ModelKind::RandomForest => Box::new(RandomForest::from_config(config, rng.gen())),
        ModelKind::Linear => Box::new(LinearRegression::default()),
    };
    let model = regressor.fit(&x, &y)?;
    info!(
        "Fitted {:?} on {} rows, evaluating on {}",
        config.model,
        train.len(),
        test.len()
    );

    let predictions: Vec<Prediction> = test
        .iter()
        .map(|&i| {
            let s = &samples[i];
            Prediction {
                order_id: s.order_id.clone(),
                actual: s.target,
                predicted: model.predict(&s.features),
            }
        })
        .collect();

    let feature_importances = model
        .feature_importances()
        .map(|values| {
            FEATURE_NAMES
                .iter()
                .zip(values)
                .map(|(&feature, importance)| FeatureImportance {
                    feature,
                    importance,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Forecast {
        model: config.model,
        train_rows: train.len(),
        test_rows: test.len(),
        metrics: Metrics::evaluate(&predictions),
        anomaly_share: anomaly_share(&predictions),
        predictions,
        feature_importances,
        history: monthly_history(&samples),
        extrapolation: extrapolate(&samples, model.as_ref(), config.horizon),
    })
}

pub fn anomaly_share(predictions: &[Prediction]) -> Option<f64> {
    let scored: Vec<bool> = predictions
        .iter()
        .filter(|p| p.predicted.abs() > f64::EPSILON)
        .map(|p| ((p.actual - p.predicted) / p.predicted).abs() > ANOMALY_TOLERANCE)
        .collect();
    if scored.is_empty() {
        return None;
    }
    Some(scored.iter().filter(|&&a| a).count() as f64 / scored.len() as f64)
}

fn by_month(samples: &[Sample]) -> BTreeMap<NaiveDate, Vec<&Sample>> {
    let mut months: BTreeMap<NaiveDate, Vec<&Sample>> = BTreeMap::new();
    for s in samples {
        months.entry(s.month).or_default().push(s);
    }
    months
}

pub fn monthly_history(samples: &[Sample]) -> Vec<MonthlyCost> {
    by_month(samples)
        .into_iter()
        .filter_map(|(month, group)| {
            let avg_cost = mean(group.iter().map(|s| Some(s.target)))?;
            Some(MonthlyCost {
                month,
                orders: group.len(),
                avg_cost,
            })
        })
        .collect()
}

/// Continue each feature's monthly-mean linear trend for `horizon` months and
/// predict cost at every step.
pub fn extrapolate(samples: &[Sample], model: &dyn Model, horizon: usize) -> Vec<FuturePoint> {
    let months = by_month(samples);
    let Some(&last) = months.keys().next_back() else {
        return Vec::new();
    };

    let trends: Vec<_> = (0..FEATURE_NAMES.len())
        .filter_map(|j| {
            fit_line(months.iter().map(|(month, group)| {
                let x = month_index(*month);
                (Some(x), mean(group.iter().map(|s| s.features.get(j).copied())))
            }))
        })
        .collect();
    if trends.len() != FEATURE_NAMES.len() {
        return Vec::new();
    }

    (1..=horizon)
        .map_while(|step| last.checked_add_months(Months::new(u32::try_from(step).ok()?)))
        .map(|month| {
            let x = month_index(month);
            let features: Vec<f64> = trends.iter().map(|line| line.at(x)).collect();
            FuturePoint {
                month,
                predicted_cost: model.predict(&features).max(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{fixtures::tables, join};

    fn rows(n: usize) -> Vec<JoinedRow> {
        let spec: Vec<(String, f64, f64, f64)> = (0..n)
            .map(|i| {
                let value = 500.0 + 37.0 * i as f64;
                let delay = (i % 4) as f64;
                let cost = 0.12 * value + 8.0 * delay + (i % 3) as f64;
                (format!("ORD{:03}", i), value, cost, delay)
            })
            .collect();
        let borrowed: Vec<(&str, f64, f64, f64)> = spec
            .iter()
            .map(|(id, v, c, d)| (id.as_str(), *v, *c, *d))
            .collect();
        join(tables(&borrowed).view()).rows
    }

    fn small_forest() -> ForecastConfig {
        ForecastConfig {
            n_estimators: 10,
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let rows = rows(40);
        let a = forecast(&rows, &small_forest()).unwrap();
        let b = forecast(&rows, &small_forest()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.test_rows, 8);
        assert_eq!(a.train_rows, 32);
        assert_eq!(a.predictions.len(), 8);
        assert_eq!(a.feature_importances.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_different_seed_changes_split() {
        let rows = rows(40);
        let a = forecast(&rows, &small_forest()).unwrap();
        let b = forecast(
            &rows,
            &ForecastConfig {
                seed: 7,
                ..small_forest()
            },
        )
        .unwrap();
        let ids = |f: &Forecast| {
            f.predictions
                .iter()
                .map(|p| p.order_id.clone())
                .collect::<Vec<_>>()
        };
        assert_ne!(ids(&a), ids(&b));
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        let err = forecast(&[], &ForecastConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                rows: 0,
                required: FEATURE_NAMES.len()
            }
        );
    }

    #[test]
    fn test_too_few_rows_is_insufficient() {
        let err = forecast(&rows(5), &ForecastConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { rows: 4, .. }));
    }

    #[test]
    fn test_rows_missing_features_are_left_out() {
        let mut rows = rows(10);
        rows[0].route.distance_km = None;
        rows[1].total_cost = None;
        assert_eq!(samples(&rows).len(), 8);
    }

    #[test]
    fn test_linear_model_fits_linear_costs() {
        let config = ForecastConfig {
            model: ModelKind::Linear,
            ..ForecastConfig::default()
        };
        let forecast = forecast(&rows(40), &config).unwrap();
        let metrics = forecast.metrics.unwrap();
        assert!(metrics.mae < 2.0);
        assert!(metrics.r2.unwrap() > 0.95);
        assert!(forecast.feature_importances.is_empty());
    }

    #[test]
    fn test_extrapolation_continues_months() {
        let config = ForecastConfig {
            horizon: 3,
            ..small_forest()
        };
        let forecast = forecast(&rows(40), &config).unwrap();
        // fixture orders all fall in January 2024
        assert_eq!(forecast.history.len(), 1);
        assert_eq!(forecast.history[0].orders, 40);
        let months: Vec<String> = forecast
            .extrapolation
            .iter()
            .map(|p| p.month.format("%Y-%m").to_string())
            .collect();
        assert_eq!(months, vec!["2024-02", "2024-03", "2024-04"]);
        assert!(forecast.extrapolation.iter().all(|p| p.predicted_cost >= 0.0));
    }

    #[test]
    fn test_extrapolation_follows_monthly_trend() {
        // ten orders a month, January to June, cost 10% of a value that rises 100 a month
        let ids: Vec<String> = (0..60).map(|i| format!("ORD{:03}", i)).collect();
        let spec: Vec<(&str, f64, f64, f64)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let value = 1000.0 + 100.0 * (i / 10) as f64;
                (id.as_str(), value, 0.1 * value, 0.0)
            })
            .collect();
        let mut t = tables(&spec);
        for (i, order) in t.orders.iter_mut().enumerate() {
            let (month, day) = ((i / 10) as u32 + 1, (i % 10) as u32 + 1);
            order.order_date = NaiveDate::from_ymd_opt(2024, month, day).unwrap();
        }
        let rows = join(t.view()).rows;
        let config = ForecastConfig {
            model: ModelKind::Linear,
            horizon: 3,
            ..ForecastConfig::default()
        };
        let forecast = forecast(&rows, &config).unwrap();

        let history: Vec<f64> = forecast.history.iter().map(|m| m.avg_cost).collect();
        assert_eq!(history.len(), 6);
        for (m, cost) in history.iter().enumerate() {
            assert!((cost - (100.0 + 10.0 * m as f64)).abs() < 1e-6);
        }

        let months: Vec<String> = forecast
            .extrapolation
            .iter()
            .map(|p| p.month.format("%Y-%m").to_string())
            .collect();
        assert_eq!(months, vec!["2024-07", "2024-08", "2024-09"]);
        for (point, expected) in forecast.extrapolation.iter().zip([160.0, 170.0, 180.0]) {
            assert!(
                (point.predicted_cost - expected).abs() < 0.01,
                "{} predicted {}",
                point.month,
                point.predicted_cost
            );
        }
    }

    #[test]
    fn test_metrics() {
        let p = |actual, predicted| Prediction {
            order_id: String::new(),
            actual,
            predicted,
        };
        let perfect = Metrics::evaluate(&[p(1.0, 1.0), p(3.0, 3.0)]).unwrap();
        assert_eq!(perfect.mae, 0.0);
        assert_eq!(perfect.r2, Some(1.0));

        let flat = Metrics::evaluate(&[p(2.0, 1.0), p(2.0, 3.0)]).unwrap();
        assert_eq!(flat.mae, 1.0);
        assert_eq!(flat.rmse, 1.0);
        assert_eq!(flat.r2, None);

        assert!(Metrics::evaluate(&[]).is_none());
    }

    #[test]
    fn test_anomaly_share() {
        let p = |actual, predicted| Prediction {
            order_id: String::new(),
            actual,
            predicted,
        };
        let share = anomaly_share(&[
            p(100.0, 100.0),
            p(130.0, 100.0),
            p(105.0, 100.0),
            p(50.0, 100.0),
        ]);
        assert_eq!(share, Some(0.5));
        assert_eq!(anomaly_share(&[]), None);
    }
}
