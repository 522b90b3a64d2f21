//! Ordinary least squares
//!
//! Features are standardised before solving the normal equations, which keeps
//! the system well conditioned when columns differ by orders of magnitude
//! (order value against vehicle age). A small ridge term on the diagonal keeps
//! constant columns from making it singular.

use super::{check_training_set, Model, Regressor};
use crate::error::ForecastError;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    pub ridge: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self { ridge: 1e-6 }
    }
}

impl Regressor for LinearRegression {
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn Model>, ForecastError> {
        let p = check_training_set(x, y)?;
        let n = x.len() as f64;

        let means: Vec<f64> = (0..p)
            .map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let scales: Vec<f64> = (0..p)
            .map(|j| {
                let var = x.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
                if var > f64::EPSILON {
                    var.sqrt()
                } else {
                    1.0
                }
            })
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let z: Vec<Vec<f64>> = x
            .iter()
            .map(|r| (0..p).map(|j| (r[j] - means[j]) / scales[j]).collect())
            .collect();

        // (ZᵀZ + λI) w = Zᵀ(y - ȳ)
        let mut a = vec![vec![0.0; p]; p];
        let mut b = vec![0.0; p];
        for (row, &target) in z.iter().zip(y) {
            let centered = target - y_mean;
            for i in 0..p {
                b[i] += row[i] * centered;
                for j in 0..p {
                    a[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, a_row) in a.iter_mut().enumerate() {
            a_row[i] += self.ridge * n;
        }

        let weights = solve(a, b).ok_or(ForecastError::Singular)?;
        Ok(Box::new(LinearModel {
            means,
            scales,
            weights,
            intercept: y_mean,
        }))
    }
}

#[derive(Debug, Clone)]
struct LinearModel {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    intercept: f64,
}

impl Model for LinearModel {
    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + row
                .iter()
                .zip(self.means.iter().zip(&self.scales))
                .zip(&self.weights)
                .map(|((x, (m, s)), w)| w * (x - m) / s)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
