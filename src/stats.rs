//! Small numeric helpers shared by the aggregator and the forecaster.
//!
//! Inputs are filtered to finite values, and every function returns `None`
//! instead of a NaN or infinite result.

/// Running sum/count of finite values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub sum: f64,
    pub count: usize,
}

impl Accumulator {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sum of the values seen, `None` when there were none
    pub fn total(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }
}

impl FromIterator<Option<f64>> for Accumulator {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        let mut acc = Accumulator::default();
        for value in iter {
            acc.push(value);
        }
        acc
    }
}

pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values.into_iter().collect::<Accumulator>().mean()
}

fn finite_pairs(pairs: impl IntoIterator<Item = (Option<f64>, Option<f64>)>) -> Vec<(f64, f64)> {
    pairs
        .into_iter()
        .filter_map(|(x, y)| Some((x?, y?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect()
}

/// Pearson correlation over pairs where both sides are present
pub fn pearson(pairs: impl IntoIterator<Item = (Option<f64>, Option<f64>)>) -> Option<f64> {
    let pairs = finite_pairs(pairs);
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a least-squares line. A single point or constant `x` yields a flat
/// line through the mean of `y`.
pub fn fit_line(pairs: impl IntoIterator<Item = (Option<f64>, Option<f64>)>) -> Option<Line> {
    let pairs = finite_pairs(pairs);
    if pairs.is_empty() {
        return None;
    }
    let n = pairs.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() <= f64::EPSILON {
        return Some(Line {
            slope: 0.0,
            intercept: sum_y / n,
        });
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(Line { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_missing_and_non_finite() {
        assert_eq!(mean([Some(1.0), None, Some(3.0), Some(f64::NAN)]), Some(2.0));
        assert_eq!(mean([None, None]), None);
        assert_eq!(mean(std::iter::empty::<Option<f64>>()), None);
    }

    #[test]
    fn test_pearson() {
        let perfect = [(Some(1.0), Some(2.0)), (Some(2.0), Some(4.0)), (Some(3.0), Some(6.0))];
        assert!((pearson(perfect).unwrap() - 1.0).abs() < 1e-12);

        let inverse = [(Some(1.0), Some(3.0)), (Some(2.0), Some(2.0)), (Some(3.0), Some(1.0))];
        assert!((pearson(inverse).unwrap() + 1.0).abs() < 1e-12);

        let flat = [(Some(1.0), Some(5.0)), (Some(2.0), Some(5.0))];
        assert_eq!(pearson(flat), None);
    }

    #[test]
    fn test_fit_line() {
        let line = fit_line([
            (Some(0.0), Some(1.0)),
            (Some(1.0), Some(3.0)),
            (Some(2.0), Some(5.0)),
        ])
            .unwrap();
        assert!((line.slope - 2.0).abs() < 1e-12);
        assert!((line.intercept - 1.0).abs() < 1e-12);
        assert!((line.at(4.0) - 9.0).abs() < 1e-12);

        let single = fit_line([(Some(3.0), Some(7.0))]).unwrap();
        assert_eq!(single, Line { slope: 0.0, intercept: 7.0 });
        assert_eq!(fit_line(std::iter::empty::<(Option<f64>, Option<f64>)>()), None);
    }
}
