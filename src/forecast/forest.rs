//! Random forest of CART regression trees
//!
//! Each tree is grown on a bootstrap sample with its own seed drawn from the
//! forest's master RNG, so a fixed seed reproduces the whole ensemble. Every
//! feature is considered at every split.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{check_training_set, Model, Regressor};
use crate::config::ForecastConfig;
use crate::error::ForecastError;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl RandomForest {
    pub fn from_config(config: &ForecastConfig, seed: u64) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            seed,
        }
    }
}

impl Regressor for RandomForest {
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn Model>, ForecastError> {
        let n_features = check_training_set(x, y)?;
        let n = x.len();
        let mut master = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut importances = vec![0.0; n_features];

        for _ in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let mut builder = TreeBuilder {
                x,
                y,
                params: self,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.grow(sample, 0);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / tree_total;
                }
            }
            trees.push(Tree {
                nodes: builder.nodes,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Box::new(ForestModel { trees, importances }))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Arena-allocated tree; the root is node 0.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug)]
struct ForestModel {
    trees: Vec<Tree>,
    importances: Vec<f64>,
}

impl Model for ForestModel {
    fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.importances.clone())
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: &'a RandomForest,
    nodes: Vec<Node>,
    /// Impurity (SSE) decrease credited to each feature
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree over `indices` and return its node id.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n;
        let sse: f64 = indices.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(mean));

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || sse <= f64::EPSILON
        {
            return id;
        }
        let Some(best) = self.best_split(&indices, sse) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);
        self.importances[best.feature] += best.gain;

        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, indices: &[usize], parent_sse: f64) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..self.x[indices[0]].len() {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for pos in 1..n {
                let prev = sorted[pos - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                if pos < min_leaf || n - pos < min_leaf {
                    continue;
                }
                let lo = self.x[prev][feature];
                let hi = self.x[sorted[pos]][feature];
                if lo >= hi {
                    continue;
                }

                let (nl, nr) = (pos as f64, (n - pos) as f64);
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse =
                    (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr);
                let gain = parent_sse - child_sse;

                if gain > best.as_ref().map_or(f64::EPSILON, |b| b.gain) {
                    let mut threshold = (lo + hi) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(n_estimators: usize, seed: u64) -> RandomForest {
        RandomForest {
            n_estimators,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed,
        }
    }

    /// Step in feature 0, noise in feature 1
    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64 / 4.0, ((i * 7) % 11) as f64])
            .collect();
        let y = x
            .iter()
            .map(|r| if r[0] > 5.0 { 10.0 } else { 20.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let model = forest(20, 7).fit(&x, &y).unwrap();
        assert!((model.predict(&[1.0, 3.0]) - 20.0).abs() < 1e-9);
        assert!((model.predict(&[9.0, 3.0]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_importance_on_informative_feature() {
        let (x, y) = step_data();
        let model = forest(20, 7).fit(&x, &y).unwrap();
        let importances = model.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances[0] - 1.0).abs() < 1e-9);
        assert!(importances[1].abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_model() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| (i * i) as f64 * 0.5 + (i % 3) as f64).collect();

        let a = forest(15, 42).fit(&x, &y).unwrap();
        let b = forest(15, 42).fit(&x, &y).unwrap();
        for row in &x {
            assert_eq!(a.predict(row), b.predict(row));
        }
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_depth_limit_gives_stump() {
        let (x, y) = step_data();
        let stump = RandomForest {
            max_depth: 1,
            ..forest(1, 3)
        };
        let model = stump.fit(&x, &y).unwrap();
        let low = model.predict(&[0.0, 0.0]);
        let high = model.predict(&[10.0, 0.0]);
        assert!(low > high);
    }

    #[test]
    fn test_rejects_empty_training_set() {
        let Err(err) = forest(5, 1).fit(&[], &[]) else {
            panic!("empty training set should be rejected");
        };
        assert!(matches!(err, ForecastError::InsufficientData { rows: 0, .. }));
    }
}
