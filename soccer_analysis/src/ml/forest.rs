//! Bagged ensemble of [`DecisionTree`]s.

use ndarray::{Array1, ArrayView1, ArrayView2};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tree::{argmax, DecisionTree, TreeConfig};
use super::{Estimator, Task};

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree (`None` = grow fully)
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features per split; `None` = all for regression, `sqrt(p)` for classification
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Base seed; tree `t` uses `seed + t`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    task: Task,
    n_classes: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig, task: Task) -> Self {
        Self { config, task, n_classes: 0, trees: Vec::new(), feature_importances: Vec::new() }
    }

    pub fn regressor(config: ForestConfig) -> Self {
        Self::new(config, Task::Regression)
    }

    pub fn classifier(config: ForestConfig) -> Self {
        Self::new(config, Task::Classification)
    }

    fn max_features(&self, n_features: usize) -> usize {
        self.config.max_features.unwrap_or(match self.task {
            Task::Regression => n_features,
            Task::Classification => (n_features as f64).sqrt().ceil() as usize,
        })
    }

    /// Averaged class proportions for one row.
    fn predict_proba_row(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_distribution(row)) {
                *a += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        acc.iter().map(|a| a / n).collect()
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> PolarsResult<()> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(PolarsError::ShapeMismatch(
                format!("cannot fit forest on {} rows with {} targets", n, y.len()).into(),
            ));
        }
        if self.task == Task::Classification {
            if y.iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
                return Err(PolarsError::ComputeError(
                    "classification targets must be non-negative class indices".into(),
                ));
            }
            self.n_classes = y.iter().fold(0.0_f64, |m, v| m.max(*v)) as usize + 1;
        }

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: Some(self.max_features(x.ncols())),
        };

        info!(
            "Fitting {} trees on {} rows x {} features ({:?})",
            self.config.n_trees,
            n,
            x.ncols(),
            self.task
        );

        self.trees = (0..self.config.n_trees)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = if self.config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree = DecisionTree::new(tree_config.clone(), self.task, self.n_classes);
                tree.fit_sample(x, y, &sample, &mut rng);
                debug!("tree {:>3}: depth {}", t, tree.depth());
                tree
            })
            .collect();

        // Average per-tree importances, normalised to sum to one.
        let mut importances = vec![0.0; x.ncols()];
        for tree in &self.trees {
            let total: f64 = tree.importances().iter().sum();
            if total > 0.0 {
                for (acc, imp) in importances.iter_mut().zip(tree.importances()) {
                    *acc += imp / total;
                }
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= sum);
        }
        self.feature_importances = importances;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> PolarsResult<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PolarsError::InvalidOperation("forest has not been fitted".into()));
        }
        let predictions = x
            .rows()
            .into_iter()
            .map(|row| match self.task {
                Task::Regression => {
                    self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
                }
                Task::Classification => argmax(&self.predict_proba_row(row)) as f64,
            })
            .collect();
        Ok(predictions)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        if self.feature_importances.is_empty() {
            None
        } else {
            Some(&self.feature_importances)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn small_forest() -> ForestConfig {
        ForestConfig { n_trees: 15, ..ForestConfig::default() }
    }

    #[test]
    fn regressor_tracks_signal_and_ignores_noise() {
        let x = Array2::from_shape_fn((120, 2), |(i, j)| {
            if j == 0 { i as f64 } else { ((i * 37) % 11) as f64 }
        });
        let y = Array1::from_shape_fn(120, |i| 3.0 * i as f64);
        let mut forest = RandomForest::regressor(small_forest());
        forest.fit(x.view(), y.view()).unwrap();

        let pred = forest.predict(x.view()).unwrap();
        let mae = pred.iter().zip(y.iter()).map(|(p, t)| (p - t).abs()).sum::<f64>() / 120.0;
        assert!(mae < 10.0, "mae {}", mae);

        let imp = forest.feature_importances().unwrap();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn same_seed_same_predictions() {
        let x = Array2::from_shape_fn((50, 3), |(i, j)| ((i * (j + 3)) % 17) as f64);
        let y = Array1::from_shape_fn(50, |i| (i % 7) as f64);
        let mut a = RandomForest::regressor(small_forest());
        let mut b = RandomForest::regressor(small_forest());
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn classifier_predicts_class_indices() {
        let x = Array2::from_shape_fn((60, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(60, |i| if i < 30 { 0.0 } else { 1.0 });
        let mut forest = RandomForest::classifier(small_forest());
        forest.fit(x.view(), y.view()).unwrap();

        let pred = forest.predict(x.view()).unwrap();
        let correct = pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct >= 57);
        let proba = forest.predict_proba_row(x.row(0));
        assert_eq!(proba.len(), 2);
        assert!(proba[0] > 0.5);
    }

    #[test]
    fn unfitted_forest_refuses_to_predict() {
        let forest = RandomForest::regressor(ForestConfig::default());
        assert!(forest.predict(Array2::zeros((1, 1)).view()).is_err());
        assert!(forest.feature_importances().is_none());
    }
}
