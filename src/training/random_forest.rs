//! Random Forest implementation

use crate::error::{MicroforestError, Result};
use super::decision_tree::{majority_class, Criterion, DecisionTree};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
    /// Number of classes
    n_classes: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new forest of `n_estimators` trees
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }

    /// Fit the forest. `n_classes` is the size of the label space.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(MicroforestError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(MicroforestError::ValidationError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(MicroforestError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(MicroforestError::InvalidParameter {
                    name: "max_features".to_string(),
                    value: f.to_string(),
                    reason: "fraction must lie in (0, 1]".to_string(),
                });
            }
        }

        self.n_features = n_features;
        self.n_classes = n_classes;
        let max_features = self.compute_max_features(n_features);

        let base_seed = self.random_state.unwrap_or_else(rand::random);
        debug!(
            n_estimators = self.n_estimators,
            max_features,
            base_seed,
            "Fitting random forest"
        );

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(rng.gen());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                if self.bootstrap {
                    let sample_indices: Vec<usize> =
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample_indices);
                    let y_boot = y.select(Axis(0), &sample_indices);
                    tree.fit(&x_boot, &y_boot, n_classes)?;
                } else {
                    tree.fit(x, y, n_classes)?;
                }

                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                total_importances += imp;
            }
        }

        let total = total_importances.sum();
        if total > 0.0 {
            total_importances /= total;
        }

        self.feature_importances = Some(total_importances);
    }

    fn check_fitted(&self, n_cols: usize) -> Result<()> {
        if self.trees.is_empty() {
            return Err(MicroforestError::ModelNotFitted);
        }
        if n_cols != self.n_features {
            return Err(MicroforestError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", n_cols),
            });
        }
        Ok(())
    }

    /// Vote counts per sample and class
    fn votes(&self, x: &Array2<f64>) -> Result<Array2<usize>> {
        self.check_fitted(x.ncols())?;

        let all_predictions: Vec<Array1<usize>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let mut votes = Array2::zeros((x.nrows(), self.n_classes));
        for preds in &all_predictions {
            for (i, &class) in preds.iter().enumerate() {
                votes[[i, class]] += 1;
            }
        }
        Ok(votes)
    }

    /// Predict class indices by majority vote, lowest class index on ties
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let votes = self.votes(x)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| majority_class(&row.to_vec()))
            .collect())
    }

    /// Predict the class of a single sample
    pub fn predict_one(&self, sample: &[f64]) -> Result<usize> {
        self.check_fitted(sample.len())?;

        let mut counts = vec![0usize; self.n_classes];
        for tree in &self.trees {
            counts[tree.predict_one(sample)?] += 1;
        }
        Ok(majority_class(&counts))
    }

    /// Fraction of trees voting for each class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let votes = self.votes(x)?;
        let n_trees = self.trees.len() as f64;
        Ok(votes.mapv(|v| v as f64 / n_trees))
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes seen during fit
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}
