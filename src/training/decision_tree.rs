//! CART classification tree

use crate::error::{MicroforestError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node predicting a class index
    Leaf {
        class: usize,
        n_samples: usize,
    },
    /// Internal node: samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random per node (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature subsampling
    pub random_state: Option<u64>,
    /// Number of features seen during fit
    n_features: usize,
    /// Number of classes seen during fit
    n_classes: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new unfitted tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
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

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
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

    /// Fit the tree. `n_classes` fixes the label space so that trees grown on
    /// bootstrap samples missing a class still agree on class indices.
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
                "cannot fit a tree on zero samples".to_string(),
            ));
        }
        if let Some(&max) = y.iter().max() {
            if max >= n_classes {
                return Err(MicroforestError::ValidationError(format!(
                    "label {} out of range for {} classes",
                    max, n_classes
                )));
            }
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(MicroforestError::DataError(
                "features must be finite (found NaN or infinity)".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(MicroforestError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = n_features;
        self.n_classes = n_classes;

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::seed_from_u64(rand::random()),
        };

        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn class_counts(&self, y: &Array1<usize>, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let leaf = || TreeNode::Leaf {
            class: majority_class(&counts),
            n_samples,
        };

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        if should_stop {
            return leaf();
        }

        let parent_impurity = self.criterion.impurity(&counts, n_samples);
        let features = self.candidate_features(rng);

        let Some((feature, threshold, gain)) =
            self.find_best_split(x, y, indices, &features, parent_impurity)
        else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return leaf();
        }

        importances[feature] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: feature,
            threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut features = index::sample(rng, self.n_features, k.max(1)).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best `(feature, threshold, impurity decrease)` among `features`
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();

        // Each feature independently sweeps its sorted values
        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut sorted: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], y[i]))
                    .collect();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left_counts = vec![0usize; self.n_classes];
                let mut right_counts = vec![0usize; self.n_classes];
                for &(_, class) in &sorted {
                    right_counts[class] += 1;
                }

                let mut best: Option<(f64, f64)> = None;

                for pos in 1..n {
                    let (prev_value, prev_class) = sorted[pos - 1];
                    left_counts[prev_class] += 1;
                    right_counts[prev_class] -= 1;

                    let value = sorted[pos].0;
                    if value <= prev_value {
                        continue;
                    }
                    if pos < self.min_samples_leaf || n - pos < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (pos as f64 * self.criterion.impurity(&left_counts, pos)
                        + (n - pos) as f64 * self.criterion.impurity(&right_counts, n - pos))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, split_threshold(prev_value, value)));
                    }
                }

                best.filter(|(gain, _)| *gain > 1e-12)
                    .map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // Strictly greater keeps the lowest feature index on ties
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |best: Option<(usize, f64, f64)>, cand| match best {
                Some(b) if b.2 >= cand.2 => Some(b),
                _ => Some(cand),
            })
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let root = self.root.as_ref().ok_or(MicroforestError::ModelNotFitted)?;
        self.check_features(x.ncols())?;

        Ok(x.rows()
            .into_iter()
            .map(|row| predict_sample(root, &row))
            .collect())
    }

    /// Predict the class of a single sample
    pub fn predict_one(&self, sample: &[f64]) -> Result<usize> {
        let root = self.root.as_ref().ok_or(MicroforestError::ModelNotFitted)?;
        self.check_features(sample.len())?;
        Ok(predict_sample(root, &ArrayView1::from(sample)))
    }

    fn check_features(&self, n: usize) -> Result<()> {
        if n != self.n_features {
            return Err(MicroforestError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", n),
            });
        }
        Ok(())
    }

    /// Root node, if fitted
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
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

    /// Get tree depth (a lone leaf has depth 1)
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }
}

/// Midpoint of two consecutive distinct values, falling back to `lo` when
/// rounding would push it onto `hi`
fn split_threshold(lo: f64, hi: f64) -> f64 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid >= hi || !mid.is_finite() {
        lo
    } else {
        mid
    }
}

/// Most frequent class, lowest index on ties
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

fn predict_sample(node: &TreeNode, sample: &ArrayView1<f64>) -> usize {
    match node {
        TreeNode::Leaf { class, .. } => *class,
        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
        assert_eq!(tree.get_depth(), 2);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_threshold_is_midpoint() {
        let x = array![[1.0], [2.0], [4.0], [6.0]];
        let y = array![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        match tree.root().unwrap() {
            TreeNode::Split { feature_idx, threshold, .. } => {
                assert_eq!(*feature_idx, 0);
                assert!((threshold - 3.0).abs() < 1e-12);
            }
            other => panic!("expected split, got {:?}", other),
        }
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y, 2).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_entropy_criterion() {
        let x = array![[0.0], [0.5], [3.0], [3.5], [7.0], [7.5]];
        let y = array![0, 0, 1, 1, 2, 2];

        let mut tree = DecisionTree::new().with_criterion(Criterion::Entropy);
        tree.fit(&x, &y, 3).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 3).unwrap();

        assert_eq!(tree.get_n_leaves(), 1);
        assert_eq!(tree.predict_one(&[10.0]).unwrap(), 1);
    }

    #[test]
    fn test_unfitted_and_bad_input() {
        let tree = DecisionTree::new();
        assert!(matches!(tree.predict_one(&[1.0]), Err(MicroforestError::ModelNotFitted)));

        let mut tree = DecisionTree::new();
        let err = tree.fit(&array![[1.0], [2.0]], &array![0, 3], 2).unwrap_err();
        assert!(matches!(err, MicroforestError::ValidationError(_)));
    }

    #[test]
    fn test_adjacent_floats_split_cleanly() {
        let a = 1.0000000000000002_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        let x = array![[a], [b]];
        let y = array![0, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        match tree.root().unwrap() {
            TreeNode::Split { threshold, .. } => assert!(*threshold >= a && *threshold < b),
            other => panic!("expected split, got {:?}", other),
        }
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_split_threshold_stays_below_upper_value() {
        assert_eq!(split_threshold(1.0, 3.0), 2.0);
        assert_eq!(split_threshold(f64::MAX, f64::MAX), f64::MAX);
        let lo = 1.0000000000000002_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert!(split_threshold(lo, hi) < hi);
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let mut tree = DecisionTree::new();
        let err = tree
            .fit(&array![[1.0], [f64::INFINITY]], &array![0, 1], 2)
            .unwrap_err();
        assert!(matches!(err, MicroforestError::DataError(_)));

        let err = tree.fit(&array![[f64::NAN], [2.0]], &array![0, 1], 2).unwrap_err();
        assert!(matches!(err, MicroforestError::DataError(_)));
    }

    #[test]
    fn test_majority_class_ties_go_low() {
        assert_eq!(majority_class(&[2, 3, 3]), 1);
        assert_eq!(majority_class(&[0, 0, 0]), 0);
    }
}
