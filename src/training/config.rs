//! Forest training configuration

use super::decision_tree::Criterion;
use super::random_forest::{MaxFeatures, RandomForest};
use serde::{Deserialize, Serialize};

/// Hyperparameters for a random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum depth per tree (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples needed to split a node
    pub min_samples_split: usize,

    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,

    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,

    /// Impurity criterion
    pub criterion: Criterion,

    /// Random seed (None = fresh entropy per run)
    pub random_state: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
        }
    }
}

impl ForestConfig {
    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set impurity criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random seed
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Build an unfitted forest from these settings
    pub fn build(&self) -> RandomForest {
        let mut forest = RandomForest::new(self.n_estimators)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_bootstrap(self.bootstrap)
            .with_criterion(self.criterion);
        forest.max_depth = self.max_depth;
        forest.random_state = self.random_state;
        forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_carries_settings() {
        let config = ForestConfig::default()
            .with_n_estimators(25)
            .with_max_depth(Some(4))
            .with_criterion(Criterion::Entropy)
            .with_random_state(Some(9));

        let forest = config.build();
        assert_eq!(forest.n_estimators, 25);
        assert_eq!(forest.max_depth, Some(4));
        assert_eq!(forest.criterion, Criterion::Entropy);
        assert_eq!(forest.random_state, Some(9));
        assert_eq!(forest.n_trees(), 0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ForestConfig::default().with_random_state(Some(1));
        let json = serde_json::to_string(&config).unwrap();
        let back: ForestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
