//! Model training module
//!
//! Provides the pieces needed to fit a tree ensemble:
//! - Shuffled (optionally stratified) train/test splitting
//! - CART classification trees
//! - Random Forests with bootstrap sampling and per-split feature subsampling

mod config;
pub mod decision_tree;
pub mod random_forest;
pub mod split;

pub use config::ForestConfig;
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{train_test_split, TrainTestSplit};
