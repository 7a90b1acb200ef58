//! Integration test: porting fitted models to source

use microforest::prelude::*;

fn iris_forest(n_estimators: usize, seed: u64) -> (Dataset, RandomForest) {
    let iris = Dataset::iris().unwrap();
    let mut forest = RandomForest::new(n_estimators).with_random_state(seed);
    forest.fit(&iris.records, &iris.targets, iris.n_classes()).unwrap();
    (iris, forest)
}

fn count_splits(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 0,
        TreeNode::Split { left, right, .. } => 1 + count_splits(left) + count_splits(right),
    }
}

#[test]
fn test_forest_code_mirrors_trees() {
    let (iris, forest) = iris_forest(5, 42);
    let config = ExportConfig::new(iris.target_names.clone()).with_timestamp(false);
    let code = CodeExporter::new(config).port(&forest).unwrap();

    let splits: usize = forest
        .trees()
        .iter()
        .map(|t| count_splits(t.root().unwrap()))
        .sum();
    let leaves: usize = forest.trees().iter().map(|t| t.get_n_leaves()).sum();

    assert_eq!(code.matches("if (x[").count(), splits);
    assert_eq!(code.matches("votes[").count() - 4, leaves);
    assert!(code.contains("uint8_t votes[3] = { 0 };"));
    assert!(code.contains("for (uint8_t i = 1; i < 3; i++) {"));
}

#[test]
fn test_export_is_deterministic_without_timestamp() {
    let (iris, forest) = iris_forest(4, 9);
    let exporter = CodeExporter::new(ExportConfig::new(iris.target_names.clone()).with_timestamp(false));

    assert_eq!(exporter.port(&forest).unwrap(), exporter.port(&forest).unwrap());
}

#[test]
fn test_single_tree_export() {
    let iris = Dataset::iris().unwrap();
    let mut tree = DecisionTree::new().with_max_depth(3);
    tree.fit(&iris.records, &iris.targets, iris.n_classes()).unwrap();

    let code = CodeExporter::new(ExportConfig::new(iris.target_names.clone()))
        .port(&tree)
        .unwrap();

    assert!(code.contains("class DecisionTree {"));
    assert_eq!(code.matches("if (x[").count(), tree.get_n_leaves() - 1);
    assert!(!code.contains("votes"));
}

#[test]
fn test_forest_fitted_on_iris_classifies_samples() {
    let (_, forest) = iris_forest(10, 42);

    assert_eq!(forest.predict_one(&[5.1, 3.5, 1.4, 0.2]).unwrap(), 0);
    assert_eq!(forest.predict_one(&[6.2, 2.2, 4.5, 1.5]).unwrap(), 1);
    assert_eq!(forest.predict_one(&[7.7, 3.8, 6.7, 2.2]).unwrap(), 2);
}
