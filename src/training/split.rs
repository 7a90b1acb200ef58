//! Shuffled train/test splitting

use crate::datasets::Dataset;
use crate::error::{MicroforestError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// A dataset partitioned into training and held-out subsets
#[derive(Debug, Clone, Serialize)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Rows of the parent dataset that went to `train`
    pub train_indices: Vec<usize>,
    /// Rows of the parent dataset that went to `test`
    pub test_indices: Vec<usize>,
}

/// Split `dataset` so that `round(n * train_ratio)` rows are used for training.
///
/// Rows are shuffled with `seed`, or with fresh entropy when `seed` is `None`.
/// With `stratify`, every class is split at the same ratio.
pub fn train_test_split(
    dataset: &Dataset,
    train_ratio: f64,
    seed: Option<u64>,
    stratify: bool,
) -> Result<TrainTestSplit> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(MicroforestError::InvalidParameter {
            name: "train_ratio".to_string(),
            value: train_ratio.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let n = dataset.n_samples();

    let (train_indices, test_indices) = if stratify {
        stratified_indices(dataset, train_ratio, &mut rng)?
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let train_size = (n as f64 * train_ratio).round() as usize;
        let test_indices = indices.split_off(train_size.min(n));
        (indices, test_indices)
    };

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(MicroforestError::ValidationError(format!(
            "splitting {} samples at ratio {} leaves an empty subset ({} train, {} test)",
            n,
            train_ratio,
            train_indices.len(),
            test_indices.len()
        )));
    }

    Ok(TrainTestSplit {
        train: dataset.select(&train_indices),
        test: dataset.select(&test_indices),
        train_indices,
        test_indices,
    })
}

fn stratified_indices(
    dataset: &Dataset,
    train_ratio: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = dataset.n_samples();
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); dataset.n_classes()];
    for (i, &class) in dataset.targets.iter().enumerate() {
        by_class[class].push(i);
    }
    let present = by_class.iter().filter(|rows| !rows.is_empty()).count();

    let train_size = (n as f64 * train_ratio).round() as usize;
    let test_size = n - train_size;
    if train_size < present || test_size < present {
        return Err(MicroforestError::ValidationError(format!(
            "stratified split needs at least {} samples per side, got {} train and {} test",
            present, train_size, test_size
        )));
    }

    let mut train = Vec::with_capacity(train_size);
    let mut test = Vec::with_capacity(test_size);
    for rows in by_class.iter_mut() {
        rows.shuffle(rng);
        let class_train = (rows.len() as f64 * train_ratio).round() as usize;
        train.extend_from_slice(&rows[..class_train]);
        test.extend_from_slice(&rows[class_train..]);
    }

    train.shuffle(rng);
    test.shuffle(rng);
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_partition() {
        let iris = Dataset::iris().unwrap();
        let split = train_test_split(&iris, 0.75, Some(42), false).unwrap();

        assert_eq!(split.train.n_samples(), 113);
        assert_eq!(split.test.n_samples(), 37);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let iris = Dataset::iris().unwrap();
        let a = train_test_split(&iris, 0.75, Some(1), false).unwrap();
        let b = train_test_split(&iris, 0.75, Some(1), false).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_stratified_keeps_class_balance() {
        let iris = Dataset::iris().unwrap();
        let split = train_test_split(&iris, 0.8, Some(5), true).unwrap();

        assert_eq!(split.train.class_counts(), vec![40, 40, 40]);
        assert_eq!(split.test.class_counts(), vec![10, 10, 10]);
    }

    #[test]
    fn test_invalid_ratio() {
        let iris = Dataset::iris().unwrap();
        assert!(matches!(
            train_test_split(&iris, 1.0, None, false),
            Err(MicroforestError::InvalidParameter { .. })
        ));
        assert!(train_test_split(&iris, 0.0, None, false).is_err());
    }

    #[test]
    fn test_empty_subset_rejected() {
        let iris = Dataset::iris().unwrap();
        let tiny = iris.select(&[0, 1]);
        let err = train_test_split(&tiny, 0.9, Some(0), false).unwrap_err();
        assert!(matches!(err, MicroforestError::ValidationError(_)));
    }

    #[test]
    fn test_stratified_too_small() {
        let iris = Dataset::iris().unwrap();
        let small = iris.select(&[0, 1, 50, 51, 100, 101]);
        assert!(train_test_split(&small, 0.75, Some(0), true).is_err());
    }
}
