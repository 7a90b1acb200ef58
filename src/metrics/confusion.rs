//! Confusion matrix

use crate::error::{MicroforestError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Square count matrix: rows are true classes, columns predicted classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Count `(true, predicted)` pairs over `n_classes` labels
    pub fn new(y_true: &Array1<usize>, y_pred: &Array1<usize>, n_classes: usize) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(MicroforestError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let mut counts = Array2::zeros((n_classes, n_classes));
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t >= n_classes || p >= n_classes {
                return Err(MicroforestError::ValidationError(format!(
                    "label pair ({}, {}) out of range for {} classes",
                    t, p, n_classes
                )));
            }
            counts[[t, p]] += 1;
        }

        Ok(Self { counts })
    }

    /// Raw counts
    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Samples whose true class is `class`
    pub fn support(&self, class: usize) -> usize {
        self.counts.row(class).sum()
    }

    /// Samples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.counts.column(class).sum()
    }

    /// Correct predictions for `class`
    pub fn true_positives(&self, class: usize) -> usize {
        self.counts[[class, class]]
    }

    /// Row sums, one per true class
    pub fn row_sums(&self) -> Array1<usize> {
        self.counts.sum_axis(Axis(1))
    }

    /// Fraction of samples on the diagonal
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.diag().sum() as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);

        for (i, row) in self.counts.rows().into_iter().enumerate() {
            let open = if i == 0 { "[[" } else { " [" };
            let close = if i + 1 == self.n_classes() { "]]" } else { "]" };
            let cells: Vec<String> = row.iter().map(|c| format!("{:>width$}", c)).collect();
            writeln!(f, "{}{}{}", open, cells.join(" "), close)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_counts_and_row_sums() {
        let y_true = array![0, 0, 1, 1, 2, 2, 2];
        let y_pred = array![0, 1, 1, 1, 2, 0, 2];

        let cm = ConfusionMatrix::new(&y_true, &y_pred, 3).unwrap();
        assert_eq!(cm.counts(), &array![[1usize, 1, 0], [0, 2, 0], [1, 0, 2]]);
        assert_eq!(cm.row_sums(), array![2usize, 2, 3]);
        assert_eq!(cm.predicted(0), 2);
        assert!((cm.accuracy() - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let cm = ConfusionMatrix::new(&array![0, 1, 1], &array![0, 1, 0], 2).unwrap();
        assert_eq!(cm.to_string(), "[[1 0]\n [1 1]]\n");
    }

    #[test]
    fn test_length_mismatch() {
        let err = ConfusionMatrix::new(&array![0, 1], &array![0], 2).unwrap_err();
        assert!(matches!(err, MicroforestError::ShapeError { .. }));
    }

    #[test]
    fn test_label_out_of_range() {
        assert!(ConfusionMatrix::new(&array![0, 3], &array![0, 0], 2).is_err());
    }
}
