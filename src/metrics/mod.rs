//! Classification metrics
//!
//! - [`ConfusionMatrix`] - true vs. predicted class counts
//! - [`ClassificationReport`] - per-class precision, recall, F1 and support

mod confusion;
mod report;

pub use confusion::ConfusionMatrix;
pub use report::{AverageScores, ClassScores, ClassificationReport};

use crate::error::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion matrix and report for one subset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub confusion_matrix: ConfusionMatrix,
    pub report: ClassificationReport,
}

/// Compare predictions with true labels; `labels` names each class index
pub fn evaluate(
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
    labels: &[String],
) -> Result<Evaluation> {
    let confusion_matrix = ConfusionMatrix::new(y_true, y_pred, labels.len())?;
    let report = ClassificationReport::new(&confusion_matrix, labels);
    Ok(Evaluation {
        confusion_matrix,
        report,
    })
}
