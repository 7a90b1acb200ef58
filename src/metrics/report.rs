//! Per-class precision / recall / F1 report

use super::confusion::ConfusionMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged scores across classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Classification quality summary derived from a confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: AverageScores,
    pub weighted_avg: AverageScores,
    pub total_support: usize,
    /// Decimal places used by `Display`
    #[serde(skip)]
    digits: usize,
}

/// `num / den`, or 0 when the denominator is empty
fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl ClassificationReport {
    /// Build a report; `labels` names each class index of the matrix
    pub fn new(cm: &ConfusionMatrix, labels: &[String]) -> Self {
        let classes: Vec<ClassScores> = (0..cm.n_classes())
            .map(|c| {
                let tp = cm.true_positives(c) as f64;
                let precision = safe_div(tp, cm.predicted(c) as f64);
                let recall = safe_div(tp, cm.support(c) as f64);
                let f1_score = safe_div(2.0 * precision * recall, precision + recall);
                ClassScores {
                    label: labels.get(c).cloned().unwrap_or_else(|| c.to_string()),
                    precision,
                    recall,
                    f1_score,
                    support: cm.support(c),
                }
            })
            .collect();

        let total_support = cm.total();
        let n = classes.len() as f64;
        let macro_avg = AverageScores {
            precision: safe_div(classes.iter().map(|c| c.precision).sum(), n),
            recall: safe_div(classes.iter().map(|c| c.recall).sum(), n),
            f1_score: safe_div(classes.iter().map(|c| c.f1_score).sum(), n),
        };

        let weighted = |score: fn(&ClassScores) -> f64| {
            safe_div(
                classes.iter().map(|c| score(c) * c.support as f64).sum(),
                total_support as f64,
            )
        };
        let weighted_avg = AverageScores {
            precision: weighted(|c: &ClassScores| c.precision),
            recall: weighted(|c: &ClassScores| c.recall),
            f1_score: weighted(|c: &ClassScores| c.f1_score),
        };

        Self {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
            total_support,
            digits: 2,
        }
    }

    /// Set the number of decimal places shown
    pub fn with_digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const AVG_LABEL: &str = "weighted avg";
        let d = self.digits;
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain([AVG_LABEL.len(), d])
            .max()
            .unwrap_or(AVG_LABEL.len());

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for c in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), (AVG_LABEL, &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, self.total_support
            )?;
        }
        Ok(())
    }
}
