//! Labeled tabular datasets
//!
//! A [`Dataset`] is a dense feature matrix paired with class indices. The
//! Iris dataset ships embedded in the binary; other datasets load from CSV
//! through polars.

use crate::error::{MicroforestError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const IRIS_CSV: &str = include_str!("../../data/iris.csv");
const IRIS_TARGET: &str = "species";

/// Feature matrix with class labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Samples as rows, features as columns
    pub records: Array2<f64>,
    /// Class index per sample
    pub targets: Array1<usize>,
    /// Column names of `records`
    pub feature_names: Vec<String>,
    /// Display name per class index
    pub target_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset, checking that the pieces agree in shape
    pub fn new(
        records: Array2<f64>,
        targets: Array1<usize>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
    ) -> Result<Self> {
        if records.nrows() != targets.len() {
            return Err(MicroforestError::ShapeError {
                expected: format!("targets length = {}", records.nrows()),
                actual: format!("targets length = {}", targets.len()),
            });
        }
        if records.ncols() != feature_names.len() {
            return Err(MicroforestError::ShapeError {
                expected: format!("{} feature names", records.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if let Some(&max) = targets.iter().max() {
            if max >= target_names.len() {
                return Err(MicroforestError::ValidationError(format!(
                    "class index {} has no name ({} names given)",
                    max,
                    target_names.len()
                )));
            }
        }

        Ok(Self {
            records,
            targets,
            feature_names,
            target_names,
        })
    }

    /// The classic Fisher Iris dataset: 150 samples, 4 features, 3 classes
    pub fn iris() -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(IRIS_CSV.as_bytes()))
            .finish()?;

        Self::from_dataframe(&df, IRIS_TARGET)
    }

    /// Load a CSV file whose `target` column holds the class of each row.
    ///
    /// Every other column is treated as a numeric feature.
    pub fn from_csv(path: impl AsRef<Path>, target: &str) -> Result<Self> {
        let path = path.as_ref();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| {
                MicroforestError::DataError(format!("cannot open {}: {}", path.display(), e))
            })?
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
        Self::from_dataframe(&df, target)
    }

    /// Convert a DataFrame into a dataset.
    ///
    /// String targets get class indices in order of first appearance; numeric
    /// targets are sorted and indexed, keeping their printed value as the name.
    pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Self> {
        let target_col = df
            .column(target)
            .map_err(|_| MicroforestError::DataError(format!("target column '{}' not found", target)))?;

        let (targets, target_names) = match target_col.dtype() {
            DataType::String => encode_string_labels(target_col)?,
            _ => encode_numeric_labels(target_col)?,
        };

        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();

        if feature_names.is_empty() {
            return Err(MicroforestError::DataError(
                "dataset has no feature columns".to_string(),
            ));
        }
        if df.height() == 0 {
            return Err(MicroforestError::DataError("dataset has no rows".to_string()));
        }

        let records = columns_to_array2(df, &feature_names)?;
        Self::new(records, targets, feature_names, target_names)
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.records.nrows()
    }

    /// Number of features per sample
    pub fn n_features(&self) -> usize {
        self.records.ncols()
    }

    /// Number of distinct classes (named, not necessarily present)
    pub fn n_classes(&self) -> usize {
        self.target_names.len()
    }

    /// Number of samples per class index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &t in self.targets.iter() {
            counts[t] += 1;
        }
        counts
    }

    /// Rows at `indices`, in that order, keeping names
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
            target_names: self.target_names.clone(),
        }
    }

    /// Name of a class index, or `"?"` when out of range
    pub fn target_name(&self, class: usize) -> &str {
        self.target_names.get(class).map(String::as_str).unwrap_or("?")
    }
}

fn encode_string_labels(col: &Column) -> Result<(Array1<usize>, Vec<String>)> {
    let mut names: Vec<String> = Vec::new();
    let mut targets = Vec::with_capacity(col.len());

    for (row, value) in col.str()?.into_iter().enumerate() {
        let value = value.ok_or_else(|| {
            MicroforestError::DataError(format!("missing label in row {}", row))
        })?;
        let idx = match names.iter().position(|n| n == value) {
            Some(idx) => idx,
            None => {
                names.push(value.to_string());
                names.len() - 1
            }
        };
        targets.push(idx);
    }

    Ok((Array1::from_vec(targets), names))
}

fn encode_numeric_labels(col: &Column) -> Result<(Array1<usize>, Vec<String>)> {
    let values: Vec<f64> = col
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|v| v.is_finite()).ok_or_else(|| {
                MicroforestError::DataError(format!("missing or non-finite label in row {}", row))
            })
        })
        .collect::<Result<_>>()?;

    let mut classes = values.clone();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();

    let targets = values
        .iter()
        .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
        .collect();
    let names = classes.iter().map(|c| format!("{}", c)).collect();

    Ok((Array1::from_vec(targets), names))
}

/// Extract named columns into a row-major feature matrix
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            let series = df
                .column(name)
                .map_err(|_| MicroforestError::DataError(format!("column '{}' not found", name)))?;
            let series_f64 = series.cast(&DataType::Float64).map_err(|e| {
                MicroforestError::DataError(format!("column '{}' is not numeric: {}", name, e))
            })?;
            series_f64
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.filter(|v| v.is_finite()).ok_or_else(|| {
                        MicroforestError::DataError(format!(
                            "missing, non-numeric or non-finite value in column '{}', row {}",
                            name, row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| {
        col_data[c][r]
    }))
}
