//! Classifier export pipeline
//!
//! Two straight-line runs:
//! - [`run_experiment`]: load, split, fit, evaluate both subsets, classify
//!   the sample flowers and export the forest.
//! - [`run_port`]: fit on the whole dataset and export, nothing else.
//!
//! Neither prints; they return a report for the caller to render.

use crate::datasets::Dataset;
use crate::error::{MicroforestError, Result};
use crate::export::{write_artifact, CodeExporter, ExportConfig, ExportFormat};
use crate::metrics::{evaluate, Evaluation};
use crate::training::{train_test_split, ForestConfig, RandomForest};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Output file of the experiment run
pub const EXPERIMENT_OUTPUT: &str = "iris_classifier.h";
/// Output file of the quick port run
pub const PORT_OUTPUT: &str = "classifier.h";

/// Where the labeled samples come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    /// Embedded Iris dataset
    Iris,
    /// CSV file with a class column
    Csv { path: PathBuf, target: String },
}

impl DataSource {
    /// Load the dataset
    pub fn load(&self) -> Result<Dataset> {
        match self {
            DataSource::Iris => Dataset::iris(),
            DataSource::Csv { path, target } => Dataset::from_csv(path, target),
        }
    }

    /// Short human-readable name
    pub fn name(&self) -> String {
        match self {
            DataSource::Iris => "iris".to_string(),
            DataSource::Csv { path, .. } => path.display().to_string(),
        }
    }
}

/// One setosa, one versicolor and one virginica measurement
pub fn iris_samples() -> Vec<Vec<f64>> {
    vec![
        vec![5.1, 3.5, 1.4, 0.2],
        vec![6.2, 2.2, 4.5, 1.5],
        vec![6.1, 3.0, 4.9, 1.8],
    ]
}

/// Pipeline settings; defaults reproduce the fixed experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset to train on
    pub source: DataSource,
    /// Forest hyperparameters
    pub forest: ForestConfig,
    /// Fraction of samples used for training
    pub train_ratio: f64,
    /// Split each class at the same ratio
    pub stratify: bool,
    /// Seed for the split (the forest has its own)
    pub split_seed: Option<u64>,
    /// Literal feature vectors to classify after training
    pub samples: Vec<Vec<f64>>,
    /// Generated source flavour
    pub format: ExportFormat,
    /// Artifact path
    pub output: PathBuf,
    /// Stamp the generation time into the artifact
    pub timestamp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Iris,
            forest: ForestConfig::default(),
            train_ratio: 0.75,
            stratify: false,
            split_seed: None,
            samples: iris_samples(),
            format: ExportFormat::Eloquent,
            output: PathBuf::from(EXPERIMENT_OUTPUT),
            timestamp: true,
        }
    }
}

impl PipelineConfig {
    /// Set the dataset
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Set forest hyperparameters
    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Set train ratio
    pub fn with_train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = ratio;
        self
    }

    /// Seed both the split and the forest
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.split_seed = seed;
        self.forest.random_state = seed;
        self
    }

    /// Enable stratified splitting
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Set sample vectors
    pub fn with_samples(mut self, samples: Vec<Vec<f64>>) -> Self {
        self.samples = samples;
        self
    }

    /// Set output flavour
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set artifact path
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Enable or disable the artifact timestamp
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Predictions and scores for one subset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsetResult {
    pub predictions: Vec<usize>,
    pub evaluation: Evaluation,
}

/// Classification of one literal sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePrediction {
    pub features: Vec<f64>,
    pub class: usize,
    pub label: String,
}

/// Everything the experiment run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub dataset: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub n_trees: usize,
    pub feature_importances: Vec<(String, f64)>,
    pub train: SubsetResult,
    pub test: SubsetResult,
    pub samples: Vec<SamplePrediction>,
    pub artifact: PathBuf,
    pub artifact_bytes: usize,
    pub elapsed_secs: f64,
}

/// Result of the quick port run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortReport {
    pub dataset: String,
    pub n_samples: usize,
    pub n_trees: usize,
    pub artifact: PathBuf,
    pub artifact_bytes: usize,
}

fn evaluate_subset(forest: &RandomForest, data: &Dataset) -> Result<SubsetResult> {
    let predictions: Array1<usize> = forest.predict(&data.records)?;
    debug!(predictions = ?predictions.to_vec(), "Subset predictions");
    let evaluation = evaluate(&data.targets, &predictions, &data.target_names)?;
    Ok(SubsetResult {
        predictions: predictions.to_vec(),
        evaluation,
    })
}

fn export_forest(
    forest: &RandomForest,
    dataset: &Dataset,
    format: ExportFormat,
    output: &Path,
    timestamp: bool,
) -> Result<usize> {
    let prefix = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("classifier");
    let config = ExportConfig::new(dataset.target_names.clone())
        .with_format(format)
        .with_prefix(prefix)
        .with_timestamp(timestamp);

    let source = CodeExporter::new(config).port(forest)?;
    write_artifact(output, &source)?;
    info!(path = %output.display(), bytes = source.len(), "Exported classifier");
    Ok(source.len())
}

/// Run the full experiment described by `config`
pub fn run_experiment(config: &PipelineConfig) -> Result<PipelineReport> {
    let start = Instant::now();

    let dataset = config.source.load()?;
    info!(
        dataset = %config.source.name(),
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        classes = dataset.n_classes(),
        "Loaded dataset"
    );

    for (i, sample) in config.samples.iter().enumerate() {
        if sample.len() != dataset.n_features() {
            return Err(MicroforestError::ShapeError {
                expected: format!("{} features in sample {}", dataset.n_features(), i),
                actual: format!("{} features", sample.len()),
            });
        }
    }

    let split = train_test_split(&dataset, config.train_ratio, config.split_seed, config.stratify)?;
    info!(
        train = split.train.n_samples(),
        test = split.test.n_samples(),
        stratify = config.stratify,
        "Split dataset"
    );
    let missing = split.train.class_counts().iter().filter(|&&c| c == 0).count();
    if missing > 0 {
        warn!(missing, "Training subset lacks some classes");
    }

    let mut forest = config.forest.build();
    forest.fit(&split.train.records, &split.train.targets, dataset.n_classes())?;
    info!(trees = forest.n_trees(), "Fitted random forest");

    let train = evaluate_subset(&forest, &split.train)?;
    let test = evaluate_subset(&forest, &split.test)?;
    info!(
        train_accuracy = train.evaluation.report.accuracy,
        test_accuracy = test.evaluation.report.accuracy,
        "Evaluated"
    );

    let samples = config
        .samples
        .iter()
        .map(|features| -> Result<SamplePrediction> {
            let class = forest.predict_one(features)?;
            Ok(SamplePrediction {
                features: features.clone(),
                class,
                label: dataset.target_name(class).to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let artifact_bytes =
        export_forest(&forest, &dataset, config.format, &config.output, config.timestamp)?;

    let feature_importances: Vec<(String, f64)> = forest
        .feature_importances()
        .map(|imp| {
            dataset
                .feature_names
                .iter()
                .cloned()
                .zip(imp.iter().copied())
                .collect()
        })
        .unwrap_or_default();

    Ok(PipelineReport {
        dataset: config.source.name(),
        n_samples: dataset.n_samples(),
        n_features: dataset.n_features(),
        train_size: split.train.n_samples(),
        test_size: split.test.n_samples(),
        n_trees: forest.n_trees(),
        feature_importances,
        train,
        test,
        samples,
        artifact: config.output.clone(),
        artifact_bytes,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

/// Fit on every sample and export, skipping evaluation
pub fn run_port(config: &PipelineConfig) -> Result<PortReport> {
    let dataset = config.source.load()?;

    let mut forest = config.forest.build();
    forest.fit(&dataset.records, &dataset.targets, dataset.n_classes())?;
    info!(trees = forest.n_trees(), samples = dataset.n_samples(), "Fitted random forest");

    let artifact_bytes =
        export_forest(&forest, &dataset, config.format, &config.output, config.timestamp)?;

    Ok(PortReport {
        dataset: config.source.name(),
        n_samples: dataset.n_samples(),
        n_trees: forest.n_trees(),
        artifact: config.output.clone(),
        artifact_bytes,
    })
}
