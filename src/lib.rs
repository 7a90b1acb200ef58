//! microforest - random forests for microcontrollers
//!
//! Fits a random-forest classifier on a small tabular dataset, reports how
//! well it does, and ports the fitted forest to a dependency-free C/C++
//! header that runs on a microcontroller.
//!
//! # Modules
//!
//! - [`datasets`] - Embedded Iris dataset and CSV loading
//! - [`training`] - Train/test split, decision trees, random forests
//! - [`metrics`] - Confusion matrix and classification report
//! - [`export`] - Source code generation for embedded targets
//! - [`pipeline`] - The experiment and quick port runs
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data and models
pub mod datasets;
pub mod training;
pub mod metrics;

// Output
pub mod export;

// Runs
pub mod pipeline;
pub mod cli;

pub use error::{MicroforestError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{MicroforestError, Result};

    pub use crate::datasets::Dataset;

    pub use crate::training::{
        train_test_split, Criterion, DecisionTree, ForestConfig, MaxFeatures, RandomForest,
        TrainTestSplit, TreeNode,
    };

    pub use crate::metrics::{evaluate, ClassificationReport, ConfusionMatrix, Evaluation};

    pub use crate::export::{write_artifact, CodeExporter, ExportConfig, ExportFormat, PortableModel};

    pub use crate::pipeline::{
        run_experiment, run_port, DataSource, PipelineConfig, PipelineReport, PortReport,
    };
}
