//! microforest CLI Module
//!
//! Command-line interface for the experiment and quick port runs. Every flag
//! is optional; with none, the fixed Iris experiment runs.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;

use crate::export::ExportFormat;
use crate::metrics::Evaluation;
use crate::pipeline::{
    iris_samples, run_experiment, run_port, DataSource, PipelineConfig, PipelineReport,
    PortReport, EXPERIMENT_OUTPUT, PORT_OUTPUT,
};
use crate::training::{Criterion, ForestConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn indented(block: &str) {
    for line in block.lines() {
        println!("  {}", line);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "microforest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a random forest and port it to a microcontroller header")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split, fit, evaluate, classify the sample flowers and export (default)
    Experiment {
        #[command(flatten)]
        args: RunArgs,

        /// Fraction of samples used for training
        #[arg(long, default_value_t = 0.75)]
        train_ratio: f64,

        /// Split each class at the same ratio
        #[arg(long)]
        stratify: bool,

        /// Feature vector to classify after training, comma separated (repeatable)
        #[arg(long = "sample", value_name = "X1,X2,...")]
        samples: Vec<String>,
    },

    /// Fit on the whole dataset and export, without evaluation
    Port {
        #[command(flatten)]
        args: RunArgs,
    },
}

/// Flags shared by both runs
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// CSV file to train on instead of the embedded Iris dataset
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Class column of the CSV file
    #[arg(short, long, default_value = "species")]
    pub target: String,

    /// Number of trees
    #[arg(short = 'n', long, default_value_t = 10)]
    pub estimators: usize,

    /// Maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Split quality criterion
    #[arg(long, value_enum, default_value_t = CriterionArg::Gini)]
    pub criterion: CriterionArg,

    /// Random seed; omit for a different forest every run
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Generated source flavour
    #[arg(short, long, value_enum, default_value_t = FormatArg::Eloquent)]
    pub format: FormatArg,

    /// Output header path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Leave the generation time out of the header
    #[arg(long)]
    pub no_timestamp: bool,

    /// Print the run report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            data: None,
            target: "species".to_string(),
            estimators: 10,
            max_depth: None,
            criterion: CriterionArg::Gini,
            seed: None,
            format: FormatArg::Eloquent,
            output: None,
            no_timestamp: false,
            json: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CriterionArg {
    Gini,
    Entropy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// C++ class header (Arduino)
    Eloquent,
    /// Plain C99 header
    PlainC,
}

impl RunArgs {
    /// Map flags onto a pipeline configuration
    pub fn to_config(&self, default_output: &str) -> PipelineConfig {
        let source = match &self.data {
            Some(path) => DataSource::Csv {
                path: path.clone(),
                target: self.target.clone(),
            },
            None => DataSource::Iris,
        };

        let criterion = match self.criterion {
            CriterionArg::Gini => Criterion::Gini,
            CriterionArg::Entropy => Criterion::Entropy,
        };
        let format = match self.format {
            FormatArg::Eloquent => ExportFormat::Eloquent,
            FormatArg::PlainC => ExportFormat::PlainC,
        };

        let forest = ForestConfig::default()
            .with_n_estimators(self.estimators)
            .with_max_depth(self.max_depth)
            .with_criterion(criterion);

        let samples = match source {
            DataSource::Iris => iris_samples(),
            DataSource::Csv { .. } => Vec::new(),
        };

        PipelineConfig::default()
            .with_source(source)
            .with_forest(forest)
            .with_seed(self.seed)
            .with_samples(samples)
            .with_format(format)
            .with_output(
                self.output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(default_output)),
            )
            .with_timestamp(!self.no_timestamp)
    }
}

/// Parse `"5.1,3.5,1.4,0.2"` into a feature vector
pub fn parse_sample(text: &str) -> anyhow::Result<Vec<f64>> {
    text.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("invalid sample value '{}': {}", v.trim(), e))
        })
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_experiment(
    args: &RunArgs,
    train_ratio: f64,
    stratify: bool,
    samples: &[String],
) -> anyhow::Result<()> {
    let mut config = args
        .to_config(EXPERIMENT_OUTPUT)
        .with_train_ratio(train_ratio)
        .with_stratify(stratify);
    if !samples.is_empty() {
        config = config.with_samples(
            samples
                .iter()
                .map(|s| parse_sample(s))
                .collect::<anyhow::Result<_>>()?,
        );
    }

    let report = run_experiment(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_experiment(&report);
    }
    Ok(())
}

pub fn cmd_port(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.to_config(PORT_OUTPUT);
    let report = run_port(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_port(&report);
    }
    Ok(())
}

// ─── Rendering ─────────────────────────────────────────────────────────────────

fn print_evaluation(title: &str, eval: &Evaluation) {
    section(title);
    indented(&eval.report.clone().with_digits(3).to_string());
    println!();
    println!("  {}", muted("Confusion matrix"));
    indented(&eval.confusion_matrix.to_string());
}

fn print_experiment(report: &PipelineReport) {
    section("Dataset");
    kv("Source", &report.dataset);
    kv("Shape", &format!("{} × {}", report.n_samples, report.n_features));
    kv("Split", &format!("{} train / {} test", report.train_size, report.test_size));

    section("Model");
    kv("Random forest", &format!("{} trees", report.n_trees));
    for (name, importance) in &report.feature_importances {
        kv(name, &format!("{:.3}", importance));
    }

    print_evaluation("Precision, recall, confusion matrix (training)", &report.train.evaluation);
    print_evaluation("Precision, recall, confusion matrix (testing)", &report.test.evaluation);

    if !report.samples.is_empty() {
        section("Samples");
        for sample in &report.samples {
            let features: Vec<String> = sample.features.iter().map(|v| v.to_string()).collect();
            println!(
                "  [{}]  {}  {}",
                features.join(", "),
                dim("→"),
                accent(&format!("{} ({})", sample.class, sample.label))
            );
        }
    }

    println!();
    step_ok(&format!(
        "Wrote {} ({} bytes) in {:.2}s",
        report.artifact.display(),
        report.artifact_bytes,
        report.elapsed_secs
    ));
    println!();
}

fn print_port(report: &PortReport) {
    section("Port");
    kv("Source", &report.dataset);
    kv("Samples", &report.n_samples.to_string());
    kv("Random forest", &format!("{} trees", report.n_trees));
    println!();
    step_ok(&format!(
        "Wrote {} ({} bytes)",
        report.artifact.display(),
        report.artifact_bytes
    ));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_experiment_defaults() {
        let cli = Cli::parse_from(["microforest"]);
        assert!(cli.command.is_none());

        let config = RunArgs::default().to_config(EXPERIMENT_OUTPUT);
        assert_eq!(config.source, DataSource::Iris);
        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.output, PathBuf::from("iris_classifier.h"));
        assert_eq!(config.samples, iris_samples());
        assert!(config.split_seed.is_none());
    }

    #[test]
    fn test_port_flags() {
        let cli = Cli::parse_from([
            "microforest", "port", "-n", "25", "--seed", "3", "--format", "plain-c",
        ]);
        let Some(Commands::Port { args }) = cli.command else {
            panic!("expected port command");
        };

        let config = args.to_config(PORT_OUTPUT);
        assert_eq!(config.forest.n_estimators, 25);
        assert_eq!(config.forest.random_state, Some(3));
        assert_eq!(config.split_seed, Some(3));
        assert_eq!(config.format, ExportFormat::PlainC);
        assert_eq!(config.output, PathBuf::from("classifier.h"));
    }

    #[test]
    fn test_csv_source_drops_iris_samples() {
        let cli = Cli::parse_from([
            "microforest", "experiment", "--data", "wine.csv", "--target", "class",
        ]);
        let Some(Commands::Experiment { args, .. }) = cli.command else {
            panic!("expected experiment command");
        };

        let config = args.to_config(EXPERIMENT_OUTPUT);
        assert!(matches!(config.source, DataSource::Csv { ref target, .. } if target == "class"));
        assert!(config.samples.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        assert_eq!(parse_sample("5.1, 3.5,1.4,0.2").unwrap(), vec![5.1, 3.5, 1.4, 0.2]);
        assert!(parse_sample("1.0,abc").is_err());
    }
}
