//! Integration test: experiment and port runs end-to-end

use microforest::prelude::*;
use std::fs;
use std::path::PathBuf;

fn seeded(output: PathBuf, seed: u64) -> PipelineConfig {
    PipelineConfig::default()
        .with_seed(Some(seed))
        .with_output(output)
        .with_timestamp(false)
}

#[test]
fn test_experiment_defaults_with_seed() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("iris_classifier.h");

    let report = run_experiment(&seeded(output.clone(), 42)).unwrap();

    assert_eq!(report.n_samples, 150);
    assert_eq!(report.n_features, 4);
    assert_eq!(report.train_size, 113);
    assert_eq!(report.test_size, 37);
    assert_eq!(report.n_trees, 10);
    assert_eq!(report.train.predictions.len(), 113);
    assert_eq!(report.test.predictions.len(), 37);

    let code = fs::read_to_string(&output).unwrap();
    assert_eq!(code.len(), report.artifact_bytes);
    assert!(code.contains("#pragma once"));
    assert!(code.contains("class RandomForest {"));
    assert_eq!(code.matches("// tree #").count(), 10);
    for name in ["setosa", "versicolor", "virginica"] {
        assert!(code.contains(&format!("return \"{}\";", name)));
    }
}

#[test]
fn test_setosa_sample_is_class_zero() {
    let dir = tempfile::tempdir().unwrap();

    for seed in [0, 7, 42] {
        let report = run_experiment(&seeded(dir.path().join("out.h"), seed)).unwrap();
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.samples[0].features, vec![5.1, 3.5, 1.4, 0.2]);
        assert_eq!(report.samples[0].class, 0, "seed {}", seed);
        assert_eq!(report.samples[0].label, "setosa");
    }
}

#[test]
fn test_metric_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_experiment(&seeded(dir.path().join("out.h"), 11)).unwrap();

    for (subset, size) in [(&report.train, report.train_size), (&report.test, report.test_size)] {
        let eval = &subset.evaluation;
        assert_eq!(eval.confusion_matrix.total(), size);

        // Row sums equal the true-class supports
        let row_sums = eval.confusion_matrix.row_sums();
        for (class, scores) in eval.report.classes.iter().enumerate() {
            assert_eq!(row_sums[class], scores.support);
            assert!((0.0..=1.0).contains(&scores.precision));
            assert!((0.0..=1.0).contains(&scores.recall));
            assert!((0.0..=1.0).contains(&scores.f1_score));
        }
    }

    assert!(report.train.evaluation.report.accuracy > 0.95);
    assert!(report.test.evaluation.report.accuracy > 0.8);
}

#[test]
fn test_unseeded_runs_produce_valid_headers() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.h");
    let second = dir.path().join("second.h");

    run_experiment(&PipelineConfig::default().with_output(&first)).unwrap();
    run_experiment(&PipelineConfig::default().with_output(&second)).unwrap();

    for path in [&first, &second] {
        let code = fs::read_to_string(path).unwrap();
        assert!(code.starts_with("// Generated by microforest"));
        assert!(code.contains("int predict(float *x) {"));
        assert!(code.contains("const char* idxToLabel(uint8_t classIdx) {"));
        assert_eq!(code.matches('{').count(), code.matches('}').count());
    }
}

#[test]
fn test_load_failure_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("iris_classifier.h");

    let config = PipelineConfig::default()
        .with_source(DataSource::Csv {
            path: dir.path().join("does_not_exist.csv"),
            target: "species".to_string(),
        })
        .with_output(&output);

    assert!(run_experiment(&config).is_err());
    assert!(!output.exists());
}

#[test]
fn test_existing_artifact_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("iris_classifier.h");
    fs::write(&output, "stale contents").unwrap();

    run_experiment(&seeded(output.clone(), 1)).unwrap();

    let code = fs::read_to_string(&output).unwrap();
    assert!(!code.contains("stale contents"));
    assert!(code.contains("namespace Eloquent {"));
}

#[test]
fn test_stratified_plain_c_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("iris_model.h");

    let config = seeded(output.clone(), 5)
        .with_stratify(true)
        .with_format(ExportFormat::PlainC);
    let report = run_experiment(&config).unwrap();

    assert_eq!(report.train.evaluation.confusion_matrix.row_sums().to_vec(), vec![38, 38, 38]);

    let code = fs::read_to_string(&output).unwrap();
    assert!(code.contains("#ifndef IRIS_MODEL_H"));
    assert!(code.contains("static inline int iris_model_predict(const float *x)"));
    assert!(code.contains("#define IRIS_MODEL_N_FEATURES 4"));
}

#[test]
fn test_port_uses_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("classifier.h");

    let report = run_port(&seeded(output.clone(), 3)).unwrap();

    assert_eq!(report.n_samples, 150);
    assert_eq!(report.n_trees, 10);
    assert!(output.exists());
}

#[test]
fn test_experiment_on_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("blobs.csv");
    let mut rows = String::from("a,b,label\n");
    for i in 0..40 {
        let offset = if i % 2 == 0 { 0.0 } else { 10.0 };
        let label = if i % 2 == 0 { "low" } else { "high" };
        rows.push_str(&format!("{},{},{}\n", offset + (i as f64) * 0.1, offset, label));
    }
    fs::write(&csv, rows).unwrap();

    let config = seeded(dir.path().join("blobs.h"), 2)
        .with_source(DataSource::Csv {
            path: csv,
            target: "label".to_string(),
        })
        .with_samples(vec![vec![0.5, 0.0], vec![12.0, 10.0]]);
    let report = run_experiment(&config).unwrap();

    assert_eq!(report.train_size, 30);
    assert_eq!(report.test_size, 10);
    assert_eq!(report.samples[0].label, "low");
    assert_eq!(report.samples[1].label, "high");
    assert_eq!(report.test.evaluation.report.accuracy, 1.0);
}

#[test]
fn test_experiment_rejects_infinite_features() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("inf.csv");
    let mut rows = String::from("a,label\n");
    for i in 0..20 {
        rows.push_str(&format!("{},lo\n", i));
    }
    for _ in 0..20 {
        rows.push_str("inf,hi\n");
    }
    fs::write(&csv, rows).unwrap();

    let output = dir.path().join("inf.h");
    let config = seeded(output.clone(), 0).with_source(DataSource::Csv {
        path: csv,
        target: "label".to_string(),
    });

    assert!(matches!(run_experiment(&config), Err(MicroforestError::DataError(_))));
    assert!(!output.exists());
}
