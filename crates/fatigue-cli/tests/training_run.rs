//! End-to-end training through the CLI on a tiny synthetic dataset.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use fatigue_test_support::SyntheticImageBuilder;
use predicates::prelude::*;

fn write_dataset(root: &Path) {
    for split in ["TRAIN", "VAL"] {
        let count = if split == "TRAIN" { 2 } else { 1 };
        SyntheticImageBuilder::write_faces(&root.join(split).join("Fatigue"), count, 0.005);
        SyntheticImageBuilder::write_faces(&root.join(split).join("Non_Fatigue"), count, 0.08);
    }
}

fn only_run_dir(experiment_dir: &Path) -> std::path::PathBuf {
    let runs: Vec<_> = fs::read_dir(experiment_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1);
    runs.into_iter().next().unwrap()
}

#[test]
fn test_train_writes_model_and_run() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data = temp_dir.path().join("Data").join("etat_des_joueurs");
    write_dataset(&data);

    let mut cmd = Command::cargo_bin("fatigue").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path())
        .env_remove("RUST_LOG")
        .args([
            "train",
            "--image-size",
            "32",
            "--epochs",
            "1",
            "--batch-size",
            "2",
            "--seed",
            "3",
        ]);

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("Training complete after 1 epoch(s)")
                .and(predicate::str::contains("Model saved to")),
        );

    let model = temp_dir.path().join("Model").join("fatigue_model.safetensors");
    assert!(model.is_file());

    let run_dir = only_run_dir(
        &temp_dir
            .path()
            .join("Ml_flow_runs")
            .join("fatigue-face-detection"),
    );
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("-cnn-fatigue-v1"));

    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("meta.json")).unwrap()).unwrap();
    assert_eq!(meta["status"], "FINISHED");
    assert!(meta["end_time"].is_string());

    let params: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("params.json")).unwrap()).unwrap();
    assert_eq!(params["epochs"], "1");
    assert_eq!(params["batch_size"], "2");
    assert_eq!(params["optimizer"], "Adam");
    assert_eq!(params["seed"], "3");
}

#[test]
fn test_failed_training_marks_run_failed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data = temp_dir.path().join("data");
    // Class directories exist but contain no images.
    for split in ["TRAIN", "VAL"] {
        fs::create_dir_all(data.join(split).join("Fatigue")).unwrap();
        fs::create_dir_all(data.join(split).join("Non_Fatigue")).unwrap();
    }

    let mut cmd = Command::cargo_bin("fatigue").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path())
        .args(["train", "--data-dir", "data", "--tracking-dir", "runs", "--quiet"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("training set is empty"));

    let run_dir = only_run_dir(&temp_dir.path().join("runs").join("fatigue-face-detection"));
    let meta = fs::read_to_string(run_dir.join("meta.json")).unwrap();
    assert!(meta.contains("\"FAILED\""));
    assert!(!temp_dir.path().join("Model").exists());
}

#[test]
fn test_mismatched_split_classes_are_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data = temp_dir.path().join("data");
    SyntheticImageBuilder::write_faces(&data.join("TRAIN").join("Fatigue"), 1, 0.005);
    SyntheticImageBuilder::write_faces(&data.join("TRAIN").join("Non_Fatigue"), 1, 0.08);
    SyntheticImageBuilder::write_faces(&data.join("VAL").join("tired"), 1, 0.005);
    SyntheticImageBuilder::write_faces(&data.join("VAL").join("awake"), 1, 0.08);

    let mut cmd = Command::cargo_bin("fatigue").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path())
        .args(["train", "--data-dir", "data", "--tracking-dir", "runs", "--quiet"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("class directories differ"));

    assert!(!temp_dir.path().join("runs").exists());
    assert!(!temp_dir.path().join("Model").exists());
}
