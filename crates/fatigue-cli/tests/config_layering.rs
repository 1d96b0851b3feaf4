//! Integration tests for configuration layering.
//!
//! Tests the priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use fatigue_test_support::SyntheticImageBuilder;
use predicates::prelude::*;

fn write_dataset(root: &Path) {
    for split in ["TRAIN", "VAL"] {
        SyntheticImageBuilder::write_faces(&root.join(split).join("fatigue"), 1, 0.005);
        SyntheticImageBuilder::write_faces(&root.join(split).join("rested"), 1, 0.08);
    }
}

fn run_params(tracking_root: &Path, experiment: &str) -> serde_json::Value {
    let run: PathBuf = fs::read_dir(tracking_root.join(experiment))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    serde_json::from_str(&fs::read_to_string(run.join("params.json")).unwrap()).unwrap()
}

fn train_cmd(cwd: &Path, xdg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fatigue").unwrap();
    cmd.current_dir(cwd)
        .env("XDG_CONFIG_HOME", xdg)
        .env_remove("RUST_LOG")
        .args(["train", "--quiet"]);
    cmd
}

#[test]
fn test_project_config_applies_training_settings() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_dataset(&temp_dir.path().join("faces"));
    fs::write(
        temp_dir.path().join(".fatigue-detect.toml"),
        r"
[training]
data_dir = 'faces'
epochs = 1
batch_size = 2
image_size = 24

[model]
path = 'out/model.safetensors'

[tracking]
dir = 'tracking'
experiment = 'from-project'
",
    )
    .unwrap();

    train_cmd(temp_dir.path(), temp_dir.path()).assert().success();

    assert!(temp_dir.path().join("out/model.safetensors").is_file());
    let params = run_params(&temp_dir.path().join("tracking"), "from-project");
    assert_eq!(params["epochs"], "1");
    assert_eq!(params["img_size"], "(24, 24)");
}

#[test]
fn test_cli_overrides_project_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_dataset(&temp_dir.path().join("faces"));
    fs::write(
        temp_dir.path().join(".fatigue-detect.toml"),
        r"
[training]
data_dir = 'faces'
epochs = 3
batch_size = 2
image_size = 24

[tracking]
dir = 'tracking'
",
    )
    .unwrap();

    train_cmd(temp_dir.path(), temp_dir.path())
        .args(["--epochs", "1", "--batch-size", "1"])
        .assert()
        .success();

    let params = run_params(&temp_dir.path().join("tracking"), "fatigue-face-detection");
    assert_eq!(params["epochs"], "1");
    assert_eq!(params["batch_size"], "1");
}

#[test]
fn test_project_config_overrides_xdg_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let xdg = temp_dir.path().join("xdg");
    fs::create_dir_all(xdg.join("fatigue-detect")).unwrap();
    fs::write(
        xdg.join("fatigue-detect").join("config.toml"),
        r"
[training]
data_dir = 'faces'
epochs = 2
batch_size = 2
image_size = 24

[tracking]
dir = 'tracking'
experiment = 'from-xdg'
",
    )
    .unwrap();

    let project = temp_dir.path().join("project");
    write_dataset(&project.join("faces"));
    fs::write(
        project.join(".fatigue-detect.toml"),
        r"
[training]
epochs = 1
",
    )
    .unwrap();

    train_cmd(&project, &xdg).assert().success();

    let params = run_params(&project.join("tracking"), "from-xdg");
    assert_eq!(params["epochs"], "1");
    assert_eq!(params["batch_size"], "2");
}

#[test]
fn test_invalid_config_value_falls_back() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_dataset(&temp_dir.path().join("faces"));
    fs::write(
        temp_dir.path().join(".fatigue-detect.toml"),
        r"
[training]
data_dir = 'faces'
epochs = 1
batch_size = 2
image_size = 24
learning_rate = -1.0

[tracking]
dir = 'tracking'
",
    )
    .unwrap();

    train_cmd(temp_dir.path(), temp_dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("training.learning_rate"));

    let params = run_params(&temp_dir.path().join("tracking"), "fatigue-face-detection");
    assert_eq!(params["learning_rate"], "0.001");
}

#[test]
fn test_unparsable_config_is_ignored() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join(".fatigue-detect.toml"), "[training\nepochs = ").unwrap();

    train_cmd(temp_dir.path(), temp_dir.path())
        .args(["--data-dir", "missing"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Failed to parse config file")
                .and(predicate::str::contains("Failed to load training images")),
        );
}
