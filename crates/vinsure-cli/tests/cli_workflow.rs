#![allow(deprecated)] // cargo_bin is deprecated but still functional

/// E2E tests for the train/predict workflow
///
/// Projects run without a remote bucket or MongoDB URI, so training uses
/// synthetic data and models live under the local artifact directory.
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const VINSURE_ENV: [&str; 6] = [
    "VINSURE_REMOTE__BUCKET",
    "VINSURE_SOURCE__URI",
    "VINSURE_ARTIFACTS__ROOT",
    "VINSURE_ARTIFACTS__MODEL_FILE",
    "VINSURE_TRAINING__SYNTHETIC_DATA",
    "RUST_LOG",
];

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vinsure").unwrap();
        cmd.current_dir(self.root());
        for name in VINSURE_ENV {
            cmd.env_remove(name);
        }
        cmd
    }

    fn init(&self) {
        self.cmd().arg("init").assert().success();
    }

    fn predict_args(damaged: bool) -> Vec<String> {
        let flag = if damaged { "1" } else { "0" };
        let insured = if damaged { "0" } else { "1" };
        [
            "predict",
            "--gender",
            "1",
            "--age",
            "44",
            "--driving-license",
            "1",
            "--region-code",
            "28",
            "--previously-insured",
            insured,
            "--annual-premium",
            "40454",
            "--policy-sales-channel",
            "26",
            "--vintage",
            "217",
            "--vehicle-age-gt-2-years",
            "1",
            "--vehicle-damage-yes",
            flag,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

// -- Init tests --

#[test]
fn test_init_writes_default_config() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized vinsure project"))
        .stdout(predicate::str::contains("(local only)"));

    let config = std::fs::read_to_string(ctx.root().join(".vinsure/config.toml")).unwrap();
    assert!(config.contains("model_file = \"model.pkl\""));
    assert!(ctx.root().join("artifact").is_dir());
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vinsure init"));
}

// -- Predict tests --

#[test]
fn test_predict_without_model_fails() {
    let ctx = TestContext::new();
    ctx.init();

    ctx.cmd()
        .args(TestContext::predict_args(true))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no model available"));
}

#[test]
fn test_predict_rejects_invalid_flag() {
    let ctx = TestContext::new();
    ctx.init();

    let mut args = TestContext::predict_args(true);
    args.extend(["--vehicle-age-lt-1-year".to_string(), "1".to_string()]);

    ctx.cmd()
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("schema mismatch"));
}

// -- Train tests --

#[test]
fn test_train_then_predict() {
    let ctx = TestContext::new();
    ctx.init();

    let output = ctx.cmd().args(["train", "--json"]).output().unwrap();
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["ingestion"]["origin"], "synthetic");
    assert_eq!(outcome["evaluation"]["best_prior_score"], serde_json::Value::Null);

    if outcome["promotion"].is_null() {
        return;
    }
    assert!(ctx.root().join("artifact/production_model/model.pkl").exists());

    ctx.cmd()
        .args(TestContext::predict_args(true))
        .assert()
        .success()
        .stdout(predicate::str::is_match("Response-(Yes|No)").unwrap());
}

#[test]
fn test_train_rejects_synthetic_data_when_configured() {
    let ctx = TestContext::new();
    ctx.init();

    ctx.cmd()
        .args(["config", "set", "training.synthetic_data", "reject"])
        .assert()
        .success();

    ctx.cmd()
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to train"));
}

// -- Status and fetch tests --

#[test]
fn test_status_reports_local_backend() {
    let ctx = TestContext::new();
    ctx.init();

    ctx.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend: local"))
        .stdout(predicate::str::contains("absent"))
        .stdout(predicate::str::contains("not configured"));
}

#[test]
fn test_fetch_falls_back_to_synthetic_records() {
    let ctx = TestContext::new();
    ctx.init();

    let output = ctx.cmd().arg("fetch").output().unwrap();
    assert!(output.status.success());
    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 100);
    assert!(records[0].get("Vehicle_Damage").is_some());
}

// -- Config tests --

#[test]
fn test_config_set_then_get() {
    let ctx = TestContext::new();
    ctx.init();

    ctx.cmd()
        .args(["config", "set", "source.collection", "Proj2-Data"])
        .assert()
        .success();

    ctx.cmd()
        .args(["config", "get", "source.collection"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Proj2-Data"));
}

#[test]
fn test_config_unknown_key_fails() {
    let ctx = TestContext::new();
    ctx.init();

    ctx.cmd()
        .args(["config", "get", "no.such.key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}
