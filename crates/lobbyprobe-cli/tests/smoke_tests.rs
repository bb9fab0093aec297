//! Smoke tests for the lobbyprobe CLI
//!
//! These never launch a browser: they cover argument handling, the offline
//! commands and the failure paths that stop a run before launch.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the lobbyprobe binary
fn lobbyprobe() -> Command {
    let mut cmd = Command::cargo_bin("lobbyprobe").expect("lobbyprobe binary should exist");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_plan(dir: &Path) {
    fs::write(
        dir.join("targets.yaml"),
        "targets:\n  select_a_game_header:\n    type: text\n    synonyms: [\"Select a Game\"]\n  operator_label:\n    type: text\n  currency_label:\n    type: text\n",
    )
    .unwrap();
    fs::write(
        dir.join("actions.yaml"),
        "canonical_menu_actions:\n  operator_and_currency:\n    - name: select_operator\n    - name: select_currency\n      constraints:\n        allowed_values_by_operator:\n          WowVegas: [SC, WOW]\n          \".com\": [USD]\n",
    )
    .unwrap();
    fs::write(
        dir.join("tiles.yaml"),
        "tiles:\n  edg1002: Mega Fortune\n  edg201: Lucky Sevens\n",
    )
    .unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    lobbyprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    lobbyprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("variants"));
}

#[test]
fn test_no_args_fails() {
    lobbyprobe().assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    lobbyprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--stop-on-fail"))
        .stdout(predicate::str::contains("--currencies"));
}

// ============================================================================
// Variants
// ============================================================================

#[test]
fn test_variants_for_operator() {
    lobbyprobe()
        .args(["--color", "never", "variants", "WowVegas"])
        .assert()
        .success()
        .stdout(predicate::str::contains("canonical: WowVegas"))
        .stdout(predicate::str::contains("Wow Vegas"));
}

#[test]
fn test_variants_for_dotcom() {
    lobbyprobe()
        .args(["--color", "never", "variants", ".com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("canonical: DotCom"));
}

// ============================================================================
// Config Validation
// ============================================================================

#[test]
fn test_config_prints_matrix_and_catalog() {
    let dir = TempDir::new().unwrap();
    write_plan(dir.path());
    lobbyprobe()
        .current_dir(dir.path())
        .args([
            "--color",
            "never",
            "config",
            "--targets",
            "targets.yaml",
            "--actions",
            "actions.yaml",
            "--tiles",
            "tiles.yaml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("WowVegas: SC, WOW"))
        .stdout(predicate::str::contains("DotCom: USD"))
        .stdout(predicate::str::contains("edg201 Lucky Sevens"))
        .stdout(predicate::str::contains("configuration OK"));
}

#[test]
fn test_config_defaults_to_plans_dir() {
    let dir = TempDir::new().unwrap();
    let plans = dir.path().join("plans");
    fs::create_dir(&plans).unwrap();
    write_plan(&plans);
    lobbyprobe()
        .current_dir(dir.path())
        .args(["-q", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration OK"))
        .stdout(predicate::str::contains("Games").not());
}

#[test]
fn test_config_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    lobbyprobe()
        .current_dir(dir.path())
        .args(["config", "--tiles", "nowhere.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_config_malformed_yaml_fails() {
    let dir = TempDir::new().unwrap();
    write_plan(dir.path());
    fs::write(dir.path().join("tiles.yaml"), "tiles: [unterminated").unwrap();
    lobbyprobe()
        .current_dir(dir.path())
        .args([
            "config",
            "--targets",
            "targets.yaml",
            "--actions",
            "actions.yaml",
            "--tiles",
            "tiles.yaml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tiles"));
}

// ============================================================================
// Run Failure Paths
// ============================================================================

#[test]
fn test_run_without_config_fails_before_launch() {
    let dir = TempDir::new().unwrap();
    lobbyprobe()
        .current_dir(dir.path())
        .args(["run", "--headless"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_run_rejects_bad_dwell() {
    lobbyprobe()
        .args(["run", "--dwell", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dwell"));
}

#[test]
fn test_variants_json() {
    let output = lobbyprobe().args(["variants", "--json", "SOC"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["currency"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == "S0C"));
}
