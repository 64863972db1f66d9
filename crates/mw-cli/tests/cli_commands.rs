//! End-to-end tests for the `mw` command-line interface.

#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mw() -> Command {
    Command::cargo_bin("mw").unwrap()
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_prints_default_json() {
    let output = mw().arg("config").output().unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["seed"], 42);
    assert_eq!(config["spawn"]["grid_cell_size"], 150.0);
    assert_eq!(config["spawn"]["max_despawns_per_step"], 5);
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[test]
fn plan_shows_both_lanes() {
    mw().arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("automatic placement"))
        .stdout(predicate::str::contains("3 checkpoints"))
        .stdout(predicate::str::contains("organelle_component_fetch"))
        .stdout(predicate::str::contains("cell_counting"));
}

#[test]
fn plan_with_layout_uses_closing_checkpoint() {
    mw().args(["plan", "--layout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hand-written layout"))
        .stdout(predicate::str::contains("4 checkpoints"));
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_prints_summary() {
    mw().args(["run", "--ticks", "20", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation"))
        .stdout(predicate::str::contains("seed=7"))
        .stdout(predicate::str::contains("Population"))
        .stdout(predicate::str::contains("spawn events"));
}

#[test]
fn run_sequential_reports_mode() {
    mw().args(["run", "--ticks", "5", "--sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode=sequential"));
}

#[test]
fn run_without_workers_falls_back_to_sequential() {
    mw().args(["run", "--ticks", "5", "--workers", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode=sequential"));
}

#[test]
fn run_zero_delta_still_ticks() {
    mw().args(["run", "--ticks", "3", "--delta", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0s simulated"));
}

#[test]
fn run_verbose_shows_event_log() {
    mw().args(["run", "--ticks", "2", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Event Log"))
        .stdout(predicate::str::contains("spawn event at cell"));
}

#[test]
fn run_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "seed": 99, "spawn": { "max_alive_entities": 3 } }"#).unwrap();

    mw().args(["run", "--ticks", "10", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("seed=99"))
        .stdout(predicate::str::contains("dropped at cap"));
}

#[test]
fn run_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "spawn": { "grid_cell_size": -5 } }"#).unwrap();

    mw().args(["run", "--ticks", "1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("grid_cell_size"));
}

#[test]
fn run_missing_config_fails() {
    mw().args(["run", "--config", "/nonexistent/config.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn save_state_round_trips() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("spawn.json");

    mw().args(["run", "--ticks", "15", "--save-state"])
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Spawn state saved"));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    assert!(!saved["visited"].as_array().unwrap().is_empty());
    assert!(!saved["spawn_pool"].as_array().unwrap().is_empty());

    mw().args(["run", "--ticks", "5", "--load-state"])
        .arg(&state)
        .assert()
        .success();
}

#[test]
fn load_state_with_unknown_item_fails() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("spawn.json");
    mw().args(["run", "--ticks", "1", "--save-state"])
        .arg(&state)
        .assert()
        .success();

    let json = fs::read_to_string(&state)
        .unwrap()
        .replace("cloud:glucose", "cloud:unobtainium");
    fs::write(&state, json).unwrap();

    mw().args(["run", "--ticks", "1", "--load-state"])
        .arg(&state)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown spawn item"));
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands() {
    mw().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("config"));
}
