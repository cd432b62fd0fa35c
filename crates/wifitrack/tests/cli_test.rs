//! Integration tests for the `wifitrack` CLI binary.
//!
//! These tests validate argument parsing, trace replay against the bundled
//! sample traces, config file handling, and exit codes.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `wifitrack` binary with env isolation.
///
/// Clears `WIFITRACK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn wifitrack_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wifitrack");
    cmd.env("HOME", "/tmp/wifitrack-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/wifitrack-cli-test-nonexistent")
        .env_remove("WIFITRACK_OUTPUT")
        .env_remove("WIFITRACK_CONFIG")
        .env_remove("WIFITRACK_DEFAULTS__OUTPUT")
        .env_remove("WIFITRACK_DEFAULTS__COLOR")
        .env_remove("WIFITRACK_DEFAULTS__CONNECT_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn sample(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("traces")
        .join(name)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn replay_json(args: &[&str]) -> serde_json::Value {
    let output = wifitrack_cmd()
        .arg("replay")
        .args(args)
        .args(["-o", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "replay failed:\n{}",
        combined_output(&output)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = wifitrack_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    wifitrack_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Wi-Fi")
            .and(predicate::str::contains("replay"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    wifitrack_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wifitrack"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    wifitrack_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    wifitrack_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Replay ──────────────────────────────────────────────────────────

#[test]
fn test_replay_connect_reaches_validated_default() {
    let path = sample("connect.yaml");
    let report = replay_json(&[path.to_str().unwrap()]);

    assert_eq!(report["key"], "SSID:Home;PSK");
    let last = &report["final_view"];
    assert_eq!(last["connected_state"], "connected");
    assert_eq!(last["has_internet_access"], true);
    assert_eq!(last["is_default_network"], true);
    assert_eq!(last["connected_snapshot"]["ipv4_address"], "192.168.1.20");
    assert_eq!(last["connected_snapshot"]["gateway_address"], "192.168.1.1");

    let actions = report["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["kind"], "connect");
    assert_eq!(actions[0]["status"], "success");
    assert_eq!(actions[0]["at_ms"], 300);

    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 8);
    assert_eq!(steps[1]["view"]["connected_state"], "connecting");
}

#[test]
fn test_replay_timeout_fails_connect() {
    let path = sample("timeout.json");
    let report = replay_json(&[path.to_str().unwrap()]);
    let actions = report["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["status"], "failure_unknown");
    assert_eq!(actions[0]["at_ms"], 10_000);
}

#[test]
fn test_replay_timeout_flag_override() {
    let path = sample("timeout.json");
    let report = replay_json(&[path.to_str().unwrap(), "--connect-timeout-ms", "500"]);
    assert_eq!(report["actions"][0]["at_ms"], 500);
}

#[test]
fn test_replay_timeout_env_override() {
    let path = sample("timeout.json");
    let output = wifitrack_cmd()
        .env("WIFITRACK_DEFAULTS__CONNECT_TIMEOUT_MS", "750")
        .args(["replay", path.to_str().unwrap(), "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["actions"][0]["at_ms"], 750);
}

#[test]
fn test_replay_zero_timeout_is_usage_error() {
    let path = sample("timeout.json");
    let output = wifitrack_cmd()
        .args(["replay", path.to_str().unwrap(), "--connect-timeout-ms", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("connect-timeout-ms"));
}

#[test]
fn test_replay_captive_portal_plain() {
    let path = sample("captive_portal.yaml");
    wifitrack_cmd()
        .args(["replay", path.to_str().unwrap(), "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("0ms sign_in success")
                .and(predicate::str::contains("150ms disconnect success"))
                .and(predicate::str::contains("SSID:Airport;OPEN")),
        );
}

#[test]
fn test_replay_table_output() {
    let path = sample("connect.yaml");
    wifitrack_cmd()
        .args(["replay", path.to_str().unwrap(), "--color", "never"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Event")
                .and(predicate::str::contains("connected"))
                .and(predicate::str::contains("success")),
        );
}

#[test]
fn test_replay_final_only() {
    let path = sample("connect.yaml");
    let report = replay_json(&[path.to_str().unwrap(), "--final-only"]);
    assert!(report["steps"].as_array().unwrap().is_empty());
    assert_eq!(report["final_view"]["connected_state"], "connected");
}

#[test]
fn test_replay_reads_stdin() {
    let trace = "entry: { kind: standard, ssid: Home, security: PSK }\n\
                 manager: { forget: reject }\n\
                 steps:\n  - op: forget\n";
    let output = wifitrack_cmd()
        .args(["replay", "-", "-o", "json"])
        .write_stdin(trace)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["actions"][0]["kind"], "forget");
    assert_eq!(report["actions"][0]["status"], "failure_unknown");
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = wifitrack_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_replay_missing_trace() {
    let output = wifitrack_cmd()
        .args(["replay", "/tmp/wifitrack-cli-test-nonexistent/none.yaml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Could not read trace file"));
}

#[test]
fn test_replay_invalid_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(
        &path,
        "entry: { kind: standard, ssid: Home, security: PSK }\nsteps:\n  - op: reboot\n",
    )
    .unwrap();

    let output = wifitrack_cmd()
        .args(["replay", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Invalid trace"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_respects_flag() {
    wifitrack_cmd()
        .args(["config", "path", "--config", "/tmp/wifitrack-custom.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/wifitrack-custom.toml"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_str = path.to_str().unwrap();

    wifitrack_cmd()
        .args(["config", "init", "--config", path_str])
        .assert()
        .success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("connect_timeout_ms = 10000"));

    let output = wifitrack_cmd()
        .args(["config", "init", "--config", path_str])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("already exists"));

    wifitrack_cmd()
        .args(["config", "init", "--force", "--config", path_str])
        .assert()
        .success();
}

#[test]
fn test_config_show_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[defaults]\noutput = \"json\"\nconnect_timeout_ms = 2500\n").unwrap();

    let output = wifitrack_cmd()
        .args(["config", "show", "--config", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["defaults"]["connect_timeout_ms"], 2500);
    assert_eq!(shown["defaults"]["color"], "auto");
}

#[test]
fn test_config_invalid_value_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[defaults]\ncolor = \"rainbow\"\n").unwrap();

    let output = wifitrack_cmd()
        .args(["config", "show", "--config", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("defaults.color"));
}
