//! Integration tests for the `fleetscope` binary.
//!
//! Every test runs against static providers or files in a temp dir, so no
//! backend or real configuration is touched.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with env isolation.
fn fleetscope_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetscope");
    cmd.env("HOME", "/tmp/fleetscope-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fleetscope-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("FLEETSCOPE_CONFIG")
        .env_remove("FLEETSCOPE_CLUSTERS")
        .env_remove("FLEETSCOPE_ENVIRONMENTS")
        .env_remove("FLEETSCOPE_REGIONS")
        .env_remove("FLEETSCOPE_DISCOVERY__PROVIDER")
        .env_remove("FLEETSCOPE_ACCESS_CONTROL__PROVIDER");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const STATIC_CONFIG: &str = r#"
environment = "test"
region = "us-east-1"

[discovery]
provider = "static"

[[discovery.clusters]]
name = "orders"
env = "test"
region = "us-east-1"
datastoreType = "cassandra"

[[discovery.clusters.instances]]
hostname = "cass-1"
ip = "10.0.0.1"
status = "UP"

[[discovery.clusters]]
name = "sessions"
env = "test"
region = "us-east-1"
datastoreType = "redis"

[[discovery.clusters.instances]]
hostname = "redis-1"
ip = "10.0.1.1"
status = "UP"

[access_control]
provider = "static"

[access_control.owners]
orders = ["payments", "platform"]
"#;

const GOOD_DOCUMENT: &str = r#"[
  { "name": "orders", "env": "test", "region": "us-east-1",
    "datastoreType": "cassandra",
    "instances": [
      { "hostname": "cass-1", "ip": "10.0.0.1" },
      { "hostname": "cass-2", "ip": "10.0.0.2" }
    ] }
]"#;

fn static_config() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "fleetscope.toml", STATIC_CONFIG);
    (dir, path)
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fleetscope_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "Expected 'Usage' in output:\n{stderr}");
}

#[test]
fn test_help_lists_commands() {
    fleetscope_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("clusters")
            .and(predicate::str::contains("validate"))
            .and(predicate::str::contains("owners"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_completions_bash() {
    fleetscope_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetscope"));
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn test_validate_accepts_good_document() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "clusters.json", GOOD_DOCUMENT);
    fleetscope_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 cluster(s), 2 host(s)"));
}

#[test]
fn test_validate_rejects_missing_fields() {
    let dir = TempDir::new().unwrap();
    let file = write(
        dir.path(),
        "clusters.json",
        r#"[{ "name": "orders", "datastoreType": "cassandra" }]"#,
    );
    fleetscope_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn test_validate_rejects_non_json() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "clusters.json", "clusters: []");
    fleetscope_cmd().arg("validate").arg(&file).assert().code(6);
}

#[test]
fn test_validate_missing_file() {
    fleetscope_cmd()
        .args(["validate", "/tmp/fleetscope-cli-test-nonexistent/clusters.json"])
        .assert()
        .code(4);
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    fleetscope_cmd()
        .args(["--config", "/etc/fleetscope/custom.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/fleetscope/custom.toml"));
}

#[test]
fn test_config_show_merges_environment() {
    let (_dir, config) = static_config();
    fleetscope_cmd()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .arg("show")
        .env("FLEETSCOPE_USER_GROUPS__TTL", "15m")
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#"provider = "static""#)
                .and(predicate::str::contains(r#"ttl = "15m""#)),
        );
}

#[test]
fn test_config_show_rejects_bad_duration() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "fleetscope.toml",
        "[access_control]\npoll_interval = \"soon\"\n",
    );
    fleetscope_cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("access_control.poll_interval"));
}

// ── clusters ────────────────────────────────────────────────────────

#[test]
fn test_clusters_table_from_static_provider() {
    let (_dir, config) = static_config();
    fleetscope_cmd()
        .arg("--config")
        .arg(&config)
        .arg("clusters")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("orders")
                .and(predicate::str::contains("sessions"))
                .and(predicate::str::contains("cass-1")),
        );
}

#[test]
fn test_clusters_plain_filtered_by_type() {
    let (_dir, config) = static_config();
    fleetscope_cmd()
        .arg("--config")
        .arg(&config)
        .args(["clusters", "--type", "redis", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("redis:sessions:us-east-1:test\n"));
}

#[test]
fn test_clusters_from_environment_variable() {
    fleetscope_cmd()
        .args(["clusters", "-o", "json"])
        .env("FLEETSCOPE_CLUSTERS", GOOD_DOCUMENT)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""hostname": "cass-2""#));
}

#[test]
fn test_clusters_without_source_is_a_config_error() {
    fleetscope_cmd()
        .arg("clusters")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("FLEETSCOPE_CLUSTERS"));
}

#[test]
fn test_unknown_provider_is_rejected() {
    fleetscope_cmd()
        .arg("clusters")
        .env("FLEETSCOPE_DISCOVERY__PROVIDER", "consul")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("consul"));
}

// ── owners ──────────────────────────────────────────────────────────

#[test]
fn test_owners_json_from_static_provider() {
    let (_dir, config) = static_config();
    let output = fleetscope_cmd()
        .arg("--config")
        .arg(&config)
        .args(["owners", "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        r#"[{"cluster":"orders","groups":["payments","platform"]}]"#
    );
}
