//! End-to-end CLI tests for the harvester binary.

use assert_cmd::Command;
use predicates::prelude::*;

const KEY_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "GOOGLE_GEMINI_API_KEY",
];

/// Binary with no provider keys and an empty config directory.
fn harvester(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    for var in KEY_VARS {
        cmd.env_remove(var);
    }
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ask several LLM providers"))
        .stdout(predicate::str::contains("--check-reachability"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("harvester"));
}

#[test]
fn test_binary_missing_question_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUESTION"));
}

#[test]
fn test_binary_without_keys_reports_no_providers() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .arg("best savings accounts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no providers enabled"))
        .stderr(predicate::str::contains("Suggestion"));
}

#[test]
fn test_binary_enabled_provider_without_key_is_not_configured() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .args(["best savings accounts", "--provider", "claude"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'anthropic' is enabled but not configured"));
}

#[test]
fn test_binary_out_of_range_cap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    harvester(dir.path())
        .args(["q", "--max-per-provider", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("99"));
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("harvester");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "concurrency = 4\n").unwrap();

    harvester(dir.path())
        .arg("q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_binary_explicit_config_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "providers = \"mistral\"\n").unwrap();

    harvester(dir.path())
        .args(["q", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid `providers` entry"));
}
