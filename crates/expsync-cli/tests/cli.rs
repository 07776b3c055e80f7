//! CLI end-to-end tests that fail before any remote call is made

use assert_cmd::Command;
use predicates::prelude::*;

fn expsync() -> Command {
    let mut cmd = Command::cargo_bin("expsync").unwrap();
    cmd.env_remove("EXPSYNC_PATH")
        .env_remove("EXPSYNC_WORKSPACE_ENDPOINT")
        .env_remove("EXPSYNC_WORKSPACE_ID")
        .env_remove("GITHUB_SHA");
    cmd
}

#[test]
fn required_arguments_are_enforced() {
    expsync()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--path"));
}

#[test]
fn zero_resolved_files_fail_with_a_message() {
    let dir = tempfile::tempdir().unwrap();
    expsync()
        .arg("--path")
        .arg(format!("{}/missing.json", dir.path().display()))
        .args(["--workspace-endpoint", "https://exp.azure.net"])
        .args(["--workspace-id", "ws1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration files found"));
}

#[test]
fn malformed_configuration_fails_with_the_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.json");
    std::fs::write(&path, "{ not json").unwrap();

    expsync()
        .arg("--path")
        .arg(path.display().to_string())
        .args(["--workspace-endpoint", "https://exp.azure.net"])
        .args(["--workspace-id", "ws1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse:"));
}

#[test]
fn annotation_without_sha_fails() {
    let dir = tempfile::tempdir().unwrap();
    expsync()
        .arg("--path")
        .arg(format!("{}/*.json", dir.path().display()))
        .args(["--workspace-endpoint", "https://exp.azure.net"])
        .args(["--workspace-id", "ws1"])
        .args(["--add-commit-hash-to-description", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Run environment is missing GITHUB_SHA variable",
        ));
}
