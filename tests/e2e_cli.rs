//! CLI end-to-end tests
//!
//! Tests for the comicshelf command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the comicshelf binary
#[allow(deprecated)]
fn comicshelf_cmd() -> Command {
    Command::cargo_bin("comicshelf").unwrap()
}

/// A command pointed at `data` and `root`.
fn library_cmd(data: &Path, root: &Path) -> Command {
    let mut cmd = comicshelf_cmd();
    cmd.arg("--data-dir").arg(data).arg("--root").arg(root);
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = comicshelf_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = comicshelf_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "comicshelf {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_scan_help() {
    let mut cmd = comicshelf_cmd();
    cmd.args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan the library"));
}

#[test]
fn test_cli_validate_default_config() {
    let mut cmd = comicshelf_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("library.roots is empty"));
}

#[test]
fn test_cli_validate_config_file() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.json");
    fs::write(
        &config_file,
        r#"{
  "library": { "roots": ["/comics"], "extensions": ["cbz", ".cbr"] },
  "thumbnails": { "quality": 90 }
}"#,
    )
    .unwrap();

    let mut cmd = comicshelf_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Roots: 1"))
        .stdout(predicate::str::contains("should not include a leading dot"));
}

#[test]
fn test_cli_validate_malformed_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.json");
    fs::write(&config_file, "{ not json").unwrap();

    let mut cmd = comicshelf_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_cli_missing_config_file_is_an_error() {
    let temp = tempdir().unwrap();
    let mut cmd = comicshelf_cmd();
    cmd.arg("--config")
        .arg(temp.path().join("nope.json"))
        .arg("--data-dir")
        .arg(temp.path())
        .arg("series")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_cli_scan_then_browse() {
    let data = tempdir().unwrap();
    let root = tempdir().unwrap();
    common::write_cbz(&root.path().join("Saga/Saga 001.cbz"), &["01.png", "02.png"], None);
    common::write_cbz(&root.path().join("Saga/Saga 002.cbz"), &["01.png"], None);

    let run = stdout_json(library_cmd(data.path(), root.path()).args(["--json", "scan"]));
    assert_eq!(run["status"], "completed");
    assert_eq!(run["counts"]["added"], 2);

    let series = stdout_json(library_cmd(data.path(), root.path()).args(["--json", "series"]));
    let series = series.as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["name"], "Saga");
    let series_id = series[0]["id"].as_str().unwrap().to_string();

    let issues = stdout_json(
        library_cmd(data.path(), root.path()).args(["--json", "issues", &series_id]),
    );
    let issues = issues.as_array().unwrap();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0]["number"], "001");
    let issue_id = issues[0]["id"].as_str().unwrap().to_string();

    let out = data.path().join("page.png");
    library_cmd(data.path(), root.path())
        .args(["page", &issue_id, "1", "--out"])
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read(&out).unwrap().starts_with(b"\x89PNG"));

    library_cmd(data.path(), root.path())
        .args(["page", &issue_id, "7"])
        .assert()
        .failure();

    let again = stdout_json(library_cmd(data.path(), root.path()).args(["--json", "scan"]));
    assert_eq!(again["counts"]["unchanged"], 2);
    assert_eq!(again["counts"]["added"], 0);

    let runs = stdout_json(library_cmd(data.path(), root.path()).args(["--json", "runs"]));
    assert_eq!(runs.as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_scan_missing_root_fails() {
    let data = tempdir().unwrap();
    let root = data.path().join("does-not-exist");

    library_cmd(data.path(), &root)
        .arg("scan")
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed"))
        .stderr(predicate::str::contains("Scan failed"));
}

#[test]
fn test_cli_invalid_issue_id() {
    let data = tempdir().unwrap();
    let mut cmd = comicshelf_cmd();
    cmd.arg("--data-dir")
        .arg(data.path())
        .args(["issue", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid issue id"));
}
