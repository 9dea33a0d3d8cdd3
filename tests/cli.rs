//! Integration tests for the fieldsync maintenance CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fieldsync(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fieldsync").expect("binary builds");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

#[test]
fn status_on_fresh_data_dir() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:"))
        .stdout(predicate::str::contains("0"));

    // The database is created on first use
    assert!(dir.path().join("fieldsync.db").exists());
}

#[test]
fn status_json_output() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .args(["status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending\": 0"))
        .stdout(predicate::str::contains("\"attempt_ceiling\": 3"));
}

#[test]
fn list_empty_queue() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No mutations queued."));
}

#[test]
fn clear_requires_force() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .arg("clear")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn clear_with_force_succeeds() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .args(["clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 0 mutations"));
}

#[test]
fn retry_requires_id_or_all() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .arg("retry")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--all"));
}

#[test]
fn cache_list_empty() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached collections."));
}

#[test]
fn cache_show_unknown_collection_fails() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .args(["cache", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn completions_generate() {
    let dir = TempDir::new().unwrap();

    fieldsync(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fieldsync"));
}

#[test]
fn data_dir_from_environment() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("fieldsync")
        .expect("binary builds")
        .env("FIELDSYNC_DATA_DIR", dir.path())
        .arg("status")
        .assert()
        .success();

    assert!(dir.path().join("fieldsync.db").exists());
}
