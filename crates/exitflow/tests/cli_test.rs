use assert_cmd::Command;
use predicates::prelude::*;

/// The top-level help lists every command.
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("teardown"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("shutdown"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("exitflow"))
        .stdout(predicate::str::contains("ohio"));
}

#[test]
fn test_deploy_help_mentions_region() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--region"))
        .stdout(predicate::str::contains("EXITFLOW_REGION"));
}

#[test]
fn test_teardown_help_has_yes_flag() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("teardown")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}

/// Node commands fail fast without the control API URL configured.
#[test]
fn test_start_requires_api_url() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("start")
        .arg("ohio")
        .env_remove("EXITFLOW_URL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("EXITFLOW_URL"));
}

/// Unknown regions are rejected before any network call.
#[test]
fn test_start_rejects_unknown_region() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("start")
        .arg("atlantis")
        .env("EXITFLOW_URL", "https://example.invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown region"));
}

#[test]
fn test_setup_requires_tailnet_flag() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("setup").assert().failure();
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("exitflow").unwrap();
    cmd.arg("not-a-command").assert().failure();
}
