use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's environment, config file and `.env`.
fn azlogin(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("azlogin");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env_remove("AZURE_SODA_WEBLOGIN")
        .env_remove("AZURE_SODA_CREDENTIAL_PATH")
        .env_remove("AZURE_SODA_ALLOW_UNENCRYPTED_STORAGE")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

const RECORD: &str = r#"{
  "authority": "login.microsoftonline.com",
  "homeAccountId": "oid.tid",
  "tenantId": "tid",
  "clientId": "04b07795-8ddb-461a-bbee-02f9e1bf7b46",
  "username": "ada@example.com",
  "version": "1.0"
}"#;

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("azlogin");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("azlogin"));
}

#[test]
fn test_help_contains_all_commands() {
    let mut cmd = cargo_bin_cmd!("azlogin");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn test_status_defaults_json() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(azlogin(home.path()).args(["status", "--output", "json"]));

    assert_eq!(json["login_mode"], "enabled");
    assert_eq!(json["record"], "not_configured");
    assert_eq!(json["allow_unencrypted_storage"], false);
}

#[test]
fn test_status_reads_environment() {
    let home = TempDir::new().unwrap();
    let record = home.path().join("record.json");
    let json = json_stdout(
        azlogin(home.path())
            .env("AZURE_SODA_WEBLOGIN", "Advanced")
            .env("AZURE_SODA_CREDENTIAL_PATH", &record)
            .args(["status", "--output", "json"]),
    );

    assert_eq!(json["login_mode"], "advanced");
    assert_eq!(json["record"], "missing");
}

#[test]
fn test_flags_override_environment() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(
        azlogin(home.path())
            .env("AZURE_SODA_WEBLOGIN", "advanced")
            .args(["status", "--login-mode", "disabled", "--output", "json"]),
    );

    assert_eq!(json["login_mode"], "disabled");
}

#[test]
fn test_unencrypted_flag_false_overrides_environment() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(
        azlogin(home.path())
            .env("AZURE_SODA_ALLOW_UNENCRYPTED_STORAGE", "true")
            .args(["status", "--allow-unencrypted-storage=false", "--output", "json"]),
    );

    assert_eq!(json["allow_unencrypted_storage"], false);
}

#[test]
fn test_status_present_and_corrupt_record() {
    let home = TempDir::new().unwrap();
    let record = home.path().join("record.json");

    std::fs::write(&record, RECORD).unwrap();
    let json = json_stdout(azlogin(home.path()).args([
        "status",
        "--login-mode",
        "advanced",
        "--record-path",
        record.to_str().unwrap(),
        "--output",
        "json",
    ]));
    assert_eq!(json["record"], "present");
    assert_eq!(json["username"], "ada@example.com");

    std::fs::write(&record, "{\"authority\":").unwrap();
    let json = json_stdout(azlogin(home.path()).args([
        "status",
        "--login-mode",
        "advanced",
        "--record-path",
        record.to_str().unwrap(),
        "--output",
        "json",
    ]));
    assert_eq!(json["record"], "corrupt");
}

#[test]
fn test_invalid_login_mode_fails_fast() {
    let home = TempDir::new().unwrap();
    azlogin(home.path())
        .env("AZURE_SODA_WEBLOGIN", "sometimes")
        .arg("token")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"))
        .stderr(predicate::str::contains("enabled, disabled or advanced"));
}

#[test]
fn test_logout_without_path_is_noop() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(azlogin(home.path()).args(["logout", "--output", "json"]));

    assert_eq!(json["record_removed"], false);
    assert!(json["record_path"].is_null());
}

#[test]
fn test_logout_requires_confirmation_when_not_interactive() {
    let home = TempDir::new().unwrap();
    let record = home.path().join("record.json");
    std::fs::write(&record, RECORD).unwrap();

    azlogin(home.path())
        .args(["logout", "--login-mode", "advanced", "--record-path"])
        .arg(&record)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert!(record.exists());
}

#[test]
fn test_logout_removes_record() {
    let home = TempDir::new().unwrap();
    let record = home.path().join("record.json");
    std::fs::write(&record, RECORD).unwrap();

    let json = json_stdout(
        azlogin(home.path())
            .args(["logout", "--yes", "--output", "json", "--login-mode", "advanced", "--record-path"])
            .arg(&record),
    );

    assert_eq!(json["record_removed"], true);
    assert!(!record.exists());
}
