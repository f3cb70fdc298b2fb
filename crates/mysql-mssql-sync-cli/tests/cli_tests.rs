//! CLI integration tests for mysql-mssql-sync.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes, and an end-to-end run against in-memory stores.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mysql-mssql-sync binary.
fn cmd() -> Command {
    Command::cargo_bin("mysql-mssql-sync").unwrap()
}

/// Write a config backed by in-memory stores.
fn memory_config(payload_width: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "primary:").unwrap();
    writeln!(file, "  type: memory").unwrap();
    writeln!(file, "secondary:").unwrap();
    writeln!(file, "  type: memory").unwrap();
    writeln!(file, "  payload_width: {}", payload_width).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("init-schema"))
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("list-primary"))
        .stdout(predicate::str::contains("list-secondary"))
        .stdout(predicate::str::contains("replicate"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_replicate_subcommand_help() {
    cmd()
        .args(["replicate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--page"))
        .stdout(predicate::str::contains("--page-size"))
        .stdout(predicate::str::contains("--input"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mysql-mssql-sync"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // mysql primary without host/database/user
    writeln!(file, "primary:").unwrap();
    writeln!(file, "  type: mysql").unwrap();
    writeln!(file, "secondary:").unwrap();
    writeln!(file, "  type: memory").unwrap();

    cmd()
        .env_remove("MYSQL_HOST")
        .env_remove("MYSQL_USER")
        .env_remove("MYSQL_DATABASE")
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_port_override_exits_with_code_1() {
    let config = memory_config("1000");

    cmd()
        .env("SQLSERVER_PORT", "not-a-port")
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SQLSERVER_PORT"));
}

#[test]
fn test_oversized_store_exits_with_code_2() {
    let config = memory_config("1000");
    let payload = "x".repeat(1001);

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "store",
            "--pk",
            "1",
            "--payload",
            &payload,
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("maximum length"));
}

#[test]
fn test_page_zero_exits_with_code_2() {
    let config = memory_config("1000");

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "list-primary",
            "--page",
            "0",
        ])
        .assert()
        .code(2);
}

// =============================================================================
// Memory Store Runs
// =============================================================================

#[test]
fn test_health_check_with_memory_stores() {
    let config = memory_config("1000");

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HEALTHY"));
}

#[test]
fn test_replicate_input_file_outputs_json_summary() {
    let config = memory_config("1000");
    let mut input = tempfile::NamedTempFile::new().unwrap();
    write!(
        input,
        r#"[{{"pk": 1, "imagePath": "/img/a.png"}}, {{"pk": 2, "imagePath": "/img/b.png"}}]"#
    )
    .unwrap();

    let output = cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--output-json",
            "replicate",
            "--input",
            input.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["records_attempted"], 2);
    assert_eq!(summary["succeeded"], 2);
}

#[test]
fn test_replicate_partial_failure_exits_with_code_5() {
    let config = memory_config("4");
    let mut input = tempfile::NamedTempFile::new().unwrap();
    write!(
        input,
        r#"[{{"pk": 1, "payload": "ok"}}, {{"pk": 2, "payload": "too wide"}}]"#
    )
    .unwrap();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "replicate",
            "--input",
            input.path().to_str().unwrap(),
        ])
        .assert()
        .code(5)
        .stdout(predicate::str::contains("Failed primary key: 2"))
        .stdout(predicate::str::contains("Records: 1/2"));
}

#[test]
fn test_replicate_malformed_input_exits_with_code_2() {
    let config = memory_config("1000");
    let mut input = tempfile::NamedTempFile::new().unwrap();
    write!(input, "{{not json").unwrap();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "replicate",
            "--input",
            input.path().to_str().unwrap(),
        ])
        .assert()
        .code(2);
}

#[test]
fn test_export_writes_json_array() {
    let config = memory_config("1000");
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.json");

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "export",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 0 records"));

    let content = std::fs::read_to_string(&output).unwrap();
    let records: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(records.as_array().unwrap().is_empty());
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
