//! CLI integration tests for profileprice-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that occur before any connection.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the profileprice-migrate binary with an empty environment.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("profileprice-migrate").unwrap();
    cmd.env_clear();
    cmd
}

const VALID_CONFIG: &str = "\
source:
  host: legacy-db
  database: legacy
  user: reader
  password: secret
relational:
  host: mariadb
  database: prices
  user: writer
  password: secret
analytical:
  host: clickhouse
  database: analytics
  user: default
  password: secret
";

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
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
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_resume_subcommand_help() {
    cmd()
        .args(["resume", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resume a previously interrupted migration"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("profileprice-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_listed() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--state-file"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_short_config_flag() {
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 1)
// =============================================================================

#[test]
fn test_missing_environment_exits_with_code_1() {
    cmd()
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing environment variable MYSQL_HOST"));
}

#[test]
fn test_partial_environment_names_missing_variable() {
    cmd()
        .env("MYSQL_HOST", "legacy-db")
        .env("MYSQL_USER", "reader")
        .env("MYSQL_PASSWORD", "secret")
        .env("MYSQL_DATABASE", "legacy")
        .arg("health-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MARIADB_TARGET_HOST"));
}

#[test]
fn test_invalid_port_exits_with_code_1() {
    cmd()
        .env("MYSQL_HOST", "legacy-db")
        .env("MYSQL_PORT", "not-a-port")
        .env("MYSQL_USER", "reader")
        .env("MYSQL_PASSWORD", "secret")
        .env("MYSQL_DATABASE", "legacy")
        .arg("validate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MYSQL_PORT"));
}

#[test]
fn test_missing_config_file_exits_with_code_7() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let file = config_file("source:\n  host: legacy-db\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1);
}

#[test]
fn test_same_source_and_target_exits_with_code_1() {
    let config = VALID_CONFIG.replace("host: mariadb\n  database: prices", "host: legacy-db\n  database: legacy");
    let file = config_file(&config);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1);
}

#[test]
fn test_resume_requires_state_file() {
    let file = config_file(VALID_CONFIG);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "resume"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--state-file is required"));
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test database connections"));
}

#[test]
fn test_validate_command_exists() {
    cmd()
        .args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validate row counts"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
