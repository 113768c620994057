//! Smoke tests for the `hermes` binary. None of these reach a container
//! engine: they cover argument parsing, config loading, provisioning
//! without start, and error reporting.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn hermes_binary() -> String {
    env!("CARGO_BIN_EXE_hermes").to_string()
}

fn create_test_config(temp_dir: &TempDir) -> PathBuf {
    let config_path = temp_dir.path().join("hermes.yaml");
    let config = r#"
servers_dir: servers
backups_dir: backups
database: fleet.db
ports:
  min: 31000
  max: 31010
# Never invoked by these tests
docker_binary: /nonexistent/docker
"#;
    fs::write(&config_path, config).expect("Failed to write config");
    config_path
}

fn hermes(dir: &Path, args: &[&str]) -> Output {
    Command::new(hermes_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("HERMES_SERVERS_DIR")
        .env_remove("HERMES_BACKUPS_DIR")
        .env_remove("HERMES_DATABASE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run hermes")
}

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    let output = hermes(tmp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Commands:"));
    for command in ["start", "stop", "remove", "command", "logs", "status", "usage", "players"] {
        assert!(stdout.contains(command), "help is missing '{}'", command);
    }
}

#[test]
fn test_completions_need_no_config() {
    let tmp = TempDir::new().unwrap();
    let output = hermes(tmp.path(), &["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("hermes"));
}

#[test]
fn test_unknown_server_reports_hint() {
    let tmp = TempDir::new().unwrap();
    create_test_config(&tmp);

    let output = hermes(tmp.path(), &["status", "ghost"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "{stderr}");
    assert!(stderr.contains("Hint:"), "{stderr}");
    assert!(stderr.contains("hermes create ghost"), "{stderr}");
}

#[test]
fn test_invalid_server_id_is_rejected() {
    let tmp = TempDir::new().unwrap();
    create_test_config(&tmp);

    let output = hermes(tmp.path(), &["start", "../etc"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("hermes.yaml"), "servers_directory: elsewhere\n").unwrap();

    let output = hermes(tmp.path(), &["list"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("servers_directory"));
}

#[test]
fn test_create_then_list_and_ports() {
    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&tmp);
    let config = config.to_str().unwrap();

    let output = hermes(tmp.path(), &["--config", config, "create", "alpha"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(tmp.path().join("servers/alpha/docker-compose.yml").is_file());
    assert!(tmp.path().join("servers/alpha/server-files").is_dir());

    let output = hermes(tmp.path(), &["--config", config, "create", "alpha"]);
    assert!(!output.status.success());

    let output = hermes(tmp.path(), &["-q", "list", "--json"]);
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "alpha");
    assert_eq!(records[0]["port"], 31000);
    assert_eq!(records[0]["state"], "stopped");

    let output = hermes(tmp.path(), &["ports"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("In use: 31000"), "{stdout}");
    assert!(stdout.contains("Next free: 31001"), "{stdout}");
}
