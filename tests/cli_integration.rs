// CLI integration tests for the contract inspection commands.
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_mqbridge");
    Command::new(exe)
}

fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn layout_lists_records_and_paths() {
    let output = cmd().arg("layout").output().expect("layout");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);

    let records = value["records"].as_array().expect("records");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["record"], "PlayerClient");
    assert_eq!(records[0]["field"], "Name");
    assert_eq!(records[0]["offset"], 0xa4);
    assert_eq!(records[0]["capacity"], 64);
    assert_eq!(records[1]["record"], "GroundItem");
    assert_eq!(records[2]["record"], "PluginDescriptor");

    let paths = value["paths"].as_array().expect("paths");
    assert_eq!(paths.len(), 9);
    assert_eq!(paths[0]["kind"], "root");
    assert_eq!(paths[8]["kind"], "game");
    assert_eq!(paths[8]["code"], 8);
}

#[test]
fn config_check_fills_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("MQRustSimple.json");
    std::fs::write(&path, r#"{"encoding": "latin1", "log": {"file": "debug"}}"#).expect("write");

    let output = cmd()
        .args(["config", "check", path.to_str().expect("utf8 path")])
        .output()
        .expect("config check");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    assert_eq!(value["encoding"], "latin1");
    assert_eq!(value["translate_ansi"], true);
    assert_eq!(value["chat_color"], 273);
    assert_eq!(value["log"]["console"], "info");
    assert_eq!(value["log"]["file"], "debug");
}

#[test]
fn config_check_rejects_unknown_keys() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("broken.json");
    std::fs::write(&path, r#"{"colour": 1}"#).expect("write");

    let output = cmd()
        .args(["config", "check", path.to_str().expect("utf8 path")])
        .output()
        .expect("config check");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(
        err["error"]["path"]
            .as_str()
            .expect("path")
            .ends_with("broken.json")
    );
}

#[test]
fn config_check_missing_file_is_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("absent.json");
    let output = cmd()
        .args(["config", "check", path.to_str().expect("utf8 path")])
        .output()
        .expect("config check");
    assert_eq!(output.status.code(), Some(8));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Io");
    assert!(err["error"]["causes"].as_array().is_some());
}

#[test]
fn config_default_prints_defaults() {
    let output = cmd().args(["config", "default"]).output().expect("default");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    assert_eq!(value["encoding"], "utf8");
    assert_eq!(value["log"]["file"], Value::Null);
}

#[test]
fn colorize_translates_ansi_to_host_codes() {
    let output = cmd()
        .args(["colorize", "\x1b[32mok\x1b[0m %s"])
        .output()
        .expect("colorize");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    assert_eq!(value["output"], "\x07gok\x07x %s");
}

#[test]
fn unknown_command_is_usage_error() {
    let output = cmd().arg("frobnicate").output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}
