//! CLI integration tests

use std::process::Command;

fn mmctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mmctl"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = mmctl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Marine Monitor"), "Should show app name");
    assert!(stdout.contains("evaluate"), "Should show evaluate command");
    assert!(stdout.contains("check"), "Should show check command");
    assert!(stdout.contains("alerts"), "Should show alerts command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = mmctl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("mmctl"), "Should show binary name");
}

/// Test alerts subcommand help
#[test]
fn test_alerts_help() {
    let output = mmctl()
        .args(["alerts", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "alerts help should succeed");
    assert!(stdout.contains("list"));
    assert!(stdout.contains("notify"));
    assert!(stdout.contains("resolve"));
}

/// Offline evaluation needs no service
#[test]
fn test_evaluate_json_output() {
    let output = mmctl()
        .args(["--format", "json", "evaluate", "--sst", "28", "--chl", "3.5"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "evaluate should succeed");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["result"], "anomaly");
    assert_eq!(value["message"], "Chl too high: 3.50");
    assert_eq!(value["type"], "environmental risk");
}

#[test]
fn test_evaluate_quiet_measurement() {
    let output = mmctl()
        .args([
            "--format",
            "json",
            "evaluate",
            "--sst",
            "27.1",
            "--chl",
            "0.3",
            "--sst-history",
            "27.0,27.2,26.9,27.1",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["result"], "no_anomaly");
}

#[test]
fn test_evaluate_rejects_invalid_latitude() {
    let output = mmctl()
        .args([
            "evaluate", "--sst", "27", "--chl", "0.3", "--lat", "120", "--lon", "10",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "invalid latitude should fail");
}

#[test]
fn test_unreachable_service_fails() {
    let output = mmctl()
        .args(["--api-url", "http://127.0.0.1:9", "alerts", "list"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
