//! Integration tests for rov CLI functionality

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a complete feed directory unique to `name`
fn feed_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rov-cli-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("rpki-archive")).unwrap();

    fs::write(
        dir.join("irr.json"),
        r#"[{"prefix": "8.8.8.0/24", "origin_asn": 15169, "descr": "Google", "source": "RADB"}]"#,
    )
    .unwrap();
    fs::write(
        dir.join("rpki.json"),
        r#"[
            {"prefix": "2.0.0.0/12", "asn": 3215, "maxLength": 17, "ta": "ripencc"},
            {"prefix": "8.8.8.0/24", "asn": 15169, "ta": "arin"}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("rpki-archive").join("2018-10-01.json"),
        r#"[{"prefix": "2.0.0.0/12", "asn": 3215, "maxLength": 17, "ta": "ripencc"}]"#,
    )
    .unwrap();
    fs::write(
        dir.join("delegated-prefix.json"),
        r#"[{"prefix": "10.0.0.0/8", "status": "reserved", "date": "19960201", "registry": "iana", "country": "ZZ"}]"#,
    )
    .unwrap();
    fs::write(
        dir.join("delegated-asn.json"),
        r#"[{"asn": 0, "status": "reserved", "registry": "iana"}]"#,
    )
    .unwrap();

    dir
}

fn rov_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rov").expect("Failed to find rov binary");
    cmd.env_remove("RUST_LOG").arg("--feeds").arg(dir);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("Output should be valid JSON")
}

#[test]
fn test_help_output() {
    let mut cmd = Command::cargo_bin("rov").expect("Failed to find rov binary");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Offline route origin validation"))
        .stdout(predicate::str::contains("--feeds"))
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--batch"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_output() {
    let mut cmd = Command::cargo_bin("rov").expect("Failed to find rov binary");
    cmd.arg("--version");

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("rov "));
    // In debug builds, should contain -UNRELEASED
    if cfg!(debug_assertions) {
        assert!(stdout.contains("-UNRELEASED"));
    }
}

#[test]
fn test_single_check() {
    let dir = feed_dir("single");
    let output = rov_cmd(&dir)
        .args(["8.8.8.0/25", "AS15169"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["query"]["prefix"], "8.8.8.0/25");
    assert_eq!(json["query"]["asn"], 15169);
    assert_eq!(json["irr"]["status"], "Invalid,more-specific");
    assert_eq!(json["rpki"]["status"], "Invalid,more-specific");
    assert!(json["delegated"].get("prefix").is_none());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_snapshot_check() {
    let dir = feed_dir("snapshot");

    let output = rov_cmd(&dir)
        .args(["--snapshot", "2018/10/01", "8.8.8.0/24", "15169"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["rpki"]["status"], "NotFound");
    assert_eq!(json["query"]["snapshot"], "2018/10/01");

    let output = rov_cmd(&dir).args(["8.8.8.0/24", "15169"]).output().unwrap();
    assert_eq!(stdout_json(&output)["rpki"]["status"], "Valid");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_delegated_reserved() {
    let dir = feed_dir("delegated");
    let output = rov_cmd(&dir).args(["10.1.0.0/16", "0"]).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["irr"]["status"], "NotFound");
    assert_eq!(json["delegated"]["prefix"]["status"], "reserved");
    assert_eq!(json["delegated"]["asn"]["status"], "reserved");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unknown_snapshot_fails() {
    let dir = feed_dir("nosnap");
    rov_cmd(&dir)
        .args(["--snapshot", "2017/01/01", "8.8.8.0/24", "15169"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("RPKI snapshot 2017/01/01 is not loaded"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_prefix_fails() {
    let dir = feed_dir("badprefix");
    rov_cmd(&dir)
        .args(["8.8.8.1/24", "15169"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid prefix"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_status_output() {
    let dir = feed_dir("status");
    let output = rov_cmd(&dir).arg("--status").output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[0]["source"], "irr");
    assert_eq!(sources[0]["records"], 1);
    assert_eq!(sources[1]["records"], 2);
    assert_eq!(json["snapshots"], serde_json::json!(["2018/10/01"]));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_strict_mode_with_missing_source() {
    let dir = feed_dir("strict");
    fs::remove_file(dir.join("delegated-asn.json")).unwrap();

    // Without --strict the missing source simply finds nothing
    let output = rov_cmd(&dir).args(["8.8.8.0/24", "15169"]).output().unwrap();
    assert!(output.status.success());
    assert!(stdout_json(&output)["delegated"].get("asn").is_none());

    rov_cmd(&dir)
        .args(["--strict", "8.8.8.0/24", "15169"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing: delegated-asn"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_batch_file() {
    let dir = feed_dir("batch");
    let batch = dir.join("queries.txt");
    fs::write(
        &batch,
        "# prefix asn [snapshot]\n\
         8.8.8.0/24 15169\n\
         \n\
         2.2.2.0/24 AS3215 2018/10/01\n\
         8.8.8.1/24 15169\n",
    )
    .unwrap();

    let output = rov_cmd(&dir)
        .arg("--sequential")
        .arg("--batch")
        .arg(&batch)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["irr"]["status"], "Valid");
    assert_eq!(entries[1]["rpki"]["status"], "Invalid,more-specific");
    assert_eq!(entries[2]["line"], 5);
    assert!(entries[2]["error"].as_str().unwrap().contains("Invalid prefix"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_feed_dir_fails() {
    let dir = std::env::temp_dir().join("rov-cli-no-such-feeds");
    rov_cmd(&dir)
        .args(["8.8.8.0/24", "15169"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_logs_go_to_stderr() {
    let dir = feed_dir("logging");
    let output = rov_cmd(&dir)
        .args(["-vv", "8.8.8.0/24", "15169"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // stdout stays pure JSON even with debug logging
    stdout_json(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Loaded source"));

    fs::remove_dir_all(&dir).unwrap();
}
