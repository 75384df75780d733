#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use serde_json::Value;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, lines: &[String]) -> String {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(input, "{}", line).unwrap();
    }
    let output = Command::new(cargo_bin!("stagebook"))
        .arg(input.path())
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // First run: register a planner and fund their wallet
    let stdout1 = run(
        &db_path,
        &[
            r#"{"op": "register_planner", "organization": "Festival Co", "ref": "planner"}"#.to_string(),
            r#"{"op": "credit_wallet", "owner": {"kind": "planner", "id": "$planner.id"}, "amount": 100}"#.to_string(),
        ],
    );
    let registered: Value = serde_json::from_str(stdout1.lines().next().unwrap()).unwrap();
    let planner_id = registered["data"]["id"].as_str().unwrap().to_string();
    assert!(stdout1.contains(&format!("planner,{},100,0,100", planner_id)));

    // Second run against the same database: the planner and balance survive
    let stdout2 = run(
        &db_path,
        &[format!(
            r#"{{"op": "credit_wallet", "owner": {{"kind": "planner", "id": "{}"}}, "amount": 50}}"#,
            planner_id
        )],
    );
    assert!(stdout2.contains("\"success\":true"));
    assert!(stdout2.contains(&format!("planner,{},150,0,150", planner_id)));
}
