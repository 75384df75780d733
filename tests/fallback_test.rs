use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output};

fn commands() -> tempfile::NamedTempFile {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        input,
        "{{\"op\": \"register_planner\", \"organization\": \"Festival Co\", \"ref\": \"planner\"}}"
    )
    .unwrap();
    writeln!(
        input,
        "{{\"op\": \"credit_wallet\", \"owner\": {{\"kind\": \"planner\", \"id\": \"$planner.id\"}}, \"amount\": 500}}"
    )
    .unwrap();
    input
}

/// Both commands answer with a success envelope and the credit reaches the
/// wallet summary, whichever store backs the run.
fn assert_replayed(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let envelopes: Vec<Value> = stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(envelopes.len(), 2);
    assert!(envelopes.iter().all(|e| e["success"] == true));
    assert_eq!(envelopes[0]["message"], "Planner registered");

    let planner_id = envelopes[0]["data"]["id"].as_str().unwrap();
    assert!(stdout.contains(&format!("planner,{},500,0,500", planner_id)));
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let input = commands();

    let mut cmd = Command::new(cargo_bin!("stagebook"));
    cmd.arg(input.path()).arg("--db-path").arg("some_db");

    let assert = cmd.assert()
        .success()
        .stderr(predicate::str::contains("Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
    assert_replayed(assert.get_output());
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let input = commands();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("stagebook"));
    cmd.arg(input.path()).arg("--db-path").arg(&db_path);

    let assert = cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not());
    assert_replayed(assert.get_output());
}
