#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn payroll(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("trainer-payroll"));
    cmd.arg("--db-path").arg(db_path).args(["--today", "2024-05-20"]);
    cmd
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("payroll_db");

    // 1. First run: import the roster and record a session
    let output1 = payroll(&db_path)
        .args(["--roster", "tests/fixtures/roster.json"])
        .args(["record", "--slot", "1", "--date", "2024-05-13", "--count", "6"])
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());

    // 2. Second run: same roster, same database
    let output2 = payroll(&db_path)
        .args(["--roster", "tests/fixtures/roster.json"])
        .args(["salary", "--trainer", "1"])
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // 960 from the roster plus 6 * 120
    assert!(stdout2.contains("Aida Bekova: 1680 som for 2 session(s)"));
}

#[test]
fn test_rerecording_replaces_count() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("payroll_db");

    assert!(payroll(&db_path)
        .args(["--roster", "tests/fixtures/roster.json", "report"])
        .args(["--from", "2024-05-01", "--to", "2024-05-31"])
        .status()
        .unwrap()
        .success());

    for count in ["4", "2"] {
        let status = payroll(&db_path)
            .args(["record", "--slot", "2", "--date", "2024-05-09", "--count", count])
            .status()
            .unwrap();
        assert!(status.success());
    }

    let output = payroll(&db_path)
        .args(["report", "--from", "2024-05-01", "--to", "2024-05-31"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1,Aida Bekova,1,200"));
}
