//! Black-box checks of the analyst binary's exit behavior.

use std::path::Path;
use std::process::Command;

fn analyst() -> Command {
    Command::new(env!("CARGO_BIN_EXE_analyst"))
}

/// Pin the config under a scratch home so nothing touches the real one.
fn write_config(home: &Path, db_path: &Path) {
    std::fs::create_dir_all(home).unwrap();
    std::fs::write(
        home.join("analyst.toml"),
        format!("db_path = \"{}\"\n", db_path.display()),
    )
    .unwrap();
}

fn scratch_db(path: &Path, rows: usize) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE orders (id INTEGER PRIMARY KEY, item TEXT NOT NULL)")
        .unwrap();
    {
        let mut stmt = conn.prepare("INSERT INTO orders (item) VALUES (?1)").unwrap();
        for i in 0..rows {
            stmt.execute(rusqlite::params![format!("order-{i}")]).unwrap();
        }
    }
    drop(conn);
}

#[test]
fn successful_query_exits_zero_and_prints_rows() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let db = dir.path().join("orders.db");
    scratch_db(&db, 3);
    write_config(&home, &db);

    let output = analyst()
        .arg("--home")
        .arg(&home)
        .args(["query", "SELECT count(*) FROM orders"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("count(*)"), "{stdout}");
    assert!(stdout.contains('3'), "{stdout}");
}

#[test]
fn rejected_query_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let db = dir.path().join("orders.db");
    scratch_db(&db, 3);
    write_config(&home, &db);

    let output = analyst()
        .arg("--home")
        .arg(&home)
        .args(["query", "DROP TABLE orders"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("disallowed operation"), "{stderr}");
}

#[test]
fn failed_query_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let db = dir.path().join("orders.db");
    scratch_db(&db, 3);
    write_config(&home, &db);

    let output = analyst()
        .arg("--home")
        .arg(&home)
        .args(["query", "SELECT * FROM no_such"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no_such"), "{stderr}");
}

#[test]
fn missing_database_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    write_config(&home, &dir.path().join("absent.db"));

    let output = analyst()
        .arg("--home")
        .arg(&home)
        .args(["query", "SELECT 1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No database"), "{stderr}");
}
