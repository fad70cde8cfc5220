#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use mealbook::db::pool::DbPool;
use rust_decimal::Decimal;
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn mb() -> Command {
    cargo_bin_cmd!("mealbook")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_mealbook.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm"] {
        fs::remove_file(format!("{db_path}{suffix}")).ok();
    }
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// Run one CLI command against `db_path` in test mode.
pub fn run_ok(db_path: &str, args: &[&str]) {
    mb().args(["--db", db_path, "--test"])
        .args(args)
        .assert()
        .success();
}

/// Initialize the DB and register the given users.
pub fn init_db_with_users(db_path: &str, users: &[&str]) {
    run_ok(db_path, &["init"]);
    for u in users {
        run_ok(db_path, &["user", "add", u]);
    }
}

/// Library-level pool on a fresh file database.
pub fn file_pool(name: &str) -> (String, DbPool) {
    let db_path = setup_test_db(name);
    let pool = DbPool::new(&db_path).expect("open db");
    (db_path, pool)
}

/// Decimal from a string literal.
pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}
