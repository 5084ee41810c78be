//! Integration tests for the bookscan CLI

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const KNOWN_ISBN: &str = "9784167158057";
const UNKNOWN_ISBN: &str = "9790000000001";

/// Command with an isolated config file and no BOOKSCAN_* leakage
fn bookscan(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bookscan").unwrap();
    cmd.env("BOOKSCAN_CONFIG", dir.path().join("config.toml"));
    for var in [
        "BOOKSCAN_APPLICATION_ID",
        "BOOKSCAN_CATALOG_ENDPOINT",
        "BOOKSCAN_ARM_TIMEOUT_MS",
        "BOOKSCAN_COOL_DOWN_MS",
        "BOOKSCAN_FRAME_HEIGHT",
        "BOOKSCAN_LOG_FILE",
        "BOOKSCAN_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// In-process stand-in for the book search API
struct StubCatalog {
    endpoint: String,
    _runtime: tokio::runtime::Runtime,
}

impl StubCatalog {
    fn start() -> Self {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().route("/search", get(search));
        runtime.spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/search", addr),
            _runtime: runtime,
        }
    }

    /// Command wired to this stub with a credential set
    fn command(&self, dir: &TempDir) -> Command {
        let mut cmd = bookscan(dir);
        cmd.env("BOOKSCAN_APPLICATION_ID", "test-app-id")
            .env("BOOKSCAN_CATALOG_ENDPOINT", &self.endpoint)
            .env("BOOKSCAN_COOL_DOWN_MS", "200");
        cmd
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("isbnjan").map(String::as_str) {
        Some(KNOWN_ISBN) => Json(json!({
            "Items": [{
                "Item": {
                    "title": "容疑者Xの献身",
                    "author": "東野圭吾",
                    "publisherName": "文藝春秋",
                    "salesDate": "2008年08月"
                }
            }]
        })),
        _ => Json(json!({ "Items": [] })),
    }
}

fn write_input(dir: &TempDir, lines: &[&str]) -> PathBuf {
    let path = dir.path().join("events.jsonl");
    fs::write(&path, lines.join("\n")).expect("Failed to write scan input");
    path
}

#[test]
fn test_help() {
    bookscan(&TempDir::new().unwrap())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_validate_normalizes() {
    bookscan(&TempDir::new().unwrap())
        .args(["validate", "978-4-16-715805-7"])
        .assert()
        .success()
        .stdout(predicate::str::contains(KNOWN_ISBN));
}

#[test]
fn test_validate_reports_invalid() {
    bookscan(&TempDir::new().unwrap())
        .args(["validate", KNOWN_ISBN, "4901234567894"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✓ 9784167158057"))
        .stdout(predicate::str::contains("✗ 4901234567894"))
        .stderr(predicate::str::contains("1 of 2"));
}

#[test]
fn test_validate_json() {
    let out = bookscan(&TempDir::new().unwrap())
        .args(["--json", "validate", "isbn 979-10-000-0000-1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let results: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(results[0]["valid"], true);
    assert_eq!(results[0]["isbn"], "9791000000001");
}

#[test]
fn test_lookup_requires_application_id() {
    bookscan(&TempDir::new().unwrap())
        .args(["lookup", KNOWN_ISBN])
        .assert()
        .failure()
        .stderr(predicate::str::contains("application ID is not configured"))
        .stderr(predicate::str::contains("BOOKSCAN_APPLICATION_ID"));
}

#[test]
fn test_lookup_rejects_invalid_isbn() {
    bookscan(&TempDir::new().unwrap())
        .env("BOOKSCAN_APPLICATION_ID", "test-app-id")
        .args(["lookup", "12345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid ISBN-13"));
}

#[test]
fn test_lookup_found() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();

    stub.command(&dir)
        .args(["lookup", "978-4-16-715805-7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("容疑者Xの献身"))
        .stdout(predicate::str::contains("東野圭吾"))
        .stdout(predicate::str::contains("文藝春秋"));
}

#[test]
fn test_lookup_not_found() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();

    stub.command(&dir)
        .args(["lookup", UNKNOWN_ISBN])
        .assert()
        .success()
        .stdout(predicate::str::contains("No match for ISBN 9790000000001"));
}

#[test]
fn test_scan_resolves_one_book() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &[
            "# lower half and non-book codes are ignored",
            r#"{"symbology":"ean13","payload":"9784167158057","boundingBox":{"originY":0.7,"height":0.1}}"#,
            r#"{"symbology":"qr","payload":"https://example.com"}"#,
            r#"{"symbology":"ean13","payload":"9784167158057","boundingBox":{"originY":0.2,"height":0.1}}"#,
            r#"{"symbology":"ean13","payload":"9784167158057","boundingBox":{"originY":0.2,"height":0.1}}"#,
        ],
    );

    stub.command(&dir)
        .args(["--json", "scan", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"resolved""#))
        .stdout(predicate::str::contains("容疑者Xの献身"))
        .stdout(predicate::function(|out: &str| {
            out.matches(r#""event":"accepted""#).count() == 1
        }))
        .stdout(predicate::str::contains("4 barcode event(s), 1 lookup(s)"));
}

#[test]
fn test_scan_accepts_event_with_unreadable_geometry() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &[r#"{"symbology":"ean13","payload":"9784167158057","boundingBox":{"height":0.1}}"#],
    );

    stub.command(&dir)
        .args(["--json", "scan", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"resolved""#))
        .stderr(predicate::str::contains("Skipping line").not());
}

#[test]
fn test_scan_waits_for_arm() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &[
            r#"{"symbology":"ean13","payload":"9790000000001"}"#,
            r#"{"command":"arm"}"#,
            r#"{"symbology":"ean13","payload":"9790000000001"}"#,
        ],
    );

    stub.command(&dir)
        .args(["--json", "scan", "--no-arm", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"not_found""#))
        .stdout(predicate::str::contains("2 barcode event(s), 1 lookup(s)"));
}

#[test]
fn test_scan_again_allows_same_book() {
    let stub = StubCatalog::start();
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &[
            r#"{"symbology":"ean13","payload":"9784167158057"}"#,
            r#"{"command":"again"}"#,
            r#"{"command":"arm"}"#,
            r#"{"symbology":"ean13","payload":"9784167158057"}"#,
        ],
    );

    stub.command(&dir)
        .args(["--json", "scan", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::function(|out: &str| {
            out.matches(r#""event":"resolved""#).count() == 2
        }));
}

#[test]
fn test_scan_requires_application_id() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &[]);

    bookscan(&dir)
        .args(["scan", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("application ID is not configured"));
}

#[test]
fn test_config_set_and_show() {
    let dir = TempDir::new().unwrap();

    bookscan(&dir)
        .args(["config", "set", "application_id", "abcd1234efgh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set application_id = abcd***"));

    bookscan(&dir)
        .args(["config", "set", "cool_down_ms", "1500"])
        .assert()
        .success();

    bookscan(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abcd***"))
        .stdout(predicate::str::contains("abcd1234efgh").not())
        .stdout(predicate::str::contains("cool_down_ms:   1500"));

    let saved = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("application_id = \"abcd1234efgh\""));
}

#[test]
fn test_config_set_does_not_persist_env_overrides() {
    let dir = TempDir::new().unwrap();

    bookscan(&dir)
        .env("BOOKSCAN_APPLICATION_ID", "env-only-secret")
        .env("BOOKSCAN_ARM_TIMEOUT_MS", "9000")
        .args(["config", "set", "cool_down_ms", "1500"])
        .assert()
        .success();

    let saved = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(!saved.contains("env-only-secret"));
    assert!(!saved.contains("application_id"));
    assert!(!saved.contains("9000"));
    assert!(saved.contains("cool_down_ms = 1500"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = TempDir::new().unwrap();

    bookscan(&dir)
        .args(["config", "set", "arm_timeout_ms", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("arm_timeout_ms"));

    bookscan(&dir)
        .args(["config", "set", "endpoint", "ftp://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme"));

    bookscan(&dir)
        .args(["config", "set", "favorite_color", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_flag_overrides_default_path() {
    let dir = TempDir::new().unwrap();
    let custom = dir.path().join("custom.toml");

    bookscan(&dir)
        .arg("--config")
        .arg(&custom)
        .args(["config", "set", "frame_height", "1920"])
        .assert()
        .success();

    assert!(custom.exists());
    assert!(!dir.path().join("config.toml").exists());
}
